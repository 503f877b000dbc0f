//! Core Module
//!
//! Contém a lógica central do kernel: a instância e seu estado, a tabela de
//! handles, os objetos de stream, os processos, o logging e o caminho fatal.

pub mod handle;
pub mod kernel;
pub mod logging;
pub mod object;
pub mod panic;
pub mod process;
