//! # Execução
//!
//! O módulo `sched` transforma threads do host em contextos de execução do
//! núcleo e mantém o registro de threads de cada processo.
//!
//! ## 🎯 Propósito e Responsabilidade
//! - **Contexto:** Cria contextos ligados a um trampolim e sabe encerrá-los (`context`).
//! - **Espera:** Filas de contextos dormindo (`sync::waitqueue`), base da `CondVar`.
//! - **Threads:** Registro PTCB e o protocolo create/join/detach/exit (`task`).
//! - **Configuração:** Tamanhos das tabelas (`config`).
//!
//! ## 🏗️ Arquitetura
//! Contextos rodam de fato em paralelo no host, mas todo estado compartilhado
//! passa pelo lock grosso do kernel; corpo de task roda sem lock.

pub mod config;
pub mod context;
pub mod sync;
pub mod task;
