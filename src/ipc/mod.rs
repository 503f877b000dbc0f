//! # Inter-Process Communication (IPC)
//!
//! Como processos conversam dentro do núcleo. Tudo é em memória; não existe
//! protocolo de rede aqui.
//!
//! ## Mecanismos
//!
//! | Tipo      | Padrão    | Cópia    | Bloqueio |
//! |-----------|-----------|----------|----------|
//! | Pipe      | 1:1       | Stream   | Sim      |
//! | Socket    | 1:1       | Stream   | Sim      |
//!
//! Sockets usam dois pipes cruzados como transporte; a tabela de portas
//! (`port`) guarda no máximo um Listener por porta.

// =============================================================================
// STREAMING
// =============================================================================

/// Pipes unidirecionais
pub mod pipe;

/// Tabela de portas
pub mod port;

/// Sockets sobre pipes
pub mod socket;

pub use pipe::{PipeReader, PipeWriter};
pub use socket::ShutdownMode;

#[cfg(test)]
mod test;
