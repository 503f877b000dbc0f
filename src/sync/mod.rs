//! # Synchronization Primitives
//!
//! O lock grosso do núcleo e a variável de condição que dorme sobre ele.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! Mutex      → O lock grosso: todo estado mutável do kernel
//! CondVar    → Espera por condição, soltando o Mutex
//! ```
//!
//! ## Regras
//!
//! - Um único `Mutex<KernelState>` por kernel; não existe segunda ordem de lock.
//! - Toda espera é "re-testar o predicado em loop".

/// Mutex (lock grosso)
pub mod mutex;

/// Condition Variable
pub mod condvar;

#[cfg(test)]
mod test;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use condvar::CondVar;
pub use mutex::{Mutex, MutexGuard};
