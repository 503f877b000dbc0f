//! Caminho Fatal.
//!
//! Invariante interna quebrada (bookkeeping que não pode falhar, criação de
//! contexto no host). Não é erro de usuário: nunca vira `SysError`.
//!
//! # Comportamento
//! 1. Loga o erro na Serial.
//! 2. Derruba o contexto atual com pânico.

/// Aborta o contexto atual.
#[cold]
pub fn fatal(reason: &'static str) -> ! {
    crate::kerror!("================ KERNEL PANIC ================");
    crate::kerror!(reason);
    crate::kerror!("==============================================");
    panic!("{}", reason)
}
