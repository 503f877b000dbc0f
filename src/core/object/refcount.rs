//! Reference Counting
//!
//! Arquivo: core/object/refcount.rs
//!
//! Propósito: Contagem de referências para objetos compartilhados do núcleo
//! (FCBs e registros de thread).
//!
//! Detalhes de Implementação:
//! - Contador simples, sem atômicos: todo inc/dec acontece sob o lock grosso.
//! - Quem observa a transição para ZERO é quem libera o objeto (exatamente uma vez).

/// Contador de referências protegido pelo lock do kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCount {
    count: usize,
}

impl RefCount {
    /// Cria um novo contador com valor inicial
    pub const fn new(initial: usize) -> Self {
        Self { count: initial }
    }

    /// Incrementa o contador de referências.
    /// Retorna o valor ANTERIOR.
    #[inline]
    pub fn inc(&mut self) -> usize {
        let prev = self.count;
        self.count += 1;
        prev
    }

    /// Decrementa o contador de referências.
    /// Retorna `true` se a contagem chegou a ZERO (o objeto deve ser destruído).
    #[inline]
    #[must_use]
    pub fn dec(&mut self) -> bool {
        match self.count {
            0 => {
                crate::kerror!("(RefCount) dec() em contador já zerado");
                false
            }
            1 => {
                self.count = 0;
                true
            }
            _ => {
                self.count -= 1;
                false
            }
        }
    }

    /// Retorna o valor atual.
    #[inline]
    pub fn get(&self) -> usize {
        self.count
    }
}
