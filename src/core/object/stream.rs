//! Stream Object Base
//!
//! Arquivo: core/object/stream.rs
//!
//! Propósito: Conjunto de operações de um objeto de stream (o que um fid
//! aponta). Pipes, sockets e o stream de info de processos implementam o trait;
//! a tabela de handles despacha read/write/close por ele.
//!
//! Detalhes de Implementação:
//! - O objeto guarda só ids; o estado real mora nas arenas do `KernelState`.
//! - `read`/`write` recebem o guard do lock grosso e o devolvem, porque podem
//!   dormir (soltando e readquirindo o lock).

use std::any::Any;

use crate::core::kernel::{KernelGuard, KernelState};
use crate::sys::error::{SysError, SysResult};

/// Tipo do objeto por trás do fid (diagnóstico).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    PipeReader,
    PipeWriter,
    Socket,
    ProcInfo,
}

/// Operações de um stream.
pub trait StreamOps: Send + Sync {
    /// Tipo do objeto.
    fn kind(&self) -> StreamKind;

    /// Acesso ao tipo concreto (sockets resolvem o fid por aqui).
    fn as_any(&self) -> &dyn Any;

    /// Lê para `buf`. Pode bloquear.
    fn read<'k>(
        &self,
        guard: KernelGuard<'k>,
        _buf: &mut [u8],
    ) -> (KernelGuard<'k>, SysResult<usize>) {
        (guard, Err(SysError::HandleTypeMismatch))
    }

    /// Escreve `data`. Pode bloquear.
    fn write<'k>(
        &self,
        guard: KernelGuard<'k>,
        _data: &[u8],
    ) -> (KernelGuard<'k>, SysResult<usize>) {
        (guard, Err(SysError::HandleTypeMismatch))
    }

    /// Chamado quando a última referência (FCB) ao objeto é solta.
    /// É o destrutor lógico.
    fn close(&self, state: &mut KernelState);
}
