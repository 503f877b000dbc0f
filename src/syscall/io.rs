//! Syscalls de IO
//!
//! Leitura, escrita e fechamento via fids. O fid resolve para um stream
//! (pipe, socket, info) que implementa as operações.

use crate::core::kernel::syscall;
use crate::ipc::pipe;
use crate::sys::error::SysResult;
use crate::sys::types::{Fid, PipeFids};

/// Lê de `fid` para `buf`. Pode bloquear.
///
/// # Retorno
/// Bytes lidos (0 = EOF) ou erro
pub fn sys_read(fid: Fid, buf: &mut [u8]) -> SysResult<usize> {
    syscall(|ctx, guard| {
        let stream = guard.stream_of(ctx.pid, fid)?;
        stream.read(guard, buf).1
    })
}

/// Escreve `data` em `fid`. Pode bloquear.
///
/// # Retorno
/// Bytes escritos ou erro
pub fn sys_write(fid: Fid, data: &[u8]) -> SysResult<usize> {
    syscall(|ctx, guard| {
        let stream = guard.stream_of(ctx.pid, fid)?;
        stream.write(guard, data).1
    })
}

/// Fecha `fid`. O objeto é fechado quando o último fid que o aponta fecha.
pub fn sys_close(fid: Fid) -> SysResult<()> {
    syscall(|ctx, mut guard| guard.close_fid(ctx.pid, fid))
}

/// Cria um pipe. Devolve (leitura, escrita).
pub fn sys_pipe() -> SysResult<PipeFids> {
    syscall(|ctx, mut guard| pipe::open(&mut guard, ctx.pid))
}
