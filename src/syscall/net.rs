//! Syscalls de Sockets.
//!
//! Sockets locais: rendezvous por porta, transporte por pipes.

use std::time::Duration;

use crate::core::kernel::syscall;
use crate::ipc::socket::{self, ShutdownMode};
use crate::sys::error::SysResult;
use crate::sys::types::{Fid, Port};

/// Cria um socket Unbound, opcionalmente ligado a `port` (0 = sem porta).
pub fn sys_socket(port: Port) -> SysResult<Fid> {
    syscall(|ctx, mut guard| socket::open(&mut guard, ctx.pid, port))
}

/// Escuta conexões na porta do socket.
pub fn sys_listen(fid: Fid) -> SysResult<()> {
    syscall(|ctx, mut guard| socket::listen(&mut guard, ctx.pid, fid))
}

/// Aceita uma conexão; devolve o fid do Peer local.
pub fn sys_accept(fid: Fid) -> SysResult<Fid> {
    syscall(|ctx, guard| socket::accept(guard, ctx.pid, ctx.epoch, fid).1)
}

/// Conecta o socket ao Listener de `port`.
///
/// # Arguments
/// * `timeout`: `None` espera sem limite; `Some(d)` falha com `TimedOut`.
pub fn sys_connect(fid: Fid, port: Port, timeout: Option<Duration>) -> SysResult<()> {
    syscall(|ctx, guard| socket::connect(guard, ctx.pid, fid, port, timeout).1)
}

/// Fecha pontas do peer-link.
pub fn sys_shutdown(fid: Fid, mode: ShutdownMode) -> SysResult<()> {
    syscall(|ctx, mut guard| socket::shutdown(&mut guard, ctx.pid, fid, mode))
}
