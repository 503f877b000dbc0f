//! # Process Lifecycle
//!
//! exit, spawn, wait

use crate::core::kernel::syscall;
use crate::core::process::lifecycle::{exit_locked, spawn_locked, wait_child_locked};
use crate::sched::context;
use crate::sched::task::lifecycle::finish_thread;
use crate::sys::error::SysResult;
use crate::sys::types::{Pid, Task, WaitTarget};

/// Cria um processo filho do chamador executando `task(args)`.
///
/// O filho herda todos os fids abertos (mesmos FCBs) e recebe uma cópia de
/// `args`.
///
/// # Returns
/// PID do filho ou `TooManyProcesses` / `TooManyThreads`
pub fn sys_spawn(task: Task, args: &[u8]) -> SysResult<Pid> {
    syscall(|ctx, mut guard| spawn_locked(&mut guard, &ctx.kernel, Some(ctx.pid), Some(task), args))
}

/// Espera um filho terminar e o colhe.
///
/// `WaitTarget::Any` devolve os filhos em ordem de saída.
///
/// # Returns
/// (pid, status) ou `NoSuchChild`
pub fn sys_wait_child(target: WaitTarget) -> SysResult<(Pid, i32)> {
    syscall(|ctx, guard| wait_child_locked(guard, ctx.pid, ctx.epoch, target).1)
}

/// Encerra o processo atual. Não retorna.
pub fn sys_exit(status: i32) -> ! {
    let ctx = match context::current() {
        Some(ctx) => ctx,
        None => crate::core::panic::fatal("(Proc) sys_exit fora de um contexto"),
    };
    let guard = ctx.kernel.lock();
    let guard = exit_locked(guard, ctx.pid, ctx.epoch, status);
    let guard = finish_thread(guard, ctx.tid, status);
    drop(guard);
    drop(ctx);
    context::terminate()
}
