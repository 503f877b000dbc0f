//! Syscalls de Threads
//!
//! create, self, join, detach, exit

use crate::core::kernel::syscall;
use crate::sched::context;
use crate::sched::task::lifecycle::{
    create_thread, detach_locked, finish_thread, join_locked, pending_joiners,
};
use crate::sys::error::SysResult;
use crate::sys::types::{Task, Tid};

/// Cria uma thread no processo do chamador executando `task(args)`.
///
/// O valor de retorno de `task` vira o valor de saída da thread.
pub fn sys_create_thread(task: Task, args: &[u8]) -> SysResult<Tid> {
    syscall(|ctx, mut guard| {
        create_thread(&mut guard, &ctx.kernel, ctx.pid, task, args.to_vec(), false)
    })
}

/// Tid do chamador.
pub fn sys_thread_self() -> SysResult<Tid> {
    syscall(|ctx, _guard| Ok(ctx.tid))
}

/// Espera `tid` sair e devolve seu valor.
///
/// Falha se `tid` é o próprio chamador, não está no registro do processo,
/// já saiu, ou é (ou vira) detached.
pub fn sys_thread_join(tid: Tid) -> SysResult<i32> {
    syscall(|ctx, guard| join_locked(guard, ctx.pid, ctx.tid, tid).1)
}

/// Marca `tid` como detached; joins pendentes falham.
pub fn sys_thread_detach(tid: Tid) -> SysResult<()> {
    syscall(|ctx, mut guard| detach_locked(&mut guard, ctx.pid, tid))
}

/// Encerra a thread atual. Não retorna.
pub fn sys_thread_exit(value: i32) -> ! {
    let ctx = match context::current() {
        Some(ctx) => ctx,
        None => crate::core::panic::fatal("(Thread) sys_thread_exit fora de um contexto"),
    };
    let guard = finish_thread(ctx.kernel.lock(), ctx.tid, value);
    drop(guard);
    drop(ctx);
    context::terminate()
}

/// Joiners bloqueados em `tid`.
pub(crate) fn sys_thread_joiners(tid: Tid) -> SysResult<usize> {
    syscall(|_ctx, guard| Ok(pending_joiners(&guard, tid)))
}
