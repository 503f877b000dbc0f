//! # Process Lifecycle
//!
//! spawn, exit, wait_child.
//!
//! Versões `_locked` recebem o estado (ou o guard, quando podem dormir). As
//! syscalls em `syscall::process` só resolvem o chamador e delegam.

use std::sync::Arc;

use super::ProcState;
use crate::core::kernel::{Kernel, KernelGuard, KernelState};
use crate::sched::task::lifecycle as thread_lifecycle;
use crate::sync::CondVar;
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Pid, Task, WaitTarget};

/// Cria um processo.
///
/// `parent = None` só no boot (idle e init). Com `task = None` o processo
/// nasce sem thread (idle). A thread principal é o último passo: pode rodar
/// imediatamente.
pub(crate) fn spawn_locked(
    state: &mut KernelState,
    kernel: &Arc<Kernel>,
    parent: Option<Pid>,
    task: Option<Task>,
    args: &[u8],
) -> SysResult<Pid> {
    // Checa os dois limites antes de tocar em qualquer coisa.
    if task.is_some() && state.threads.available() == 0 {
        crate::kwarn!("(Proc) Spawn sem thread livre");
        return Err(SysError::TooManyThreads);
    }
    let pid = match state.procs.acquire() {
        Some(pid) => pid,
        None => {
            crate::kwarn!("(Proc) Tabela de processos cheia");
            return Err(SysError::TooManyProcesses);
        }
    };

    if let Some(pcb) = state.procs.get_mut(pid) {
        pcb.parent = parent;
        pcb.main_task = task;
        pcb.args = args.to_vec();
    }
    if let Some(ppid) = parent {
        if let Some(ppcb) = state.procs.get_mut(ppid) {
            ppcb.children.push(pid);
        }
        state.inherit_fids(ppid, pid);
    }

    if let Some(task) = task {
        if let Err(err) = thread_lifecycle::create_thread(state, kernel, pid, task, args.to_vec(), true) {
            crate::core::panic::fatal(match err {
                SysError::TooManyThreads => "(Proc) slot de thread reservado sumiu",
                _ => "(Proc) falha ao criar thread principal",
            });
        }
    }

    crate::kinfo!("(Proc) Spawn PID=", pid.as_u32());
    Ok(pid)
}

/// Encerra o processo `pid` (época `epoch`) com `status`.
///
/// Idempotente: um processo que já não está vivo (ou outro ocupante do slot)
/// é ignorado. Init primeiro colhe todos os filhos.
pub(crate) fn exit_locked<'k>(
    mut guard: KernelGuard<'k>,
    pid: Pid,
    epoch: u64,
    status: i32,
) -> KernelGuard<'k> {
    if pid == Pid::INIT {
        loop {
            if !guard.procs.is_current(pid, epoch) {
                return guard;
            }
            let (g, reaped) = wait_child_locked(guard, pid, epoch, WaitTarget::Any);
            guard = g;
            if reaped.is_err() {
                break;
            }
        }
    }
    if !guard.procs.is_current(pid, epoch) {
        return guard;
    }

    let state = &mut *guard;
    let (parent, children, exited) = match state.procs.get_mut(pid) {
        Some(pcb) => {
            pcb.args = Vec::new();
            (
                pcb.parent,
                std::mem::take(&mut pcb.children),
                std::mem::take(&mut pcb.exited),
            )
        }
        None => return guard,
    };

    state.close_all_fids(pid);

    // Órfãos vão para init; zumbis pendentes também.
    for child in &children {
        if let Some(cpcb) = state.procs.get_mut(*child) {
            cpcb.parent = Some(Pid::INIT);
        }
    }
    if let Some(init) = state.procs.get_mut(Pid::INIT) {
        init.children.extend(children.iter().copied());
        if !exited.is_empty() {
            init.exited.extend(exited.iter().copied());
            init.child_exit.notify_all();
        }
    }
    if !children.is_empty() {
        crate::kdebug!("(Proc) Órfãos reparentados para init: ", children.len());
    }

    if let Some(ppid) = parent {
        if let Some(ppcb) = state.procs.get_mut(ppid) {
            ppcb.exited.push_back(pid);
            ppcb.child_exit.notify_all();
        }
    }

    if let Some(pcb) = state.procs.get_mut(pid) {
        pcb.state = ProcState::Zombie;
        pcb.exit_status = status;
        // Outras threads deste processo presas em wait_child.
        pcb.child_exit.notify_all();
    }

    crate::kinfo!("(Proc) Exit PID=", pid.as_u32());
    if pid == Pid::INIT {
        state.halt.notify_all();
    }
    guard
}

/// Espera um filho sair e o colhe. Devolve (pid, status).
pub(crate) fn wait_child_locked<'k>(
    mut guard: KernelGuard<'k>,
    caller: Pid,
    epoch: u64,
    target: WaitTarget,
) -> (KernelGuard<'k>, SysResult<(Pid, i32)>) {
    if let WaitTarget::Child(child) = target {
        if child.index() >= guard.procs.capacity() {
            return (guard, Err(SysError::NoSuchChild));
        }
    }

    loop {
        // O processo pode ter saído (e o slot sido reusado) enquanto dormíamos.
        if !guard.procs.is_current(caller, epoch) {
            return (guard, Err(SysError::InvalidOperation));
        }
        let pcb = match guard.procs.get_mut(caller) {
            Some(pcb) => pcb,
            None => return (guard, Err(SysError::InvalidOperation)),
        };

        let ready = match target {
            WaitTarget::Any => {
                if pcb.children.is_empty() {
                    return (guard, Err(SysError::NoSuchChild));
                }
                pcb.exited.front().copied()
            }
            WaitTarget::Child(child) => {
                if !pcb.children.contains(&child) {
                    return (guard, Err(SysError::NoSuchChild));
                }
                let zombie = guard
                    .procs
                    .get(child)
                    .map(|c| c.state == ProcState::Zombie)
                    .unwrap_or(false);
                zombie.then_some(child)
            }
        };

        if let Some(child) = ready {
            let status = reap(&mut guard, caller, child);
            return (guard, Ok((child, status)));
        }

        guard = CondVar::wait(guard, |s| s.procs.get_mut(caller).map(|p| &mut p.child_exit));
    }
}

/// Remove `child` das listas do pai e libera o slot.
fn reap(state: &mut KernelState, parent: Pid, child: Pid) -> i32 {
    if let Some(pcb) = state.procs.get_mut(parent) {
        pcb.children.retain(|c| *c != child);
        pcb.exited.retain(|c| *c != child);
    }
    let status = state
        .procs
        .get(child)
        .map(|c| c.exit_status)
        .unwrap_or_default();
    state.procs.release(child);
    crate::kdebug!("(Proc) Reap PID=", child.as_u32());
    status
}
