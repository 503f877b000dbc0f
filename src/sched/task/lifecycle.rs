//! Ciclo de vida de threads
//!
//! create / join / detach / exit sobre o registro de threads do processo.
//! Tudo roda sob o lock grosso; `join` dorme na `join_cv` do alvo.

use std::sync::Arc;

use super::thread::{slot_of, tid_of, Ptcb};
use crate::core::kernel::{Kernel, KernelGuard, KernelState};
use crate::core::process::{lifecycle as proc_lifecycle, ProcState};
use crate::klib::arena::SlotId;
use crate::sched::context::{self, ContextInfo};
use crate::sync::CondVar;
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Pid, Task, Tid};

/// Cria uma thread em `owner` e a coloca para rodar.
///
/// O registro entra no registro do processo (ordem de inserção) e o contador
/// de threads é incrementado antes de o contexto existir.
pub(crate) fn create_thread(
    state: &mut KernelState,
    kernel: &Arc<Kernel>,
    owner: Pid,
    task: Task,
    args: Vec<u8>,
    is_main: bool,
) -> SysResult<Tid> {
    let epoch = state
        .procs
        .get(owner)
        .map(|pcb| pcb.epoch)
        .ok_or(SysError::InvalidOperation)?;

    let slot = match state.threads.insert(Ptcb::new(owner, epoch, task, is_main)) {
        Some(slot) => slot,
        None => {
            crate::kwarn!("(Thread) Tabela de threads cheia");
            return Err(SysError::TooManyThreads);
        }
    };
    let tid = tid_of(slot);

    if let Some(pcb) = state.procs.get_mut(owner) {
        pcb.threads.push(tid);
        pcb.thread_count += 1;
        if is_main {
            pcb.main_thread = Some(tid);
        }
    }

    let info = ContextInfo {
        kernel: Arc::clone(kernel),
        pid: owner,
        epoch,
        tid,
    };
    // Último passo: a partir daqui a thread pode rodar.
    if context::spawn_context(info, move || run_thread(task, args, is_main)).is_err() {
        crate::core::panic::fatal("(Thread) host recusou criar contexto");
    }

    crate::kdebug!("(Thread) Criada TID=", tid.as_u64());
    Ok(tid)
}

/// Trampolim: roda a task e repassa o valor de retorno.
///
/// Thread principal: o valor vira o status de saída do processo.
fn run_thread(task: Task, args: Vec<u8>, is_main: bool) {
    let value = match context::run_guarded(|| task(&args)) {
        Some(value) => value,
        None => return,
    };
    drop(args);

    let ctx = match context::current() {
        Some(ctx) => ctx,
        None => return,
    };
    let mut guard = ctx.kernel.lock();
    if is_main {
        guard = proc_lifecycle::exit_locked(guard, ctx.pid, ctx.epoch, value);
    }
    let guard = finish_thread(guard, ctx.tid, value);
    drop(guard);
}

/// Bookkeeping de `ThreadExit`.
///
/// Marca `exited`, guarda o valor, acorda os joiners e solta a referência
/// própria. Se era a última thread viva de um processo vivo, o processo sai
/// com `value`.
pub(crate) fn finish_thread<'k>(mut guard: KernelGuard<'k>, tid: Tid, value: i32) -> KernelGuard<'k> {
    let slot = slot_of(tid);
    let (owner, epoch) = match guard.threads.get_mut(slot) {
        Some(ptcb) if !ptcb.exited => {
            ptcb.exited = true;
            ptcb.exit_value = value;
            ptcb.join_cv.notify_all();
            (ptcb.owner, ptcb.owner_epoch)
        }
        _ => return guard,
    };

    let mut last = false;
    if let Some(pcb) = guard.procs.get_mut(owner) {
        if pcb.epoch == epoch {
            pcb.thread_count = pcb.thread_count.saturating_sub(1);
            last = pcb.state == ProcState::Alive && pcb.thread_count == 0;
        }
    }

    drop_thread_ref(&mut guard, slot);
    crate::kdebug!("(Thread) Exit TID=", tid.as_u64());

    if last {
        crate::kdebug!("(Thread) Última thread, encerrando PID=", owner.as_u32());
        guard = proc_lifecycle::exit_locked(guard, owner, epoch, value);
    }
    guard
}

/// Espera `target` terminar e devolve seu valor de saída.
pub(crate) fn join_locked<'k>(
    mut guard: KernelGuard<'k>,
    caller: Pid,
    self_tid: Tid,
    target: Tid,
) -> (KernelGuard<'k>, SysResult<i32>) {
    if target == self_tid {
        return (guard, Err(SysError::InvalidOperation));
    }
    if !in_registry(&guard, caller, target) {
        return (guard, Err(SysError::NotFound));
    }

    let slot = slot_of(target);
    match guard.threads.get_mut(slot) {
        Some(ptcb) if ptcb.exited || ptcb.detached => {
            return (guard, Err(SysError::InvalidOperation));
        }
        Some(ptcb) => {
            ptcb.refcount.inc();
        }
        None => return (guard, Err(SysError::NotFound)),
    }

    loop {
        match guard.threads.get(slot) {
            Some(ptcb) if ptcb.exited || ptcb.detached => break,
            Some(_) => {}
            None => crate::core::panic::fatal("(Thread) registro liberado com joiner pendente"),
        }
        guard = CondVar::wait(guard, |s| s.threads.get_mut(slot).map(|p| &mut p.join_cv));
    }

    // Detach sempre derrota um join pendente.
    let result = match guard.threads.get(slot) {
        Some(ptcb) if ptcb.detached => Err(SysError::InvalidOperation),
        Some(ptcb) => Ok(ptcb.exit_value),
        None => Err(SysError::InvalidOperation),
    };
    drop_thread_ref(&mut guard, slot);
    (guard, result)
}

/// Marca `target` como detached e acorda os joiners.
pub(crate) fn detach_locked(state: &mut KernelState, caller: Pid, target: Tid) -> SysResult<()> {
    if !in_registry(state, caller, target) {
        return Err(SysError::NotFound);
    }
    let ptcb = state
        .threads
        .get_mut(slot_of(target))
        .ok_or(SysError::NotFound)?;
    if ptcb.exited {
        return Err(SysError::InvalidOperation);
    }
    ptcb.detached = true;
    ptcb.join_cv.notify_all();
    crate::kdebug!("(Thread) Detach TID=", target.as_u64());
    Ok(())
}

/// Joiners dormindo em `target` (visível para testes).
pub(crate) fn pending_joiners(state: &KernelState, target: Tid) -> usize {
    state
        .threads
        .get(slot_of(target))
        .map(|ptcb| ptcb.join_cv.waiters())
        .unwrap_or(0)
}

fn in_registry(state: &KernelState, caller: Pid, target: Tid) -> bool {
    state
        .procs
        .get(caller)
        .map(|pcb| pcb.threads.contains(&target))
        .unwrap_or(false)
}

/// Solta uma referência; libera o registro quando chega a zero.
fn drop_thread_ref(state: &mut KernelState, slot: SlotId) {
    let last = match state.threads.get_mut(slot) {
        Some(ptcb) => ptcb.refcount.dec(),
        None => false,
    };
    if last {
        release_thread(state, slot);
    }
}

fn release_thread(state: &mut KernelState, slot: SlotId) {
    let ptcb = match state.threads.remove(slot) {
        Some(ptcb) => ptcb,
        None => return,
    };
    let tid = tid_of(slot);
    if let Some(pcb) = state.procs.get_mut(ptcb.owner) {
        if pcb.epoch == ptcb.owner_epoch {
            pcb.threads.retain(|t| *t != tid);
            if pcb.main_thread == Some(tid) {
                pcb.main_thread = None;
            }
        }
    }
    crate::ktrace!("(Thread) Registro liberado TID=", tid.as_u64());
}
