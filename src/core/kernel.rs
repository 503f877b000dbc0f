//! # Kernel - Instância do núcleo
//!
//! Todo o estado mutável (processos, threads, FCBs, pipes, sockets, portas)
//! mora em `KernelState`, atrás de UM lock grosso. Operações bloqueantes
//! recebem o guard, dormem numa `CondVar` do próprio estado e devolvem o guard.
//!
//! Cada contexto de execução acha o seu kernel pelo registro thread-local de
//! `sched::context`; vários kernels podem coexistir no mesmo host.

use std::sync::Arc;

use crate::core::handle::FileTable;
use crate::core::process::{lifecycle, ProcState, ProcessTable};
use crate::ipc::pipe::PipeCb;
use crate::ipc::port::PortMap;
use crate::ipc::socket::Scb;
use crate::klib::arena::Arena;
use crate::sched::config::KernelConfig;
use crate::sched::context::{self, ContextInfo};
use crate::sched::task::Ptcb;
use crate::sync::{CondVar, Mutex, MutexGuard};
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Pid, Task};

/// Guard do lock grosso.
pub type KernelGuard<'a> = MutexGuard<'a, KernelState>;

/// Estado protegido pelo lock grosso.
pub struct KernelState {
    pub(crate) config: KernelConfig,
    pub(crate) procs: ProcessTable,
    pub(crate) threads: Arena<Ptcb>,
    pub(crate) files: FileTable,
    pub(crate) pipes: Arena<PipeCb>,
    pub(crate) sockets: Arena<Scb>,
    pub(crate) ports: PortMap,
    /// Sinalizada quando init vira zumbi.
    pub(crate) halt: CondVar,
}

impl KernelState {
    pub(crate) fn new(config: KernelConfig) -> Self {
        Self {
            config,
            procs: ProcessTable::new(config.max_proc, config.max_fileid),
            threads: Arena::with_capacity(config.max_threads),
            files: FileTable::with_capacity(config.max_files),
            pipes: Arena::with_capacity(config.max_files),
            sockets: Arena::with_capacity(config.max_files),
            ports: PortMap::new(config.max_port),
            halt: CondVar::new(),
        }
    }

    /// Configuração com que o kernel subiu.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

/// O núcleo.
pub struct Kernel {
    state: Mutex<KernelState>,
    config: KernelConfig,
}

impl Kernel {
    /// Sobe o kernel e roda `init` até o fim.
    ///
    /// Cria pid 0 (idle, sem thread) e pid 1 (init, executando `init` com
    /// `args`), ambos sem pai. Bloqueia o chamador até init virar zumbi e
    /// devolve o status de saída de init.
    pub fn boot(config: KernelConfig, init: Task, args: &[u8]) -> SysResult<i32> {
        if !config.is_valid() {
            crate::kerror!("(Boot) KernelConfig inválida");
            return Err(SysError::InvalidArgument);
        }

        let kernel = Arc::new(Kernel {
            state: Mutex::new(KernelState::new(config)),
            config,
        });
        crate::kinfo!("(Boot) Tabela de processos: slots=", config.max_proc);

        let mut guard = kernel.lock();
        let idle = lifecycle::spawn_locked(&mut guard, &kernel, None, None, &[])?;
        let init_pid = lifecycle::spawn_locked(&mut guard, &kernel, None, Some(init), args)?;
        if idle != Pid::IDLE || init_pid != Pid::INIT {
            crate::core::panic::fatal("(Boot) idle/init fora dos slots 0/1");
        }
        crate::kok!("(Boot) init em execução");

        loop {
            match guard.procs.get(Pid::INIT) {
                Some(pcb) if pcb.state == ProcState::Zombie => {
                    let status = pcb.exit_status;
                    crate::kinfo!("(Boot) init terminou, status=", status as u32);
                    return Ok(status);
                }
                Some(_) => {}
                None => crate::core::panic::fatal("(Boot) slot de init liberado"),
            }
            guard = CondVar::wait(guard, |s| Some(&mut s.halt));
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Adquire o lock grosso.
    pub(crate) fn lock(&self) -> KernelGuard<'_> {
        self.state.lock()
    }
}

/// Entrada comum das operações expostas.
///
/// Acha o contexto chamador, trava o kernel e confere que o processo dono do
/// contexto ainda está vivo (mesma época). Contextos sem kernel, ou de um
/// processo que já saiu, recebem `InvalidOperation`.
pub(crate) fn syscall<R>(
    f: impl FnOnce(&ContextInfo, KernelGuard<'_>) -> SysResult<R>,
) -> SysResult<R> {
    let ctx = context::current().ok_or(SysError::InvalidOperation)?;
    let guard = ctx.kernel.lock();
    if !guard.procs.is_current(ctx.pid, ctx.epoch) {
        crate::kdebug!("(Kernel) chamada de processo que já saiu, pid=", ctx.pid.as_u32());
        return Err(SysError::InvalidOperation);
    }
    f(&ctx, guard)
}
