//! Contextos de Execução.
//!
//! Cada registro de thread roda num contexto próprio, realizado como uma
//! thread do host. O contexto sabe a que kernel, processo e thread pertence
//! por um registro thread-local (`CURRENT`).
//!
//! Um contexto termina de forma permanente desenrolando com `ContextExit`,
//! que o trampolim absorve; o código da task nunca volta a rodar.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::core::kernel::Kernel;
use crate::sched::config::{CONTEXT_STACK_SIZE, FAULT_STATUS};
use crate::sys::types::{Pid, Tid};

/// Identidade do contexto em execução.
#[derive(Clone)]
pub(crate) struct ContextInfo {
    pub kernel: Arc<Kernel>,
    pub pid: Pid,
    /// Época do slot do processo quando o contexto nasceu.
    pub epoch: u64,
    pub tid: Tid,
}

thread_local! {
    static CURRENT: RefCell<Option<ContextInfo>> = const { RefCell::new(None) };
}

/// Marcador de término de contexto (payload do unwind).
pub(crate) struct ContextExit;

/// Contexto chamador, se houver.
pub(crate) fn current() -> Option<ContextInfo> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Cria um contexto executável ligado a `body`.
///
/// O contexto passa a rodar imediatamente; o chamador deve ter deixado o
/// estado pronto antes.
pub(crate) fn spawn_context<F>(info: ContextInfo, body: F) -> std::io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    let name = format!("ctx-{}-{:x}", info.pid.as_u32(), info.tid.as_u64());
    thread::Builder::new()
        .name(name)
        .stack_size(CONTEXT_STACK_SIZE)
        .spawn(move || {
            CURRENT.with(|c| *c.borrow_mut() = Some(info));
            body();
            CURRENT.with(|c| c.borrow_mut().take());
        })
        .map(|_| ())
}

/// Roda o corpo de uma task, separando término voluntário de pânico.
///
/// - `Some(v)`: a task retornou `v`, ou entrou em pânico (`FAULT_STATUS`).
/// - `None`: a task já encerrou o contexto via `terminate`; nada a fazer.
pub(crate) fn run_guarded(body: impl FnOnce() -> i32) -> Option<i32> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => Some(value),
        Err(payload) if is_context_exit(&payload) => None,
        Err(_) => {
            crate::kerror!("(Sched) Task entrou em pânico, status=", FAULT_STATUS as u32);
            Some(FAULT_STATUS)
        }
    }
}

fn is_context_exit(payload: &Box<dyn Any + Send>) -> bool {
    payload.is::<ContextExit>()
}

/// Encerra o contexto atual. Não retorna.
///
/// O chamador já deve ter feito todo o bookkeeping e soltado o lock.
pub(crate) fn terminate() -> ! {
    panic::resume_unwind(Box::new(ContextExit))
}
