//! # Process Information
//!
//! Stream somente-leitura sobre a tabela de processos: cada `read` devolve um
//! registro `ProcInfo` de tamanho fixo para o próximo slot não livre, em ordem
//! de slot; depois disso, 0 (EOF).

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::ProcState;
use crate::core::kernel::{KernelGuard, KernelState};
use crate::core::object::{StreamKind, StreamOps};
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Fid, Pid};

/// Bytes de argumentos copiados para o registro.
pub const PROCINFO_MAX_ARGS_SIZE: usize = 128;

/// Tamanho do registro serializado.
pub const PROCINFO_RECORD_SIZE: usize = 4 + 4 + 1 + 8 + 8 + 4 + PROCINFO_MAX_ARGS_SIZE;

/// `ppid` serializado de um processo sem pai.
pub const NO_PARENT: u32 = u32::MAX;

/// Informações de um processo (para userspace)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcInfo {
    pub pid: Pid,
    pub ppid: Option<Pid>,
    pub alive: bool,
    pub thread_count: u64,
    /// Identidade do ponto de entrada (0 = sem task)
    pub main_task: u64,
    /// Tamanho real dos argumentos
    pub argl: u32,
    /// Primeiros bytes dos argumentos, preenchido com zeros
    pub args: [u8; PROCINFO_MAX_ARGS_SIZE],
}

impl ProcInfo {
    /// Serializa em little-endian. `out` precisa de `PROCINFO_RECORD_SIZE` bytes.
    pub fn encode(&self, out: &mut [u8]) -> Option<()> {
        let out = out.get_mut(..PROCINFO_RECORD_SIZE)?;
        out[0..4].copy_from_slice(&self.pid.as_u32().to_le_bytes());
        let ppid = self.ppid.map(Pid::as_u32).unwrap_or(NO_PARENT);
        out[4..8].copy_from_slice(&ppid.to_le_bytes());
        out[8] = self.alive as u8;
        out[9..17].copy_from_slice(&self.thread_count.to_le_bytes());
        out[17..25].copy_from_slice(&self.main_task.to_le_bytes());
        out[25..29].copy_from_slice(&self.argl.to_le_bytes());
        out[29..].copy_from_slice(&self.args);
        Some(())
    }

    /// Lê um registro produzido por `encode`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..PROCINFO_RECORD_SIZE)?;
        let u32_at = |at: usize| -> Option<u32> {
            Some(u32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
        };
        let u64_at = |at: usize| -> Option<u64> {
            Some(u64::from_le_bytes(bytes.get(at..at + 8)?.try_into().ok()?))
        };

        let ppid = u32_at(4)?;
        let mut args = [0u8; PROCINFO_MAX_ARGS_SIZE];
        args.copy_from_slice(&bytes[29..]);
        Some(Self {
            pid: Pid::new(u32_at(0)?),
            ppid: (ppid != NO_PARENT).then(|| Pid::new(ppid)),
            alive: bytes[8] != 0,
            thread_count: u64_at(9)?,
            main_task: u64_at(17)?,
            argl: u32_at(25)?,
            args,
        })
    }

    /// Argumentos visíveis (até `argl`, limitado ao tamanho do registro).
    pub fn args(&self) -> &[u8] {
        let len = (self.argl as usize).min(PROCINFO_MAX_ARGS_SIZE);
        &self.args[..len]
    }
}

/// Stream de info aberto por `sys_open_info`.
pub struct InfoStream {
    /// Próximo slot a examinar (só muda sob o lock grosso)
    cursor: AtomicUsize,
}

impl InfoStream {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }

    fn next_record(&self, state: &KernelState) -> Option<ProcInfo> {
        let start = self.cursor.load(Ordering::Relaxed);
        let pcb = state.procs.iter().find(|pcb| pcb.pid.index() >= start)?;
        self.cursor.store(pcb.pid.index() + 1, Ordering::Relaxed);

        let mut args = [0u8; PROCINFO_MAX_ARGS_SIZE];
        let shown = pcb.args.len().min(PROCINFO_MAX_ARGS_SIZE);
        args[..shown].copy_from_slice(&pcb.args[..shown]);

        Some(ProcInfo {
            pid: pcb.pid,
            ppid: pcb.parent,
            alive: pcb.state == ProcState::Alive,
            thread_count: pcb.thread_count as u64,
            main_task: pcb.main_task.map(|task| task as usize as u64).unwrap_or(0),
            argl: pcb.args.len() as u32,
            args,
        })
    }
}

impl Default for InfoStream {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamOps for InfoStream {
    fn kind(&self) -> StreamKind {
        StreamKind::ProcInfo
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn read<'k>(&self, guard: KernelGuard<'k>, buf: &mut [u8]) -> (KernelGuard<'k>, SysResult<usize>) {
        if buf.len() < PROCINFO_RECORD_SIZE {
            return (guard, Err(SysError::InvalidArgument));
        }
        let result = match self.next_record(&guard) {
            Some(info) => match info.encode(buf) {
                Some(()) => Ok(PROCINFO_RECORD_SIZE),
                None => Err(SysError::InvalidArgument),
            },
            None => Ok(0),
        };
        (guard, result)
    }

    fn close(&self, _state: &mut KernelState) {}
}

/// Abre um stream de info num fid novo de `pid`.
pub(crate) fn open(state: &mut KernelState, pid: Pid) -> SysResult<Fid> {
    let reservation = state.reserve_fids(pid, 1)?;
    let stream: Arc<dyn StreamOps> = Arc::new(InfoStream::new());
    match reservation.install(state, vec![stream]).as_slice() {
        [fid] => Ok(*fid),
        _ => crate::core::panic::fatal("(Proc) reserva de info devolveu fids errados"),
    }
}
