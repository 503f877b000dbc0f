//! # Process Information
//!
//! getpid, getppid, open_info

use crate::core::kernel::syscall;
use crate::core::process::info;
use crate::sys::error::SysResult;
use crate::sys::types::{Fid, Pid};

/// PID do chamador.
pub fn sys_getpid() -> SysResult<Pid> {
    syscall(|ctx, _guard| Ok(ctx.pid))
}

/// PID do pai do chamador (`None` para idle e init).
pub fn sys_getppid() -> SysResult<Option<Pid>> {
    syscall(|ctx, guard| Ok(guard.procs.get(ctx.pid).and_then(|pcb| pcb.parent)))
}

/// Abre um stream de `ProcInfo` sobre a tabela de processos.
pub fn sys_open_info() -> SysResult<Fid> {
    syscall(|ctx, mut guard| info::open(&mut guard, ctx.pid))
}
