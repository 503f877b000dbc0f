//! Nucleo Kernel Library.
//!
//! Núcleo de processos, threads e IPC de um kernel de ensino, hospedado:
//! contextos de execução são threads do host e todo estado compartilhado
//! passa por um único lock grosso.
//!
//! Ponto de entrada: [`Kernel::boot`]. Dentro de uma task, as operações de
//! [`syscall`] agem sobre o processo e a thread chamadores.

// --- Módulos de Baixo Nível ---
pub mod drivers; // Serial (destino dos logs)

// --- Módulos Centrais (Lógica do Kernel) ---
pub mod core; // Kernel, handles, processos, logging, caminho fatal
pub mod klib; // Arena de slots
pub mod sync; // Lock grosso e CondVar
pub mod sys; // Tipos e erros públicos

// --- Subsistemas ---
pub mod ipc; // Pipes, portas e sockets
pub mod sched; // Contextos e threads
pub mod syscall; // Operações expostas

pub use crate::core::kernel::Kernel;
pub use crate::core::process::info::{ProcInfo, PROCINFO_MAX_ARGS_SIZE, PROCINFO_RECORD_SIZE};
pub use crate::ipc::socket::ShutdownMode;
pub use crate::sched::config::KernelConfig;
pub use crate::sys::error::{ErrorClass, SysError, SysResult};
pub use crate::sys::types::{Fid, Pid, PipeFids, Port, Task, Tid, WaitTarget};
