//! # Process Syscalls
//!
//! Controle do ciclo de vida de processos.

pub mod info;
pub mod lifecycle;

pub use info::{sys_getpid, sys_getppid, sys_open_info};
pub use lifecycle::{sys_exit, sys_spawn, sys_wait_child};
