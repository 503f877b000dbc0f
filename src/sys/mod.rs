//! System Definitions.
//!
//! Tipos e erros que definem a interface entre o Kernel e as tasks.

pub mod error;
pub mod types;

pub use error::{ErrorClass, SysError, SysResult};
pub use types::{Fid, Pid, PipeFids, Port, Task, Tid, WaitTarget};
