//! Operações expostas do núcleo
//!
//! Chamadas em processo (não há ABI binária): cada função acha o contexto
//! chamador, trava o kernel e delega ao subsistema.
//!
//! # Módulos
//!
//! - `process`: spawn, exit, wait_child, getpid, getppid, open_info
//! - `thread`: create, self, join, detach, exit
//! - `io`: read, write, close, pipe
//! - `net`: socket, listen, accept, connect, shutdown

pub mod io;
pub mod net;
pub mod process;
pub mod thread;

pub use io::{sys_close, sys_pipe, sys_read, sys_write};
pub use net::{sys_accept, sys_connect, sys_listen, sys_shutdown, sys_socket};
pub use process::{
    sys_exit, sys_getpid, sys_getppid, sys_open_info, sys_spawn, sys_wait_child,
};
pub use thread::{
    sys_create_thread, sys_thread_detach, sys_thread_exit, sys_thread_join, sys_thread_self,
};
