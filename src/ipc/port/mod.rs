//! Portas de socket.
//!
//! Uma porta hospeda no máximo um Listener por vez. Portas válidas vão de 1
//! até `max_port`; 0 significa "sem porta".

mod registry;
pub use registry::{PortMap, NOPORT};
