//! Primitivas de espera do escalonador

pub mod waitqueue;

pub use waitqueue::{WaitQueue, Waiter};
