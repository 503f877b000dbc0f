//! Mutex

#[allow(clippy::module_inception)]
mod mutex;

pub use mutex::{Mutex, MutexGuard};
