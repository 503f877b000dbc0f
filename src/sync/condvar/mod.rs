//! Condition Variable

#[allow(clippy::module_inception)]
mod condvar;

pub use condvar::CondVar;
