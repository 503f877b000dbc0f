//! Task management module

pub mod lifecycle;
pub mod thread;

pub use thread::Ptcb;
