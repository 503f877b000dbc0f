//! Kernel Library (KLib).
//!
//! Utilitários internos do Kernel.

pub mod arena;

pub use arena::{Arena, SlotId};
