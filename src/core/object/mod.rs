//! # Object - Objetos compartilhados do núcleo
//!
//! Contagem de referências e o conjunto de operações de stream.

pub mod refcount;
pub mod stream;

pub use refcount::RefCount;
pub use stream::{StreamKind, StreamOps};
