//! Pipes unidirecionais

#[allow(clippy::module_inception)]
mod pipe;

pub(crate) use pipe::{close_reader, close_writer, create, open, read, write};
pub use pipe::{PipeCb, PipeId, PipeReader, PipeWriter};
