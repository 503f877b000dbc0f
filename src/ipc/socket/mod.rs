//! Sockets locais (rendezvous por porta sobre pipes)

#[allow(clippy::module_inception)]
mod socket;

pub(crate) use socket::{accept, connect, listen, open, shutdown};
#[cfg(test)]
pub(crate) use socket::{accept_waiters, pending_requests};
pub use socket::{ListenerCb, PeerLink, Scb, ShutdownMode, SocketId, SocketKind, SocketStream};
