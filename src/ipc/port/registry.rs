//! # Port Registry
//!
//! Tabela fixa porta → Listener.

use crate::ipc::socket::SocketId;
use crate::sys::types::Port;

/// Porta reservada para "sem porta".
pub const NOPORT: Port = 0;

/// Tabela de portas
pub struct PortMap {
    /// Índice = número da porta; o slot 0 nunca é usado.
    listeners: Vec<Option<SocketId>>,
}

impl PortMap {
    pub fn new(max_port: Port) -> Self {
        Self {
            listeners: vec![None; max_port as usize + 1],
        }
    }

    pub fn max_port(&self) -> Port {
        (self.listeners.len() - 1) as Port
    }

    /// `port` está em 1..=max_port.
    pub fn is_valid(&self, port: Port) -> bool {
        port != NOPORT && (port as usize) < self.listeners.len()
    }

    /// Listener instalado em `port`.
    pub fn listener(&self, port: Port) -> Option<SocketId> {
        if !self.is_valid(port) {
            return None;
        }
        self.listeners[port as usize]
    }

    /// Instala `socket` como Listener de `port`. Falha se ocupada ou inválida.
    pub fn bind(&mut self, port: Port, socket: SocketId) -> bool {
        if !self.is_valid(port) {
            return false;
        }
        let slot = &mut self.listeners[port as usize];
        if slot.is_some() {
            return false;
        }
        *slot = Some(socket);
        true
    }

    /// Remove o Listener de `port` se for `socket`.
    pub fn unbind(&mut self, port: Port, socket: SocketId) {
        if !self.is_valid(port) {
            return;
        }
        let slot = &mut self.listeners[port as usize];
        if *slot == Some(socket) {
            *slot = None;
        }
    }
}
