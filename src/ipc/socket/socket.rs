//! Sockets sobre pipes.
//!
//! Um socket nasce `Unbound` (com ou sem porta). `listen` o torna Listener
//! da porta; `connect` enfileira um Unbound na fila FIFO do Listener e espera;
//! `accept` tira o pedido mais antigo e liga os dois lados com um par de pipes
//! cruzados (peer-link), tornando ambos `Peer`.
//!
//! # Accept sem estado parcial
//!
//! Fid, pipes e socket novo são checados ANTES de tirar o pedido da fila.
//! Se faltar qualquer um, o pedido fica onde estava e nenhum peer-link existe.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::core::kernel::{KernelGuard, KernelState};
use crate::core::object::{StreamKind, StreamOps};
use crate::ipc::pipe::{self, PipeId};
use crate::ipc::port::NOPORT;
use crate::klib::arena::SlotId;
use crate::sync::CondVar;
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Fid, Pid, Port};

/// Id de um socket na arena do kernel.
pub type SocketId = SlotId;

bitflags! {
    /// Pontas do peer-link fechadas por `shutdown`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ShutdownMode: u32 {
        /// Fecha a ponta de leitura.
        const READ  = 1 << 0;
        /// Fecha a ponta de escrita.
        const WRITE = 1 << 1;
        const BOTH  = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Par de pipes de um lado da conexão.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerLink {
    /// Lido por este lado, escrito pelo outro
    pub read: PipeId,
    /// Escrito por este lado, lido pelo outro
    pub write: PipeId,
}

/// Estado de Listener.
pub struct ListenerCb {
    /// Pedidos de conexão pendentes (FIFO)
    queue: VecDeque<SocketId>,
    /// Accepters dormem aqui
    accept_cv: CondVar,
}

pub enum SocketKind {
    Unbound,
    Listener(ListenerCb),
    Peer(PeerLink),
}

/// Socket control block
pub struct Scb {
    port: Port,
    kind: SocketKind,
    /// Listener em cuja fila este socket espera
    pending: Option<SocketId>,
    /// Conector dorme aqui até virar Peer
    connected: CondVar,
}

impl Scb {
    fn new(port: Port) -> Self {
        Self {
            port,
            kind: SocketKind::Unbound,
            pending: None,
            connected: CondVar::new(),
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn kind(&self) -> &SocketKind {
        &self.kind
    }

    pub fn is_listener(&self) -> bool {
        matches!(self.kind, SocketKind::Listener(_))
    }

    pub fn peer(&self) -> Option<PeerLink> {
        match self.kind {
            SocketKind::Peer(link) => Some(link),
            _ => None,
        }
    }

    fn listener_mut(&mut self) -> Option<&mut ListenerCb> {
        match &mut self.kind {
            SocketKind::Listener(l) => Some(l),
            _ => None,
        }
    }
}

/// Socket visto por um fid.
pub struct SocketStream {
    id: SocketId,
}

impl SocketStream {
    pub fn id(&self) -> SocketId {
        self.id
    }
}

/// Resolve `fid` de `pid` para o socket por trás.
fn socket_of(state: &KernelState, pid: Pid, fid: Fid) -> SysResult<SocketId> {
    let stream = state.stream_of(pid, fid)?;
    stream
        .as_any()
        .downcast_ref::<SocketStream>()
        .map(SocketStream::id)
        .ok_or(SysError::HandleTypeMismatch)
}

/// Cria um socket Unbound (porta 0 = efêmero, só para conectar).
pub(crate) fn open(state: &mut KernelState, pid: Pid, port: Port) -> SysResult<Fid> {
    if port != NOPORT && !state.ports.is_valid(port) {
        return Err(SysError::InvalidArgument);
    }
    let reservation = state.reserve_fids(pid, 1)?;
    let id = match state.sockets.insert(Scb::new(port)) {
        Some(id) => id,
        None => {
            reservation.cancel(state);
            return Err(SysError::HandleTableFull);
        }
    };
    let stream: Arc<dyn StreamOps> = Arc::new(SocketStream { id });
    match reservation.install(state, vec![stream]).as_slice() {
        [fid] => {
            crate::ktrace!("(Socket) Criado na porta ", port);
            Ok(*fid)
        }
        _ => crate::core::panic::fatal("(Socket) reserva devolveu fids errados"),
    }
}

/// Torna o socket Listener da sua porta.
pub(crate) fn listen(state: &mut KernelState, pid: Pid, fid: Fid) -> SysResult<()> {
    let id = socket_of(state, pid, fid)?;
    let scb = state.sockets.get(id).ok_or(SysError::BadHandle)?;
    if !matches!(scb.kind, SocketKind::Unbound) || scb.pending.is_some() || scb.port == NOPORT {
        return Err(SysError::ProtocolViolation);
    }
    let port = scb.port;
    if !state.ports.bind(port, id) {
        crate::kdebug!("(Socket) Listen em porta ocupada ", port);
        return Err(SysError::PortInUse);
    }
    if let Some(scb) = state.sockets.get_mut(id) {
        scb.kind = SocketKind::Listener(ListenerCb {
            queue: VecDeque::new(),
            accept_cv: CondVar::new(),
        });
    }
    crate::kdebug!("(Socket) Listener na porta ", port);
    Ok(())
}

/// Espera um pedido de conexão e cria o Peer local. Devolve o fid novo.
///
/// `epoch` é a época do chamador: se o processo sair durante a espera, o fid
/// novo não pode cair em quem herdou o slot.
pub(crate) fn accept<'k>(
    mut guard: KernelGuard<'k>,
    pid: Pid,
    epoch: u64,
    fid: Fid,
) -> (KernelGuard<'k>, SysResult<Fid>) {
    let lid = match socket_of(&guard, pid, fid) {
        Ok(id) => id,
        Err(err) => return (guard, Err(err)),
    };
    match guard.sockets.get(lid) {
        Some(scb) if scb.is_listener() => {}
        _ => return (guard, Err(SysError::ProtocolViolation)),
    }
    let no_fid = guard
        .procs
        .get(pid)
        .map(|pcb| pcb.fidt.free_count() == 0)
        .unwrap_or(true);
    if no_fid {
        return (guard, Err(SysError::HandleTableFull));
    }

    loop {
        if !guard.procs.is_current(pid, epoch) {
            crate::kdebug!("(Socket) Accept de processo que já saiu, pid=", pid.as_u32());
            return (guard, Err(SysError::InvalidOperation));
        }
        match guard.sockets.get_mut(lid).and_then(Scb::listener_mut) {
            Some(l) if !l.queue.is_empty() => break,
            Some(_) => {}
            // Listener fechado enquanto esperávamos.
            None => return (guard, Err(SysError::BadHandle)),
        }
        guard = CondVar::wait(guard, |s| {
            s.sockets
                .get_mut(lid)
                .and_then(Scb::listener_mut)
                .map(|l| &mut l.accept_cv)
        });
    }

    if guard.pipes.available() < 2 || guard.sockets.available() < 1 {
        return (guard, Err(SysError::HandleTableFull));
    }
    let reservation = match guard.reserve_fids(pid, 1) {
        Ok(r) => r,
        Err(err) => return (guard, Err(err)),
    };

    let state = &mut *guard;
    let (port, requester) = match state.sockets.get_mut(lid) {
        Some(scb) => {
            let port = scb.port;
            match scb.listener_mut().and_then(|l| l.queue.pop_front()) {
                Some(requester) => (port, requester),
                None => crate::core::panic::fatal("(Socket) fila de accept esvaziou sob o lock"),
            }
        }
        None => crate::core::panic::fatal("(Socket) listener sumiu sob o lock"),
    };

    // to_server: requester escreve, servidor lê. to_client: o contrário.
    let (to_server, to_client) = match (pipe::create(state), pipe::create(state)) {
        (Some(a), Some(b)) => (a, b),
        _ => crate::core::panic::fatal("(Socket) pipes do peer-link indisponíveis"),
    };
    let server = Scb {
        port,
        kind: SocketKind::Peer(PeerLink {
            read: to_server,
            write: to_client,
        }),
        pending: None,
        connected: CondVar::new(),
    };
    let server = match state.sockets.insert(server) {
        Some(id) => id,
        None => crate::core::panic::fatal("(Socket) slot de socket indisponível"),
    };

    match state.sockets.get_mut(requester) {
        Some(scb) => {
            scb.kind = SocketKind::Peer(PeerLink {
                read: to_client,
                write: to_server,
            });
            scb.pending = None;
            scb.connected.notify_all();
        }
        None => crate::core::panic::fatal("(Socket) pedido na fila sem socket"),
    }

    let stream: Arc<dyn StreamOps> = Arc::new(SocketStream { id: server });
    let result = match reservation.install(state, vec![stream]).as_slice() {
        [fid] => Ok(*fid),
        _ => crate::core::panic::fatal("(Socket) reserva devolveu fids errados"),
    };
    crate::kdebug!("(Socket) Accept na porta ", port);
    (guard, result)
}

/// Pede conexão ao Listener de `port` e espera ser aceito.
///
/// `timeout = None` espera sem limite. Expirado o prazo, o pedido sai da fila
/// e a chamada falha com `TimedOut`.
pub(crate) fn connect<'k>(
    mut guard: KernelGuard<'k>,
    pid: Pid,
    fid: Fid,
    port: Port,
    timeout: Option<Duration>,
) -> (KernelGuard<'k>, SysResult<()>) {
    let id = match socket_of(&guard, pid, fid) {
        Ok(id) => id,
        Err(err) => return (guard, Err(err)),
    };
    if !guard.ports.is_valid(port) {
        return (guard, Err(SysError::InvalidArgument));
    }
    let lid = match guard.ports.listener(port) {
        Some(lid) => lid,
        None => return (guard, Err(SysError::ProtocolViolation)),
    };
    match guard.sockets.get_mut(id) {
        Some(scb) if matches!(scb.kind, SocketKind::Unbound) && scb.pending.is_none() => {
            scb.pending = Some(lid);
        }
        _ => return (guard, Err(SysError::ProtocolViolation)),
    }
    match guard.sockets.get_mut(lid).and_then(Scb::listener_mut) {
        Some(l) => {
            l.queue.push_back(id);
            l.accept_cv.notify_all();
        }
        None => crate::core::panic::fatal("(Socket) porta aponta para não-listener"),
    }
    crate::ktrace!("(Socket) Connect enfileirado na porta ", port);

    let deadline = timeout.map(|d| Instant::now() + d);
    loop {
        match guard.sockets.get(id) {
            Some(scb) if scb.peer().is_some() => return (guard, Ok(())),
            Some(scb) if scb.pending.is_none() => {
                return (guard, Err(SysError::ConnectionRefused));
            }
            Some(_) => {}
            None => return (guard, Err(SysError::BadHandle)),
        }

        match deadline {
            None => {
                guard = CondVar::wait(guard, |s| s.sockets.get_mut(id).map(|c| &mut c.connected));
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    withdraw(&mut guard, id);
                    crate::kdebug!("(Socket) Connect expirou na porta ", port);
                    return (guard, Err(SysError::TimedOut));
                }
                guard = CondVar::wait_timeout(
                    guard,
                    |s| s.sockets.get_mut(id).map(|c| &mut c.connected),
                    deadline - now,
                )
                .0;
            }
        }
    }
}

/// Tira `id` da fila do Listener em que espera.
fn withdraw(state: &mut KernelState, id: SocketId) {
    let lid = match state.sockets.get_mut(id).and_then(|scb| scb.pending.take()) {
        Some(lid) => lid,
        None => return,
    };
    if let Some(l) = state.sockets.get_mut(lid).and_then(Scb::listener_mut) {
        l.queue.retain(|r| *r != id);
    }
}

/// Pedidos na fila do Listener em `fid`.
#[cfg(test)]
pub(crate) fn pending_requests(state: &KernelState, pid: Pid, fid: Fid) -> SysResult<usize> {
    let id = socket_of(state, pid, fid)?;
    match state.sockets.get(id).map(Scb::kind) {
        Some(SocketKind::Listener(l)) => Ok(l.queue.len()),
        _ => Err(SysError::ProtocolViolation),
    }
}

/// Accepters dormindo no Listener em `fid`.
#[cfg(test)]
pub(crate) fn accept_waiters(state: &KernelState, pid: Pid, fid: Fid) -> SysResult<usize> {
    let id = socket_of(state, pid, fid)?;
    match state.sockets.get(id).map(Scb::kind) {
        Some(SocketKind::Listener(l)) => Ok(l.accept_cv.waiters()),
        _ => Err(SysError::ProtocolViolation),
    }
}

/// Fecha pontas do peer-link.
pub(crate) fn shutdown(state: &mut KernelState, pid: Pid, fid: Fid, mode: ShutdownMode) -> SysResult<()> {
    let id = socket_of(state, pid, fid)?;
    let link = state
        .sockets
        .get(id)
        .and_then(Scb::peer)
        .ok_or(SysError::NotConnected)?;
    if mode.contains(ShutdownMode::READ) {
        pipe::close_reader(state, link.read);
    }
    if mode.contains(ShutdownMode::WRITE) {
        pipe::close_writer(state, link.write);
    }
    crate::ktrace!("(Socket) Shutdown modo=", mode.bits());
    Ok(())
}

impl StreamOps for SocketStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Socket
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn read<'k>(&self, guard: KernelGuard<'k>, buf: &mut [u8]) -> (KernelGuard<'k>, SysResult<usize>) {
        match guard.sockets.get(self.id).and_then(Scb::peer) {
            Some(link) => pipe::read(guard, link.read, buf),
            None => (guard, Err(SysError::NotConnected)),
        }
    }

    fn write<'k>(&self, guard: KernelGuard<'k>, data: &[u8]) -> (KernelGuard<'k>, SysResult<usize>) {
        match guard.sockets.get(self.id).and_then(Scb::peer) {
            Some(link) => pipe::write(guard, link.write, data),
            None => (guard, Err(SysError::NotConnected)),
        }
    }

    fn close(&self, state: &mut KernelState) {
        withdraw(state, self.id);
        let mut scb = match state.sockets.remove(self.id) {
            Some(scb) => scb,
            None => return,
        };

        match &mut scb.kind {
            SocketKind::Unbound => {}
            SocketKind::Listener(l) => {
                state.ports.unbind(scb.port, self.id);
                for requester in l.queue.drain(..) {
                    if let Some(r) = state.sockets.get_mut(requester) {
                        r.pending = None;
                        r.connected.notify_all();
                    }
                }
                l.accept_cv.notify_all();
                crate::kdebug!("(Socket) Listener fechado na porta ", scb.port);
            }
            SocketKind::Peer(link) => {
                pipe::close_reader(state, link.read);
                pipe::close_writer(state, link.write);
            }
        }
        scb.connected.notify_all();
    }
}
