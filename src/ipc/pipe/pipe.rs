//! Pipes unidirecionais
//!
//! Ring buffer de bytes com capacidade fixa e semântica bloqueante de
//! produtor/consumidor. Cada ponta (reader/writer) pode estar presente ou
//! fechada; o armazenamento só é liberado quando as duas fecham.
//!
//! Transferência em lote: a cada volta do loop o escritor enfileira o que
//! couber e o leitor drena o que houver. Toda mudança acorda todos os
//! esperando do outro lado.

use std::any::Any;
use std::sync::Arc;

use crate::core::kernel::{KernelGuard, KernelState};
use crate::core::object::{StreamKind, StreamOps};
use crate::klib::arena::SlotId;
use crate::sync::CondVar;
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Pid, PipeFids};

/// Id de um pipe na arena do kernel.
pub type PipeId = SlotId;

/// Pipe control block
pub struct PipeCb {
    buffer: Box<[u8]>,
    /// Índice do byte mais antigo
    head: usize,
    /// Ocupação (0..=capacidade)
    len: usize,
    reader_open: bool,
    writer_open: bool,
    has_data: CondVar,
    has_space: CondVar,
}

impl PipeCb {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            reader_open: true,
            writer_open: true,
            has_data: CondVar::new(),
            has_space: CondVar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Enfileira o quanto couber de `data`. Retorna bytes aceitos.
    fn push(&mut self, data: &[u8]) -> usize {
        let cap = self.capacity();
        let n = data.len().min(cap - self.len);
        let tail = (self.head + self.len) % cap;
        let first = n.min(cap - tail);
        self.buffer[tail..tail + first].copy_from_slice(&data[..first]);
        self.buffer[..n - first].copy_from_slice(&data[first..n]);
        self.len += n;
        n
    }

    /// Desenfileira até `out.len()` bytes. Retorna bytes copiados.
    fn pop(&mut self, out: &mut [u8]) -> usize {
        let cap = self.capacity();
        let n = out.len().min(self.len);
        let first = n.min(cap - self.head);
        out[..first].copy_from_slice(&self.buffer[self.head..self.head + first]);
        out[first..n].copy_from_slice(&self.buffer[..n - first]);
        self.head = (self.head + n) % cap;
        self.len -= n;
        n
    }
}

/// Cria um pipe novo na arena.
pub(crate) fn create(state: &mut KernelState) -> Option<PipeId> {
    let capacity = state.config.pipe_buffer_size;
    let id = state.pipes.insert(PipeCb::new(capacity))?;
    crate::ktrace!("(Pipe) Criado, capacidade=", capacity);
    Some(id)
}

/// Cria um pipe e instala as duas pontas em fids novos de `pid`.
pub(crate) fn open(state: &mut KernelState, pid: Pid) -> SysResult<PipeFids> {
    let reservation = state.reserve_fids(pid, 2)?;
    let id = match create(state) {
        Some(id) => id,
        None => {
            reservation.cancel(state);
            return Err(SysError::HandleTableFull);
        }
    };
    let reader: Arc<dyn StreamOps> = Arc::new(PipeReader::new(id));
    let writer: Arc<dyn StreamOps> = Arc::new(PipeWriter::new(id));
    let fids = reservation.install(state, vec![reader, writer]);
    match fids.as_slice() {
        [read, write] => Ok(PipeFids {
            read: *read,
            write: *write,
        }),
        _ => crate::core::panic::fatal("(Pipe) reserva devolveu fids errados"),
    }
}

/// Escreve `data` inteiro, bloqueando enquanto o ring estiver cheio.
///
/// Falha com `BrokenPipe` se alguma ponta já estiver fechada. Se o leitor
/// fechar no meio da espera, devolve o que já foi escrito (ou `BrokenPipe`
/// se nada foi).
pub(crate) fn write<'k>(
    mut guard: KernelGuard<'k>,
    id: PipeId,
    data: &[u8],
) -> (KernelGuard<'k>, SysResult<usize>) {
    match guard.pipes.get(id) {
        Some(pipe) if pipe.reader_open && pipe.writer_open => {}
        _ => return (guard, Err(SysError::BrokenPipe)),
    }

    let mut written = 0;
    while written < data.len() {
        let pipe = match guard.pipes.get_mut(id) {
            Some(pipe) if pipe.reader_open => pipe,
            _ => break,
        };
        let n = pipe.push(&data[written..]);
        if n > 0 {
            written += n;
            pipe.has_data.notify_all();
            continue;
        }
        guard = CondVar::wait(guard, |s| s.pipes.get_mut(id).map(|p| &mut p.has_space));
    }

    if written == 0 && !data.is_empty() {
        crate::ktrace!("(Pipe) Write em pipe sem leitor");
        return (guard, Err(SysError::BrokenPipe));
    }
    (guard, Ok(written))
}

/// Lê até `buf.len()` bytes.
///
/// Bloqueia enquanto vazio e o escritor existir; devolve 0 (EOF) se o
/// escritor fechou e não resta nada. Leitura curta é normal: drena só o que
/// está no ring no momento.
pub(crate) fn read<'k>(
    mut guard: KernelGuard<'k>,
    id: PipeId,
    buf: &mut [u8],
) -> (KernelGuard<'k>, SysResult<usize>) {
    loop {
        let pipe = match guard.pipes.get_mut(id) {
            Some(pipe) if pipe.reader_open => pipe,
            _ => return (guard, Err(SysError::BrokenPipe)),
        };
        if buf.is_empty() {
            return (guard, Ok(0));
        }
        if !pipe.is_empty() {
            let n = pipe.pop(buf);
            pipe.has_space.notify_all();
            return (guard, Ok(n));
        }
        if !pipe.writer_open {
            return (guard, Ok(0));
        }
        guard = CondVar::wait(guard, |s| s.pipes.get_mut(id).map(|p| &mut p.has_data));
    }
}

/// Fecha a ponta de leitura. Escritores presos falham.
pub(crate) fn close_reader(state: &mut KernelState, id: PipeId) {
    if let Some(pipe) = state.pipes.get_mut(id) {
        pipe.reader_open = false;
        pipe.has_space.notify_all();
        pipe.has_data.notify_all();
    }
    release_if_unused(state, id);
}

/// Fecha a ponta de escrita. Leitores presos veem EOF.
pub(crate) fn close_writer(state: &mut KernelState, id: PipeId) {
    if let Some(pipe) = state.pipes.get_mut(id) {
        pipe.writer_open = false;
        pipe.has_data.notify_all();
        pipe.has_space.notify_all();
    }
    release_if_unused(state, id);
}

fn release_if_unused(state: &mut KernelState, id: PipeId) {
    let unused = state
        .pipes
        .get(id)
        .map(|pipe| !pipe.reader_open && !pipe.writer_open)
        .unwrap_or(false);
    if unused {
        state.pipes.remove(id);
        crate::ktrace!("(Pipe) Ring liberado");
    }
}

/// Ponta de leitura vista por um fid.
pub struct PipeReader {
    pipe: PipeId,
}

impl PipeReader {
    pub(crate) fn new(pipe: PipeId) -> Self {
        Self { pipe }
    }
}

impl StreamOps for PipeReader {
    fn kind(&self) -> StreamKind {
        StreamKind::PipeReader
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn read<'k>(&self, guard: KernelGuard<'k>, buf: &mut [u8]) -> (KernelGuard<'k>, SysResult<usize>) {
        read(guard, self.pipe, buf)
    }

    fn close(&self, state: &mut KernelState) {
        close_reader(state, self.pipe);
    }
}

/// Ponta de escrita vista por um fid.
pub struct PipeWriter {
    pipe: PipeId,
}

impl PipeWriter {
    pub(crate) fn new(pipe: PipeId) -> Self {
        Self { pipe }
    }
}

impl StreamOps for PipeWriter {
    fn kind(&self) -> StreamKind {
        StreamKind::PipeWriter
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn write<'k>(&self, guard: KernelGuard<'k>, data: &[u8]) -> (KernelGuard<'k>, SysResult<usize>) {
        write(guard, self.pipe, data)
    }

    fn close(&self, state: &mut KernelState) {
        close_writer(state, self.pipe);
    }
}
