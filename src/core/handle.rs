//! Handle Table - Tabela de Fids por Processo
//!
//! Cada processo possui sua própria `FidTable` de tamanho fixo que mapeia fids
//! para FCBs da `FileTable` global. Um FCB é compartilhado (herança no spawn)
//! e contado por referência; o último `decref` fecha o stream.
//!
//! # Reserva
//!
//! Operações que criam vários fids de uma vez (pipe, accept) primeiro
//! RESERVAM os slots (`reserve`), depois constroem os objetos e só então
//! instalam. Falta de slot é detectada antes de qualquer alocação.

use std::sync::Arc;

use crate::core::kernel::KernelState;
use crate::core::object::{RefCount, StreamOps};
use crate::klib::arena::{Arena, SlotId};
use crate::sys::error::{SysError, SysResult};
use crate::sys::types::{Fid, Pid};

/// Id de um FCB na tabela global.
pub type FileId = SlotId;

/// File Control Block.
pub struct Fcb {
    refcount: RefCount,
    stream: Arc<dyn StreamOps>,
}

/// Tabela global de FCBs.
pub struct FileTable {
    fcbs: Arena<Fcb>,
}

impl FileTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fcbs: Arena::with_capacity(capacity),
        }
    }

    pub fn available(&self) -> usize {
        self.fcbs.available()
    }

    pub fn open_count(&self) -> usize {
        self.fcbs.len()
    }

    fn insert(&mut self, stream: Arc<dyn StreamOps>) -> Option<FileId> {
        self.fcbs.insert(Fcb {
            refcount: RefCount::new(1),
            stream,
        })
    }

    pub fn stream(&self, file: FileId) -> Option<Arc<dyn StreamOps>> {
        self.fcbs.get(file).map(|fcb| Arc::clone(&fcb.stream))
    }

    pub fn refcount(&self, file: FileId) -> Option<usize> {
        self.fcbs.get(file).map(|fcb| fcb.refcount.get())
    }

    pub fn incref(&mut self, file: FileId) {
        if let Some(fcb) = self.fcbs.get_mut(file) {
            fcb.refcount.inc();
        }
    }

    /// Decrementa. Se chegou a zero, remove o FCB e devolve o stream para
    /// ser fechado pelo chamador.
    #[must_use]
    fn decref(&mut self, file: FileId) -> Option<Arc<dyn StreamOps>> {
        let fcb = self.fcbs.get_mut(file)?;
        if fcb.refcount.dec() {
            self.fcbs.remove(file).map(|fcb| fcb.stream)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FidSlot {
    Free,
    Reserved,
    Open(FileId),
}

/// Tabela de fids de um processo
pub struct FidTable {
    slots: Vec<FidSlot>,
}

impl FidTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![FidSlot::Free; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == FidSlot::Free).count()
    }

    pub fn open_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, FidSlot::Open(_)))
            .count()
    }

    /// FCB apontado por `fid`.
    pub fn get(&self, fid: Fid) -> Option<FileId> {
        match self.slots.get(fid.index()) {
            Some(FidSlot::Open(file)) => Some(*file),
            _ => None,
        }
    }

    /// Fids abertos (para herança no spawn).
    pub fn open_files(&self) -> impl Iterator<Item = (Fid, FileId)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| match s {
            FidSlot::Open(file) => Some((Fid::new(i as u32), *file)),
            _ => None,
        })
    }

    fn set(&mut self, fid: Fid, file: FileId) {
        self.slots[fid.index()] = FidSlot::Open(file);
    }

    fn take(&mut self, fid: Fid) -> Option<FileId> {
        let slot = self.slots.get_mut(fid.index())?;
        match *slot {
            FidSlot::Open(file) => {
                *slot = FidSlot::Free;
                Some(file)
            }
            _ => None,
        }
    }

    /// Esvazia a tabela, devolvendo os FCBs que estavam abertos.
    fn drain(&mut self) -> Vec<FileId> {
        let mut files = Vec::new();
        for slot in self.slots.iter_mut() {
            if let FidSlot::Open(file) = *slot {
                files.push(file);
            }
            *slot = FidSlot::Free;
        }
        files
    }
}

/// Fids reservados, ainda sem objeto.
///
/// Consumida por `install` ou `cancel`; nenhuma das duas falha.
#[must_use]
pub struct Reservation {
    pid: Pid,
    fids: Vec<Fid>,
}

impl Reservation {
    pub fn fids(&self) -> &[Fid] {
        &self.fids
    }

    /// Instala um stream por fid reservado, na ordem da reserva.
    pub fn install(self, state: &mut KernelState, streams: Vec<Arc<dyn StreamOps>>) -> Vec<Fid> {
        if streams.len() != self.fids.len() {
            crate::core::panic::fatal("(Handle) install: streams != fids reservados");
        }
        for (fid, stream) in self.fids.iter().zip(streams) {
            let file = match state.files.insert(stream) {
                Some(file) => file,
                None => crate::core::panic::fatal("(Handle) install: FCB reservado sumiu"),
            };
            match state.procs.get_mut(self.pid) {
                Some(pcb) => pcb.fidt.set(*fid, file),
                None => crate::core::panic::fatal("(Handle) install: processo sumiu"),
            }
        }
        self.fids
    }

    /// Devolve os fids reservados sem instalar nada.
    pub fn cancel(self, state: &mut KernelState) {
        if let Some(pcb) = state.procs.get_mut(self.pid) {
            for fid in &self.fids {
                pcb.fidt.slots[fid.index()] = FidSlot::Free;
            }
        }
    }
}

impl KernelState {
    /// Reserva `n` fids no processo `pid` e garante `n` FCBs livres.
    ///
    /// Falha com `HandleTableFull` sem tocar em nada se faltar qualquer um.
    pub fn reserve_fids(&mut self, pid: Pid, n: usize) -> SysResult<Reservation> {
        let fcbs_free = self.files.available();
        let pcb = self.procs.get_mut(pid).ok_or(SysError::InvalidOperation)?;

        if pcb.fidt.free_count() < n || fcbs_free < n {
            crate::kdebug!("(Handle) reserve: sem slots para n=", n);
            return Err(SysError::HandleTableFull);
        }

        let mut fids = Vec::with_capacity(n);
        for (i, slot) in pcb.fidt.slots.iter_mut().enumerate() {
            if fids.len() == n {
                break;
            }
            if *slot == FidSlot::Free {
                *slot = FidSlot::Reserved;
                fids.push(Fid::new(i as u32));
            }
        }
        Ok(Reservation { pid, fids })
    }

    /// Resolve `fid` do processo `pid` para o seu stream.
    pub fn stream_of(&self, pid: Pid, fid: Fid) -> SysResult<Arc<dyn StreamOps>> {
        let pcb = self.procs.get(pid).ok_or(SysError::InvalidOperation)?;
        let file = pcb.fidt.get(fid).ok_or(SysError::BadHandle)?;
        self.files.stream(file).ok_or(SysError::BadHandle)
    }

    /// Solta uma referência ao FCB; fecha o stream se foi a última.
    pub fn release_file(&mut self, file: FileId) {
        if let Some(stream) = self.files.decref(file) {
            crate::ktrace!("(Handle) FCB liberado, fechando stream");
            stream.close(self);
        }
    }

    /// Fecha `fid` no processo `pid`.
    pub fn close_fid(&mut self, pid: Pid, fid: Fid) -> SysResult<()> {
        let pcb = self.procs.get_mut(pid).ok_or(SysError::InvalidOperation)?;
        let file = pcb.fidt.take(fid).ok_or(SysError::BadHandle)?;
        self.release_file(file);
        Ok(())
    }

    /// Fecha todos os fids de `pid` (exit).
    pub fn close_all_fids(&mut self, pid: Pid) {
        let files = match self.procs.get_mut(pid) {
            Some(pcb) => pcb.fidt.drain(),
            None => return,
        };
        for file in files {
            self.release_file(file);
        }
    }

    /// Copia os fids abertos de `parent` para `child`, incrementando cada FCB.
    pub fn inherit_fids(&mut self, parent: Pid, child: Pid) {
        let open: Vec<(Fid, FileId)> = match self.procs.get(parent) {
            Some(pcb) => pcb.fidt.open_files().collect(),
            None => return,
        };
        for (fid, file) in open {
            if let Some(pcb) = self.procs.get_mut(child) {
                if fid.index() < pcb.fidt.capacity() {
                    pcb.fidt.set(fid, file);
                    self.files.incref(file);
                }
            }
        }
    }
}
