//! Gerenciamento de Processos
//!
//! Tabela de processos de capacidade fixa. O índice do slot é o PID; uma
//! época por aquisição distingue ocupantes sucessivos do mesmo slot.
//!
//! Pais e filhos se referenciam só por PID: a lista de filhos não é dona de
//! nada e reparentar é mover índices.

pub mod info;
pub mod lifecycle;

use std::collections::VecDeque;

use crate::core::handle::FidTable;
use crate::sync::CondVar;
use crate::sys::types::{Pid, Task, Tid};

/// Estado do slot
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcState {
    Free,
    Alive,
    Zombie,
}

/// Process Control Block
pub struct Pcb {
    pub pid: Pid,
    pub state: ProcState,
    /// Época da aquisição atual do slot
    pub epoch: u64,
    /// Pai (referência fraca; reatribuída ao reparentar)
    pub parent: Option<Pid>,
    /// Filhos vivos e zumbis ainda não colhidos
    pub children: Vec<Pid>,
    /// Filhos já encerrados, em ordem de saída
    pub exited: VecDeque<Pid>,
    /// Sinalizada quando um filho sai
    pub child_exit: CondVar,
    pub main_task: Option<Task>,
    pub args: Vec<u8>,
    pub fidt: FidTable,
    /// Threads que ainda não saíram
    pub thread_count: usize,
    /// Registro de threads (ordem de inserção)
    pub threads: Vec<Tid>,
    pub main_thread: Option<Tid>,
    pub exit_status: i32,
}

impl Pcb {
    fn empty(pid: Pid, max_fileid: usize) -> Self {
        Self {
            pid,
            state: ProcState::Free,
            epoch: 0,
            parent: None,
            children: Vec::new(),
            exited: VecDeque::new(),
            child_exit: CondVar::new(),
            main_task: None,
            args: Vec::new(),
            fidt: FidTable::new(max_fileid),
            thread_count: 0,
            threads: Vec::new(),
            main_thread: None,
            exit_status: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == ProcState::Alive
    }
}

/// Tabela de processos
pub struct ProcessTable {
    slots: Vec<Pcb>,
    /// Slots livres; o próximo a sair é o último da lista.
    free: Vec<u32>,
    next_epoch: u64,
    max_fileid: usize,
}

impl ProcessTable {
    pub fn new(capacity: usize, max_fileid: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|i| Pcb::empty(Pid::new(i as u32), max_fileid))
                .collect(),
            free: (0..capacity as u32).rev().collect(),
            next_epoch: 1,
            max_fileid,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots não livres (vivos + zumbis).
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Retira um slot da free-list e o marca `Alive`.
    pub fn acquire(&mut self) -> Option<Pid> {
        let index = self.free.pop()?;
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let pcb = &mut self.slots[index as usize];
        pcb.state = ProcState::Alive;
        pcb.epoch = epoch;
        Some(pcb.pid)
    }

    /// Devolve o slot à free-list, zerando o PCB.
    pub fn release(&mut self, pid: Pid) {
        let max_fileid = self.max_fileid;
        let pcb = match self.slots.get_mut(pid.index()) {
            Some(pcb) if pcb.state != ProcState::Free => pcb,
            _ => return,
        };
        pcb.child_exit.notify_all();
        *pcb = Pcb::empty(pid, max_fileid);
        self.free.push(pid.as_u32());
    }

    /// PCB não livre de `pid`.
    pub fn get(&self, pid: Pid) -> Option<&Pcb> {
        self.slots
            .get(pid.index())
            .filter(|pcb| pcb.state != ProcState::Free)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        self.slots
            .get_mut(pid.index())
            .filter(|pcb| pcb.state != ProcState::Free)
    }

    /// `pid` está vivo e ainda é o ocupante da época `epoch`.
    pub fn is_current(&self, pid: Pid, epoch: u64) -> bool {
        self.get(pid)
            .map(|pcb| pcb.is_alive() && pcb.epoch == epoch)
            .unwrap_or(false)
    }

    /// Slots não livres, em ordem de slot.
    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.slots.iter().filter(|pcb| pcb.state != ProcState::Free)
    }
}
