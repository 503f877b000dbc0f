//! Thread Control Block

use crate::core::object::RefCount;
use crate::klib::arena::SlotId;
use crate::sync::CondVar;
use crate::sys::types::{Pid, Task, Tid};

/// Registro de thread (PTCB).
///
/// Contagem de referências: 1 do próprio contexto (solta em `ThreadExit`)
/// mais 1 por joiner pendente. O registro é liberado quando a contagem
/// chega a zero; a essa altura `exited` já é verdadeiro.
pub struct Ptcb {
    /// Processo dono
    pub owner: Pid,
    /// Época do slot do dono quando a thread nasceu
    pub owner_epoch: u64,
    /// Ponto de entrada (diagnóstico)
    pub task: Task,
    /// Thread principal do processo
    pub is_main: bool,
    /// Monotônico: vira `true` uma vez
    pub exited: bool,
    pub detached: bool,
    pub exit_value: i32,
    /// Joiners dormem aqui
    pub join_cv: CondVar,
    pub refcount: RefCount,
}

impl Ptcb {
    pub fn new(owner: Pid, owner_epoch: u64, task: Task, is_main: bool) -> Self {
        Self {
            owner,
            owner_epoch,
            task,
            is_main,
            exited: false,
            // A thread principal nunca é joinada; é recolhida no exit.
            detached: is_main,
            exit_value: 0,
            join_cv: CondVar::new(),
            refcount: RefCount::new(1),
        }
    }
}

/// Tid público de um slot da arena de threads.
#[inline]
pub fn tid_of(slot: SlotId) -> Tid {
    Tid::new(slot.as_u64())
}

/// Slot da arena apontado por um tid.
#[inline]
pub fn slot_of(tid: Tid) -> SlotId {
    SlotId::from_u64(tid.as_u64())
}
