//! Tipos fundamentais do sistema

/// Process ID.
///
/// É o índice estável do slot na tabela de processos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(pub u32);

impl Pid {
    /// Processo ocioso (scheduler), criado primeiro no boot.
    pub const IDLE: Pid = Pid(0);
    /// Processo init: herda órfãos e zumbis abandonados.
    pub const INIT: Pid = Pid(1);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Thread ID opaco.
///
/// Apelido do registro da thread: índice + geração. Só é válido enquanto o
/// registro existir; depois disso nunca volta a casar com outro registro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Tid(pub u64);

impl Tid {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// File ID: índice na tabela de handles do processo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fid(pub u32);

impl Fid {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Número de porta de socket (1..=MAX_PORT).
pub type Port = u16;

/// Ponto de entrada de uma task (processo ou thread).
///
/// Recebe o blob de argumentos e devolve o valor de saída.
pub type Task = fn(&[u8]) -> i32;

/// Alvo de `WaitChild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// Qualquer filho, em ordem de saída.
    Any,
    /// Um filho específico.
    Child(Pid),
}

/// Par de fids devolvido por `sys_pipe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeFids {
    pub read: Fid,
    pub write: Fid,
}
