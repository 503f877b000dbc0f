//! Constantes de configuração do núcleo

/// Slots na tabela de processos
pub const MAX_PROC: usize = 1024;

/// Slots na tabela de handles de cada processo
pub const MAX_FILEID: usize = 16;

/// FCBs no kernel inteiro
pub const MAX_FILES: usize = 2048;

/// Registros de thread no kernel inteiro
pub const MAX_THREADS: usize = 4096;

/// Capacidade do ring buffer de cada pipe (bytes)
pub const PIPE_BUFFER_SIZE: usize = 4096;

/// Maior número de porta válido (0 = sem porta)
pub const MAX_PORT: u16 = 1023;

/// Tamanho da stack de cada contexto de execução (bytes)
pub const CONTEXT_STACK_SIZE: usize = 256 * 1024; // 256KB

/// Valor de saída de uma task cujo corpo entrou em pânico
pub const FAULT_STATUS: i32 = -1;

/// Tamanhos das tabelas de um kernel.
///
/// `Default` usa as constantes acima; testes encolhem as tabelas para
/// exercitar esgotamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub max_proc: usize,
    pub max_fileid: usize,
    pub max_files: usize,
    pub max_threads: usize,
    pub pipe_buffer_size: usize,
    pub max_port: u16,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_proc: MAX_PROC,
            max_fileid: MAX_FILEID,
            max_files: MAX_FILES,
            max_threads: MAX_THREADS,
            pipe_buffer_size: PIPE_BUFFER_SIZE,
            max_port: MAX_PORT,
        }
    }
}

impl KernelConfig {
    /// Processos 0 (idle) e 1 (init) precisam caber.
    pub fn is_valid(&self) -> bool {
        self.max_proc >= 2
            && self.max_fileid >= 1
            && self.max_files >= 1
            && self.max_threads >= 1
            && self.pipe_buffer_size >= 1
    }
}
