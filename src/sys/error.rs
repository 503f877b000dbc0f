//! Códigos de Erro do núcleo
//!
//! Sistema de erros unificado para todas as operações expostas.
//! Todo erro aqui é recuperável e devolvido como valor; falhas de
//! bookkeeping interno vão para `core::panic::fatal`.

/// Enum de erros do sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SysError {
    // === Erros Gerais (1-15) ===
    /// Objeto não encontrado (pid fora da tabela, tid fora do registro)
    NotFound = 2,
    /// Argumento inválido
    InvalidArgument = 4,
    /// Timeout expirado
    TimedOut = 7,
    /// Operação inválida no estado atual (join em si mesma, etc.)
    InvalidOperation = 9,

    // === Erros de Handle (16-31) ===
    /// Fid inválido ou fechado
    BadHandle = 16,
    /// Objeto não suporta a operação (read em writer, etc.)
    HandleTypeMismatch = 17,
    /// Tabela de handles (ou de FCBs) cheia
    HandleTableFull = 19,

    // === Erros de IO (48-63) ===
    /// Pipe quebrado (alguma ponta fechada)
    BrokenPipe = 50,

    // === Erros de Socket (64-79) ===
    /// Socket no estado errado para a chamada
    ProtocolViolation = 64,
    /// Porta já tem um Listener
    PortInUse = 65,
    /// Socket sem peer estabelecido
    NotConnected = 66,
    /// Listener sumiu antes de aceitar
    ConnectionRefused = 67,

    // === Erros de Processo (80-95) ===
    /// Nenhum filho (ou pid não é filho do chamador)
    NoSuchChild = 80,
    /// Limite de processos atingido
    TooManyProcesses = 81,
    /// Limite de threads atingido
    TooManyThreads = 82,
}

/// Classe do erro (taxonomia exposta).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Sem slot livre (processo, thread, handle)
    ResourceExhausted,
    /// Id ruim, handle fora do registro, estado errado
    InvalidOperation,
    /// Uso errado do protocolo de sockets
    ProtocolViolation,
    /// Falha de transporte (pipe quebrado, timeout)
    Io,
}

impl SysError {
    /// Código numérico estável do erro.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Classe à qual o erro pertence.
    pub fn class(self) -> ErrorClass {
        match self {
            Self::TooManyProcesses | Self::TooManyThreads | Self::HandleTableFull => {
                ErrorClass::ResourceExhausted
            }
            Self::NotFound
            | Self::InvalidArgument
            | Self::InvalidOperation
            | Self::BadHandle
            | Self::HandleTypeMismatch
            | Self::NoSuchChild => ErrorClass::InvalidOperation,
            Self::ProtocolViolation
            | Self::PortInUse
            | Self::NotConnected
            | Self::ConnectionRefused => ErrorClass::ProtocolViolation,
            Self::BrokenPipe | Self::TimedOut => ErrorClass::Io,
        }
    }

    /// Verdadeiro para falta de slots.
    #[inline]
    pub fn is_exhausted(self) -> bool {
        self.class() == ErrorClass::ResourceExhausted
    }
}

impl std::fmt::Display for SysError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotFound => "not found",
            Self::InvalidArgument => "invalid argument",
            Self::TimedOut => "timed out",
            Self::InvalidOperation => "invalid operation",
            Self::BadHandle => "bad file id",
            Self::HandleTypeMismatch => "operation not supported by this stream",
            Self::HandleTableFull => "handle table full",
            Self::BrokenPipe => "broken pipe",
            Self::ProtocolViolation => "protocol violation",
            Self::PortInUse => "port already has a listener",
            Self::NotConnected => "socket not connected",
            Self::ConnectionRefused => "connection refused",
            Self::NoSuchChild => "no such child",
            Self::TooManyProcesses => "process table full",
            Self::TooManyThreads => "thread table full",
        };
        write!(f, "{} (code {})", text, self.code())
    }
}

impl std::error::Error for SysError {}

/// Resultado de syscall: Ok(valor) ou Err(SysError)
pub type SysResult<T> = Result<T, SysError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        assert!(SysError::TooManyProcesses.is_exhausted());
        assert!(SysError::HandleTableFull.is_exhausted());
        assert_eq!(SysError::PortInUse.class(), ErrorClass::ProtocolViolation);
        assert_eq!(SysError::NoSuchChild.class(), ErrorClass::InvalidOperation);
        assert_eq!(SysError::BrokenPipe.class(), ErrorClass::Io);
    }
}
