// =============================================================================
// KERNEL LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Sistema de logging do núcleo com custo ZERO quando desligado.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM core::fmt nos call sites - apenas literais + um valor hex opcional
// - Escreve APENAS na serial (stderr do host)
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Invariantes quebradas, falhas fatais
// - WARN:  Situações suspeitas mas recuperáveis
// - INFO:  Ciclo de vida (boot, spawn, exit)
// - DEBUG: Protocolos (join, accept, reap)
// - TRACE: Cada operação de pipe/wait
//
// FEATURES:
// - no_logs:   Remove 100% dos logs
// - log_error: ERROR, WARN
// - log_info:  + INFO (padrão)
// - log_debug: + DEBUG
// - log_trace: Todos os níveis
//
// COMO USAR:
//   kinfo!("(Proc) Spawn OK");              // Apenas string
//   kinfo!("(Proc) Spawn PID=", pid.0);     // String + hex
//
// =============================================================================

// =============================================================================
// PREFIXOS COM CORES ANSI
// =============================================================================

pub const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
pub const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
pub const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
pub const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
pub const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";
pub const P_OK: &str = "\x1b[32m[OK]\x1b[0m ";

// =============================================================================
// MACROS DE LOG - NÍVEL ERROR
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($msg:expr) => {{
        $crate::drivers::serial::emit_record($crate::core::logging::P_ERROR, $msg, None);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::drivers::serial::emit_record(
            $crate::core::logging::P_ERROR,
            $msg,
            Some($val as u64),
        );
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL WARN
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($msg:expr) => {{
        $crate::drivers::serial::emit_record($crate::core::logging::P_WARN, $msg, None);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::drivers::serial::emit_record(
            $crate::core::logging::P_WARN,
            $msg,
            Some($val as u64),
        );
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL INFO
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_info", feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! kinfo {
    ($msg:expr) => {{
        $crate::drivers::serial::emit_record($crate::core::logging::P_INFO, $msg, None);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::drivers::serial::emit_record(
            $crate::core::logging::P_INFO,
            $msg,
            Some($val as u64),
        );
    }};
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_info", feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL DEBUG
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! kdebug {
    ($msg:expr) => {{
        $crate::drivers::serial::emit_record($crate::core::logging::P_DEBUG, $msg, None);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::drivers::serial::emit_record(
            $crate::core::logging::P_DEBUG,
            $msg,
            Some($val as u64),
        );
    }};
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL TRACE
// =============================================================================

#[cfg(all(not(feature = "no_logs"), feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($msg:expr) => {{
        $crate::drivers::serial::emit_record($crate::core::logging::P_TRACE, $msg, None);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::drivers::serial::emit_record(
            $crate::core::logging::P_TRACE,
            $msg,
            Some($val as u64),
        );
    }};
}

#[cfg(not(all(not(feature = "no_logs"), feature = "log_trace")))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE STATUS (OK)
// =============================================================================

/// kok! - Log de sucesso (prefixo verde [OK]).
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kok {
    ($msg:expr) => {{
        $crate::drivers::serial::emit_record($crate::core::logging::P_OK, $msg, None);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kok {
    ($($t:tt)*) => {{}};
}
