//! FILENAME: core/crosstab-engine/src/logging.rs
// PURPOSE: Category-tagged logging for the counting engine.

use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// UNIFIED LOG LINES
// ============================================================================

/// Log target all engine lines are emitted under.
pub const LOG_TARGET: &str = "crosstab";

/// Global sequence counter so interleaved worker/owner lines can be ordered.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Write a log line in unified format: `seq|level|category|message`.
pub fn write_log(level: log::Level, category: &str, message: &str) {
    if !log::log_enabled!(target: LOG_TARGET, level) {
        return;
    }
    let seq = next_seq();
    log::log!(target: LOG_TARGET, level, "{}|{}|{}|{}", seq, level_tag(level), category, message);
}

/// Write an ENTER log line for function entry
pub fn write_log_enter(category: &str, func_name: &str, params: &str) {
    let message = if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    };
    write_log(log::Level::Debug, category, &message);
}

/// Write an EXIT log line for function exit
pub fn write_log_exit(category: &str, func_name: &str, result: &str) {
    let message = if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    };
    write_log(log::Level::Debug, category, &message);
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "E",
        log::Level::Warn => "W",
        log::Level::Info => "I",
        log::Level::Debug => "D",
        log::Level::Trace => "T",
    }
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Debug, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Info, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Warn, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Error, $cat, &format!($($arg)*))
    };
}

/// Timing lines; always emitted at debug level with a `PERF` prefix.
#[macro_export]
macro_rules! log_perf {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(
            ::log::Level::Debug,
            $cat,
            &format!("PERF {}", format!($($arg)*)),
        )
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_enter($cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_enter($cat, $func, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_exit($cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_exit($cat, $func, &format!($($arg)*))
    };
}

// Re-export the macros so they can be imported via `use crate::logging::log_info;`
pub use log_debug;
pub use log_enter;
pub use log_error;
pub use log_exit;
pub use log_info;
pub use log_perf;
pub use log_warn;
