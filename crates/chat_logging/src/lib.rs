#![deny(missing_docs)]
//! Shared logging utilities for the chatvoice workspace.
//!
//! This crate provides the `chat_*` logging macros used across the codebase,
//! a per-thread site context that tags log lines with the active chat
//! platform, and a minimal test initializer for the global logger.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the chat platform currently being processed.
    static SITE_CONTEXT: Cell<Option<&'static str>> = const { Cell::new(None) };
}

/// Sets the chat platform id for the current thread.
/// Monitors call this while handling a mutation batch and clear it afterwards.
pub fn set_site_context(site_id: Option<&'static str>) {
    SITE_CONTEXT.with(|v| v.set(site_id));
}

/// Retrieves the chat platform id for the current thread.
/// Returns `None` when no monitor is active on this thread.
pub fn site_context() -> Option<&'static str> {
    SITE_CONTEXT.with(|v| v.get())
}

/// Label used as the log line prefix; `-` when no site context is set.
#[doc(hidden)]
pub fn site_label() -> &'static str {
    site_context().unwrap_or("-")
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! chat_trace {
    ($($arg:tt)*) => {{
        log::trace!("[{}] {}", $crate::site_label(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! chat_debug {
    ($($arg:tt)*) => {{
        log::debug!("[{}] {}", $crate::site_label(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! chat_info {
    ($($arg:tt)*) => {{
        log::info!("[{}] {}", $crate::site_label(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! chat_warn {
    ($($arg:tt)*) => {{
        log::warn!("[{}] {}", $crate::site_label(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! chat_error {
    ($($arg:tt)*) => {{
        log::error!("[{}] {}", $crate::site_label(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{set_site_context, site_context, site_label};

    #[test]
    fn site_context_is_per_thread() {
        set_site_context(Some("twitch"));
        assert_eq!(site_context(), Some("twitch"));
        let other = std::thread::spawn(site_context).join().unwrap();
        assert_eq!(other, None);
        set_site_context(None);
        assert_eq!(site_label(), "-");
    }
}
