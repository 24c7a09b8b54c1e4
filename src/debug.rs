//! Debug logging system for wasmvet

use std::sync::atomic::{AtomicBool, Ordering};

/// Global debug flag, set via CLI or the WASMVET_DEBUG environment variable
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable debug logging
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::Relaxed);
}

/// Enable debug logging when WASMVET_DEBUG is set to a truthy value
pub fn enable_debug_from_env() {
    if matches!(
        std::env::var("WASMVET_DEBUG").as_deref(),
        Ok("1") | Ok("true") | Ok("on")
    ) {
        enable_debug();
    }
}

/// Check if debug logging is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Debug print macro - only prints if debug is enabled
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("\x1b[36mDEBUG\x1b[0m [{}:{}] {}",
                file!().split('/').last().unwrap_or("unknown"),
                line!(),
                format_args!($($arg)*));
        }
    };
}

/// Trace-level debug - for very detailed debugging
#[macro_export]
macro_rules! trace_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("\x1b[90mTRACE\x1b[0m [{}:{}] {}",
                file!().split('/').last().unwrap_or("unknown"),
                line!(),
                format_args!($($arg)*));
        }
    };
}
