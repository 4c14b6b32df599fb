//! Console logging
//!
//! On wasm the Workers console macros are used. Native builds (unit tests)
//! cannot call into the JS console, so they fall back to stderr.
//!
//! Messages below the level set from `LOG_LEVEL` are dropped.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
}

impl Level {
    /// `error`, `warn`/`warning` or `info`/`debug`, any case
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" | "debug" => Some(Self::Info),
            _ => None,
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn enabled(level: Level) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! log_info {
    ($($t:tt)*) => {{
        if $crate::logging::enabled($crate::logging::Level::Info) {
            #[cfg(target_arch = "wasm32")]
            ::worker::console_log!($($t)*);
            #[cfg(not(target_arch = "wasm32"))]
            eprintln!("[INFO] {}", format_args!($($t)*));
        }
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($t:tt)*) => {{
        if $crate::logging::enabled($crate::logging::Level::Warn) {
            #[cfg(target_arch = "wasm32")]
            ::worker::console_warn!($($t)*);
            #[cfg(not(target_arch = "wasm32"))]
            eprintln!("[WARN] {}", format_args!($($t)*));
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($t:tt)*) => {{
        if $crate::logging::enabled($crate::logging::Level::Error) {
            #[cfg(target_arch = "wasm32")]
            ::worker::console_error!($($t)*);
            #[cfg(not(target_arch = "wasm32"))]
            eprintln!("[ERROR] {}", format_args!($($t)*));
        }
    }};
}
