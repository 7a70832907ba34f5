//! Debug tracing, enabled with `MYCOROUTINE_DEBUG=1`.

use std::sync::OnceLock;

pub fn debug_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var("MYCOROUTINE_DEBUG").is_ok_and(|v| v == "1"))
}

macro_rules! co_debug {
    ($($arg:tt)*) => {
        if $crate::debug::debug_enabled() {
            eprintln!("[co] {}", format!($($arg)*));
        }
    };
}

pub(crate) use co_debug;
