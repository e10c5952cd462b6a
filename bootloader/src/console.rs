//! Boot console
//!
//! A single global `fmt::Write` sink behind a spin lock. The platform
//! installs its serial (or semihosting) writer once during early init;
//! until then output is dropped, never buffered.

use core::fmt::{self, Write};

use spin::Mutex;

static SINK: Mutex<Option<&'static mut (dyn Write + Send)>> = Mutex::new(None);

/// Install the console sink. Replaces any previous sink.
pub fn set_sink(sink: &'static mut (dyn Write + Send)) {
    *SINK.lock() = Some(sink);
}

/// Remove the console sink; subsequent output is dropped.
pub fn clear_sink() {
    *SINK.lock() = None;
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    if let Some(sink) = SINK.lock().as_mut() {
        // A sink write error has nowhere to go
        let _ = sink.write_fmt(args);
    }
}

/// Print to the boot console
#[macro_export]
macro_rules! bprint {
    ($($arg:tt)*) => {
        $crate::console::_print(core::format_args!($($arg)*))
    };
}

/// Print to the boot console, with a trailing newline
#[macro_export]
macro_rules! bprintln {
    () => {
        $crate::bprint!("\r\n")
    };
    ($($arg:tt)*) => {{
        $crate::console::_print(core::format_args!($($arg)*));
        $crate::bprint!("\r\n");
    }};
}
