//! Developer trace events with a thread-local capture buffer.
//! Lets unit and property tests assert on emitted events without racing the global logger.

use std::cell::RefCell;

/// Log target used by `dev_trace!`; routed to `dev.log` when enabled in the logger config.
pub const DEV_TARGET: &str = "devcamper::dev";

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Stops capturing on the current thread when dropped.
pub struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURE.with(|c| *c.borrow_mut() = None);
    }
}

/// Start capturing trace events emitted on the current thread.
#[must_use]
pub fn capture() -> CaptureGuard {
    CAPTURE.with(|c| *c.borrow_mut() = Some(Vec::new()));
    CaptureGuard
}

pub fn record(line: &str) {
    CAPTURE.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line.to_owned());
        }
    });
}

/// Take the captured lines, leaving the buffer empty. Empty when capture is off.
pub fn drain() -> Vec<String> {
    CAPTURE.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Copy of the captured lines without clearing them.
pub fn snapshot() -> Vec<String> {
    CAPTURE.with(|c| c.borrow().as_ref().cloned().unwrap_or_default())
}

/// Emit a developer trace event: captured locally when enabled, and logged at TRACE.
#[macro_export]
macro_rules! dev_trace {
    ($($arg:tt)*) => {{
        let __line = format!($($arg)*);
        $crate::utils::devlog::record(&__line);
        log::log!(target: $crate::utils::devlog::DEV_TARGET, log::Level::Trace, "{}", __line);
    }};
}
