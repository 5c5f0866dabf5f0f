// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Text sink the engine reports through.
///
/// `print_async` is the variant workers may call from inside the pool; a
/// host whose output channel is not thread-safe can buffer there and drain
/// on `flush`. The default forwards to `print`.
pub trait IoSink: Send + Sync {
    fn print(&self, msg: &str);

    fn print_async(&self, msg: &str) {
        self.print(msg);
    }

    fn error(&self, msg: &str);

    fn flush(&self) {}
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl IoSink for NullSink {
    fn print(&self, _msg: &str) {}

    fn error(&self, _msg: &str) {}
}

/// Line-oriented sink over stdout/stderr.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    // Serializes whole lines so interleaved worker output stays readable.
    lock: Mutex<()>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IoSink for ConsoleSink {
    fn print(&self, msg: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(msg.as_bytes());
    }

    fn error(&self, msg: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(msg.as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stdout().lock().flush();
        let _ = std::io::stderr().lock().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::{IoSink, NullSink};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
        flushes: Mutex<usize>,
    }

    impl IoSink for RecordingSink {
        fn print(&self, msg: &str) {
            self.lines
                .lock()
                .expect("lines mutex should lock")
                .push(msg.to_string());
        }

        fn error(&self, msg: &str) {
            self.errors
                .lock()
                .expect("errors mutex should lock")
                .push(msg.to_string());
        }

        fn flush(&self) {
            *self.flushes.lock().expect("flush mutex should lock") += 1;
        }
    }

    #[test]
    fn print_async_defaults_to_print() {
        let sink = RecordingSink::default();
        sink.print_async("starting\n");
        sink.print("done\n");

        let lines = sink.lines.lock().expect("lines should lock").clone();
        assert_eq!(lines, vec!["starting\n".to_string(), "done\n".to_string()]);
    }

    #[test]
    fn error_and_flush_reach_the_sink() {
        let sink = RecordingSink::default();
        sink.error("bad input\n");
        sink.flush();
        sink.flush();

        assert_eq!(
            sink.errors.lock().expect("errors should lock").clone(),
            vec!["bad input\n".to_string()]
        );
        assert_eq!(*sink.flushes.lock().expect("flushes should lock"), 2);
    }

    #[test]
    fn null_sink_accepts_everything() {
        let sink = NullSink;
        sink.print("ignored");
        sink.print_async("ignored");
        sink.error("ignored");
        sink.flush();
    }
}
