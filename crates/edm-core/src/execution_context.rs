// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::EdmError;
use crate::control::CancelToken;
use crate::observability::IoSink;

/// Execution context threaded through one prediction invocation.
///
/// Bundles the optional hooks a host may attach: a cancellation token and a
/// text sink. Everything else about a run rides in the options record.
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub io: Option<&'a dyn IoSink>,
}

impl<'a> ExecutionContext<'a> {
    /// Context with no hooks attached.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_io(mut self, io: &'a dyn IoSink) -> Self {
        self.io = Some(io);
        self
    }

    /// Returns true when cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), EdmError> {
        if self.is_cancelled() {
            return Err(EdmError::cancelled());
        }
        Ok(())
    }

    /// Emits a line through the sink's synchronous channel, if attached.
    pub fn print(&self, msg: &str) {
        if let Some(io) = self.io {
            io.print(msg);
        }
    }

    /// Emits a line through the sink's pool-safe channel, if attached.
    pub fn print_async(&self, msg: &str) {
        if let Some(io) = self.io {
            io.print_async(msg);
        }
    }

    /// Emits an error line through the sink, if attached.
    pub fn error(&self, msg: &str) {
        if let Some(io) = self.io {
            io.error(msg);
        }
    }
}
