//! The GC transcript: the exact, gated log lines spec.md §6 requires.
//!
//! Kept separate from [`crate::collector::Collector`]'s control flow so the
//! sink can be swapped for an in-memory buffer in tests, without the
//! collector itself knowing or caring whether it is writing to stdout or
//! to a `Vec<u8>`.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// An in-memory sink that can be cloned and read back after the writer
/// moves into a [`crate::collector::Collector`]. Used only by tests.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the captured bytes as a `String`.
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("transcript is always UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes the gated GC log lines to a sink, only when logging is enabled.
pub struct Transcript {
    enabled: bool,
    sink: Box<dyn Write + Send>,
}

impl Transcript {
    /// A transcript writing to real process stdout.
    pub fn new(enabled: bool) -> Self {
        Self::with_sink(enabled, Box::new(io::stdout()))
    }

    /// A transcript writing to an arbitrary sink (tests use [`SharedBuffer`]).
    pub fn with_sink(enabled: bool, sink: Box<dyn Write + Send>) -> Self {
        Transcript { enabled, sink }
    }

    /// Emit one complete log line (a trailing newline is added), iff
    /// logging is enabled. A no-op otherwise — callers never need to
    /// branch on `enabled` themselves.
    pub fn line(&mut self, text: &str) {
        if self.enabled {
            let _ = writeln!(self.sink, "{text}");
        }
    }
}
