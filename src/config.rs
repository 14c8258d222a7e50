//! Startup configuration, parsed independently of the process environment
//! so every malformed-input case is unit-testable without mutating
//! `std::env`.

use crate::error::GcError;

/// Parsed `CFLAT_HEAP_WORDS` / `CFLAT_GC_LOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Total heap size in machine words; half is usable per half-space.
    pub heap_words: usize,
    /// Whether the GC transcript (spec §6 log format) should be emitted.
    pub gc_log: bool,
}

impl Config {
    /// Parse from already-read environment strings. `CFLAT_GC_LOG` enables
    /// logging iff its value is exactly the literal string `"1"`; any other
    /// value, including `"true"`, disables it.
    pub fn parse(heap_words_var: Option<&str>, gc_log_var: Option<&str>) -> Result<Self, GcError> {
        let raw = heap_words_var
            .ok_or_else(|| GcError::Configuration("CFLAT_HEAP_WORDS is required".to_string()))?;
        let heap_words: i64 = raw.trim().parse().map_err(|_| {
            GcError::Configuration(format!(
                "CFLAT_HEAP_WORDS must be an integer, got {raw:?}"
            ))
        })?;
        if heap_words <= 0 {
            return Err(GcError::Configuration(format!(
                "CFLAT_HEAP_WORDS must be a positive integer, got {heap_words}"
            )));
        }
        if heap_words % 2 != 0 {
            return Err(GcError::Configuration(format!(
                "CFLAT_HEAP_WORDS must be even, got {heap_words}"
            )));
        }

        Ok(Config {
            heap_words: heap_words as usize,
            gc_log: gc_log_var == Some("1"),
        })
    }

    /// Parse from the actual process environment.
    pub fn from_env() -> Result<Self, GcError> {
        let heap_words = std::env::var("CFLAT_HEAP_WORDS").ok();
        let gc_log = std::env::var("CFLAT_GC_LOG").ok();
        Self::parse(heap_words.as_deref(), gc_log.as_deref())
    }
}
