//! Runtime support library for the cflat compiler.
//!
//! Compiled cflat programs allocate every heap object through a single
//! entry point, [`ffi::_cflat_alloc`], and lay out stack frames so the
//! runtime can discover root pointers by chasing a chain of saved frame
//! bases. This crate is the other half of that contract: it implements a
//! **semispace copying garbage collector** using Cheney's breadth-first
//! traversal.
//!
//! # Layout
//! - [`header`] — the tagged-union header format every heap object starts
//!   with, and its decode/encode.
//! - [`collector`] — the heap itself: bump allocation, root forwarding, and
//!   the Cheney scan loop that make up the collector.
//! - [`platform`] — the `x86_64` frame-pointer primitives the root
//!   enumerator needs to walk the real call stack.
//! - [`config`] — parsing `CFLAT_HEAP_WORDS` / `CFLAT_GC_LOG`.
//! - [`error`] — the one fatal-error type every failure in this crate
//!   routes through.
//! - [`transcript`] — the exact, gated log-line format spec'd for the GC
//!   transcript.
//! - [`ffi`] — the `extern "C"` entry points compiled programs link
//!   against: `_cflat_init_gc`, `_cflat_alloc`, `_cflat_zero_words`,
//!   `_cflat_panic`, `print_num`, `print_char`.
//!
//! # Usage
//! A compiled cflat program calls `_cflat_init_gc()` once at the top of
//! `main`, then allocates through `_cflat_alloc`, writing a header word at
//! `ret[-1]` immediately after each call returns. Set `CFLAT_HEAP_WORDS` to
//! a positive even integer before running it, and `CFLAT_GC_LOG=1` to see
//! the collector's transcript on stdout.
//!
//! This crate targets `x86_64` only: the root walk relies on the System V
//! AMD64 `rbp` frame-pointer chain, so any build of this crate (and of the
//! compiled programs linked against it) must keep frame pointers enabled.

pub mod collector;
pub mod config;
pub mod error;
pub mod ffi;
pub mod header;
pub mod platform;
pub mod transcript;

pub use collector::Collector;
pub use config::Config;
pub use error::{panic_exit, GcError};
pub use header::Header;
