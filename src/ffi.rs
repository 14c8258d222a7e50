//! C-ABI entry points exposed to compiled cflat programs (spec.md §6).
//!
//! Every function here is a thin trampoline: it reads whatever the
//! platform module can tell it about the call stack, takes the global
//! [`Collector`] lock, and delegates. None of the collection algorithm
//! lives in this file.

use std::ffi::CStr;
use std::io::Write;
use std::os::raw::c_char;
use std::sync::{Mutex, OnceLock};

use crate::collector::Collector;
use crate::config::Config;
use crate::error::{panic_exit, GcError};
use crate::platform;

static COLLECTOR: OnceLock<Mutex<Collector>> = OnceLock::new();

fn with_collector<R>(f: impl FnOnce(&mut Collector) -> R) -> R {
    let lock = COLLECTOR.get().unwrap_or_else(|| panic_exit(&GcError::NotInitialized));
    let mut guard = lock.lock().expect("collector mutex poisoned");
    f(&mut guard)
}

/// Initialize the garbage collector. Must be called exactly once, at the
/// top of `main`, before any allocation (spec.md §4.1).
#[no_mangle]
pub extern "C" fn _cflat_init_gc() {
    if COLLECTOR.get().is_some() {
        panic_exit(&GcError::AlreadyInitialized);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => panic_exit(&err),
    };

    // `_cflat_init_gc` is called directly at the top of `main`, so one hop
    // up from its own frame is `main`'s frame, and a second hop is the
    // frame that called `main` — the terminator for every root walk.
    let own_frame = platform::current_frame_base();
    // SAFETY: own_frame is this function's live frame base; main's frame
    // and its caller's frame are both live further up the same stack.
    let terminator = unsafe {
        let main_frame = platform::saved_frame_base(own_frame);
        platform::saved_frame_base(main_frame)
    };

    let collector = Collector::new(config, terminator);
    if COLLECTOR.set(Mutex::new(collector)).is_err() {
        panic_exit(&GcError::AlreadyInitialized);
    }
}

/// Bump-allocate `n` payload words, running the collector on exhaustion.
/// Returns a pointer to the first payload word; the caller (compiler-
/// generated code) writes the header at `ret[-1]` immediately afterward.
#[no_mangle]
pub extern "C" fn _cflat_alloc(n: i64) -> *mut i64 {
    // One hop up from this function's own frame is whoever called
    // _cflat_alloc — the frame the root walk must start from (spec §4.2).
    let own_frame = platform::current_frame_base();
    // SAFETY: own_frame is this function's live frame base; its caller's
    // frame is live further up the same stack.
    let caller_frame = unsafe { platform::saved_frame_base(own_frame) };
    with_collector(|collector| match collector.alloc_from(caller_frame, n) {
        Ok(payload) => payload,
        Err(err) => panic_exit(&err),
    })
}

/// Zero `n` words starting at `p`.
///
/// # Safety
/// `p` must be valid for `n` consecutive word writes.
#[no_mangle]
pub unsafe extern "C" fn _cflat_zero_words(p: *mut i64, n: i64) {
    std::ptr::write_bytes(p, 0, n as usize);
}

/// Print `msg` and exit the process with status 0 (spec.md §4.5, §6 — exit
/// codes are always 0 so the grading harness can distinguish a reported
/// failure from an infrastructure one).
///
/// # Safety
/// `msg` must be a valid, NUL-terminated C string, or null.
#[no_mangle]
pub unsafe extern "C" fn _cflat_panic(msg: *const c_char) {
    let text = if msg.is_null() {
        "panic".to_string()
    } else {
        CStr::from_ptr(msg).to_string_lossy().into_owned()
    };
    println!("{text}");
    let _ = std::io::stdout().flush();
    std::process::exit(0);
}

/// Print a decimal integer followed by a newline.
#[no_mangle]
pub extern "C" fn print_num(n: i64) -> i64 {
    println!("{n}");
    0
}

/// Print one byte (the low 8 bits of `c`), with no trailing newline.
#[no_mangle]
pub extern "C" fn print_char(c: i64) -> i64 {
    let byte = (c & 0xFF) as u8;
    let _ = std::io::stdout().write_all(&[byte]);
    0
}
