//! Platform-specific frame-pointer primitives.
//!
//! The root enumerator relies on a precise stack-layout contract with the
//! compiler (spec.md §3): every frame's saved previous-frame-base word sits
//! at offset 0, reachable by chasing `rbp` links. That contract only holds
//! if frame pointers are never elided.
//!
//! [`current_frame_base`] must be read directly inside the function whose
//! frame is wanted — it is `#[inline(always)]` precisely so it never
//! introduces a frame of its own; a non-inlined helper call in between
//! would read that helper's frame instead of the caller's, throwing off
//! every hop counted from it. [`saved_frame_base`] is the opposite: a
//! plain, never-inlined memory read, safe to call any number of times to
//! walk further up the chain.
//!
//! Only `x86_64` is supported; the System V AMD64 ABI guarantees the
//! pushed-`rbp`/`mov rbp, rsp` prologue this module reads.

#[cfg(not(target_arch = "x86_64"))]
compile_error!("cflat-rt's root walk reads the x86-64 rbp frame-pointer chain directly");

/// Read the current `rbp` — the frame base of whoever this is inlined into.
///
/// Must be called directly inside the function whose own frame base is
/// wanted; calling it through an intermediate (non-inlined) function would
/// yield that intermediate's frame instead.
#[inline(always)]
pub fn current_frame_base() -> usize {
    let rbp: usize;
    // SAFETY: reads a general-purpose register into a local; no memory
    // access, no side effect on the stack or flags.
    unsafe {
        std::arch::asm!("mov {0}, rbp", out(reg) rbp, options(nomem, nostack, preserves_flags));
    }
    rbp
}

/// Read the saved previous-frame-base word at offset 0 of `frame_base`,
/// i.e. hop one link further up the call stack.
///
/// # Safety
/// `frame_base` must be a live frame base on the current call stack.
#[inline(never)]
pub unsafe fn saved_frame_base(frame_base: usize) -> usize {
    *(frame_base as *const usize)
}
