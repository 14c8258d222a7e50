//! The semispace copying collector: heap layout, the bump allocator, root
//! forwarding, and the Cheney scan loop.
//!
//! This module owns all process-global mutable state as a single value
//! (spec.md §9, "stop-the-world global state"), so the `extern "C"`
//! trampolines in [`crate::ffi`] are thin wrappers around it rather than
//! scattering raw statics across the crate.

use std::io::Write;

use crate::config::Config;
use crate::error::GcError;
use crate::header::Header;
use crate::transcript::Transcript;

/// Owns the heap backing store, the two half-space bases, the bump cursor,
/// and the GC transcript. Constructed once at startup and threaded through
/// every allocation and collection.
pub struct Collector {
    /// Backing store for both half-spaces; never reallocated after
    /// construction, so pointers derived from it stay valid for the
    /// lifetime of the collector. Never read directly — only kept alive so
    /// `from_base`/`to_base`/`bump` stay valid.
    #[allow(dead_code)]
    backing: Vec<i64>,
    from_base: *mut i64,
    to_base: *mut i64,
    bump: *mut i64,
    half_words: usize,
    /// Frame base that terminates the root walk (spec.md §3: "the `main`
    /// function's parent frame").
    terminator: usize,
    transcript: Transcript,
}

// SAFETY: a Collector is only ever touched from behind a Mutex, and the
// runtime contract (spec.md §5) guarantees a single OS thread drives it at
// a time; the raw pointers above never alias memory outside `backing`.
unsafe impl Send for Collector {}

impl Collector {
    /// Build a collector writing its transcript to real stdout.
    pub fn new(config: Config, terminator: usize) -> Self {
        Self::with_sink(config, terminator, Box::new(std::io::stdout()))
    }

    /// Build a collector writing its transcript to an arbitrary sink
    /// (tests use [`crate::transcript::SharedBuffer`]).
    pub fn with_sink(config: Config, terminator: usize, sink: Box<dyn Write + Send>) -> Self {
        let half_words = config.heap_words / 2;
        let mut backing = vec![0i64; config.heap_words];
        let from_base = backing.as_mut_ptr();
        // SAFETY: half_words <= backing.len(), so this stays within the allocation.
        let to_base = unsafe { from_base.add(half_words) };

        let mut transcript = Transcript::with_sink(config.gc_log, sink);
        transcript.line(&format!(
            "_cflat_init_gc: allocated heap of {} words",
            config.heap_words
        ));

        Collector {
            backing,
            from_base,
            to_base,
            bump: from_base,
            half_words,
            terminator,
            transcript,
        }
    }

    /// Live words and half-space capacity in the active from-space,
    /// exposed for the test suite to check invariants without parsing the
    /// transcript.
    pub fn heap_stats(&self) -> (usize, usize) {
        // SAFETY: bump is always within [from_base, from_base + half_words].
        let live = unsafe { self.bump.offset_from(self.from_base) } as usize;
        (live, self.half_words)
    }

    /// Retained so tests can assert on backing-buffer identity across a
    /// no-op collection (spec.md §8, round-trip property).
    pub fn from_space_words(&self) -> &[i64] {
        // SAFETY: [from_base, from_base + half_words) is always in-bounds.
        unsafe { std::slice::from_raw_parts(self.from_base, self.half_words) }
    }

    /// Allocate `n` payload words, triggering a collection rooted at
    /// `caller_frame` if the active half-space is exhausted (spec.md §4.2).
    pub fn alloc_from(&mut self, caller_frame: usize, n: i64) -> Result<*mut i64, GcError> {
        debug_assert!(n >= 1, "alloc requires at least one payload word");

        if let Some(payload) = self.try_bump(n) {
            self.transcript
                .line(&format!("_cflat_alloc: attempting to allocate {n} words...successful"));
            return Ok(payload);
        }
        self.transcript.line(&format!(
            "_cflat_alloc: attempting to allocate {n} words...triggering collection"
        ));

        self.collect(caller_frame);

        if let Some(payload) = self.try_bump(n) {
            self.transcript
                .line(&format!("_cflat_alloc: second attempt to allocate {n} words...successful"));
            return Ok(payload);
        }
        self.transcript
            .line(&format!("_cflat_alloc: second attempt to allocate {n} words..."));
        Err(GcError::OutOfMemory)
    }

    /// Try the bump-pointer fast path; `None` means the half-space is full.
    fn try_bump(&mut self, n: i64) -> Option<*mut i64> {
        let reserved = n + 1;
        // SAFETY: from_base + half_words is the one-past-the-end address of
        // the active half-space, always within the backing allocation.
        let end = unsafe { self.from_base.add(self.half_words) };
        // SAFETY: both pointers are derived from the same backing allocation.
        let remaining = unsafe { end.offset_from(self.bump) };
        if remaining < reserved {
            return None;
        }

        let header_addr = self.bump;
        // SAFETY: header_addr + reserved <= end, checked above.
        let payload = unsafe { header_addr.add(1) };
        self.bump = unsafe { header_addr.add(reserved as usize) };
        // SAFETY: payload..payload+n is within the reservation just made.
        unsafe { std::ptr::write_bytes(payload, 0, n as usize) };
        Some(payload)
    }

    /// Run one full collection rooted at `top_frame`: forward every root
    /// reachable by walking the stack from `top_frame` up to (not
    /// including) the terminator frame, scan every copied object
    /// transitively, then swap spaces.
    pub fn collect(&mut self, top_frame: usize) {
        let mut free = self.to_base;

        self.walk_roots(top_frame, &mut free);

        self.transcript.line("gc: starting scan");
        self.scan(&mut free);

        // SAFETY: free and to_base are both within to-space.
        let live = unsafe { free.offset_from(self.to_base) };
        self.transcript.line(&format!(
            "gc: swapping from and to spaces ({live} words still live)"
        ));

        std::mem::swap(&mut self.from_base, &mut self.to_base);
        // SAFETY: live <= half_words, since to-space fits all live data by
        // construction (spec.md §4.4, Termination and correctness).
        self.bump = unsafe { self.from_base.add(live as usize) };
    }

    /// Walk frames from `top_frame` up to (not including) the terminator,
    /// forwarding every root slot in each one (spec.md §4.3).
    fn walk_roots(&mut self, top_frame: usize, free: &mut *mut i64) {
        let mut frame = top_frame as *mut i64;
        let mut index = 0i64;

        while (frame as usize) < self.terminator {
            // SAFETY: frame is a live frame base; the root count sits at offset -1.
            let root_count = unsafe { *frame.sub(1) };
            self.transcript.line(&format!(
                "gc: processing stack frame {index} (from top of stack), with {root_count} pointers"
            ));

            for i in 0..root_count {
                self.transcript
                    .line(&format!("-- processing pointer offset {i}"));
                // SAFETY: root slots sit at offsets -2, -3, ... as guaranteed
                // by the compiler's frame layout contract.
                let slot = unsafe { frame.sub(2 + i as usize) };
                self.forward(slot, free);
            }

            // SAFETY: offset 0 of a frame holds the saved previous frame base.
            frame = unsafe { *frame as *mut i64 };
            index += 1;
        }
    }

    /// Forward the pointer stored at `slot` in place: copy its referent
    /// into to-space (or follow an existing forwarding address) and
    /// rewrite `slot` to point at the copy (spec.md §4.4 `forward`).
    fn forward(&mut self, slot: *mut i64, free: &mut *mut i64) {
        // SAFETY: slot is a root or a pointer field inside an object already
        // known to be live; both cases are guaranteed valid by the caller.
        let p = unsafe { *slot };
        if p == 0 {
            return;
        }

        let payload = p as *mut i64;
        if !self.in_from_space(payload) {
            return; // not a managed pointer (already in to-space, or foreign)
        }

        // SAFETY: payload is a from-space object's payload start, so
        // payload - 1 is its header slot.
        let header_addr = unsafe { payload.sub(1) };
        let h = unsafe { *header_addr };

        if self.in_to_space(h as *mut i64) {
            // Already forwarded: h is itself the new payload address.
            let from_rel = self.rel_from(payload);
            self.transcript.line(&format!(
                "---- copying object at relative address {from_rel} with header [Forwarded]"
            ));
            let to_rel = self.rel_to(h as *mut i64);
            self.transcript
                .line(&format!("---- object forwarded to relative address {to_rel}"));
            unsafe { *slot = h };
            return;
        }

        let header = Header::decode(h);
        let words = header.payload_words();
        let from_rel = self.rel_from(payload);
        self.transcript.line(&format!(
            "---- copying object at relative address {from_rel} with header {}",
            header.fmt_decoded()
        ));

        let dest_header = *free;
        // SAFETY: dest_header + 1 stays within to-space; to-space is large
        // enough to hold all live data (spec.md §4.4 Termination).
        let dest_payload = unsafe { dest_header.add(1) };
        let to_rel = self.rel_to(dest_payload);
        self.transcript
            .line(&format!("---- moving object from relative address {from_rel} to {to_rel}"));

        // SAFETY: copies 1 + words words from a live from-space object into
        // freshly-reserved to-space; the two ranges don't overlap.
        unsafe { std::ptr::copy_nonoverlapping(header_addr, dest_header, 1 + words as usize) };
        unsafe { *header_addr = dest_payload as i64 };
        unsafe { *slot = dest_payload as i64 };

        *free = unsafe { dest_header.add(1 + words as usize) };
    }

    /// Advance the scan cursor from `to_base` until it meets `free`,
    /// forwarding every pointer field of every object it passes over
    /// (spec.md §4.4 `scan`).
    fn scan(&mut self, free: &mut *mut i64) {
        let mut scan = self.to_base;
        while scan != *free {
            // SAFETY: scan is within [to_base, free), which holds only
            // freshly-copied, fully-initialized objects.
            let h = unsafe { *scan };
            let header = Header::decode(h);
            self.transcript
                .line(&format!("-- scanning header {}", header.fmt_decoded()));

            for offset in header.ptr_offsets() {
                // SAFETY: offset is one of this header's own declared
                // pointer fields, within its payload.
                let field = unsafe { scan.add(1 + offset as usize) };
                self.forward(field, free);
            }

            let words = header.payload_words();
            self.transcript
                .line(&format!("-- incrementing scanning ptr by {}", 1 + words));
            scan = unsafe { scan.add(1 + words as usize) };
        }
    }

    fn in_from_space(&self, ptr: *mut i64) -> bool {
        // SAFETY: comparison only, no dereference.
        let end = unsafe { self.from_base.add(self.half_words) };
        ptr >= self.from_base && ptr < end
    }

    fn in_to_space(&self, ptr: *mut i64) -> bool {
        // SAFETY: comparison only, no dereference.
        let end = unsafe { self.to_base.add(self.half_words) };
        ptr >= self.to_base && ptr < end
    }

    /// Word offset of `ptr` from the current from-space base.
    fn rel_from(&self, ptr: *mut i64) -> isize {
        // SAFETY: ptr is known to be within from-space by the caller.
        unsafe { ptr.offset_from(self.from_base) }
    }

    /// Word offset of `ptr` from the current to-space base.
    fn rel_to(&self, ptr: *mut i64) -> isize {
        // SAFETY: ptr is known to be within to-space by the caller.
        unsafe { ptr.offset_from(self.to_base) }
    }
}
