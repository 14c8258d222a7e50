//! Synthetic call stacks for driving the collector without a real compiled
//! cflat program. Mirrors the compiler's frame layout (spec.md §3): a saved
//! previous-frame-base word at offset 0, a root count at offset -1, and
//! root slots at offsets -2, -3, ....

#![allow(dead_code)]

pub struct FakeStack {
    // Boxed so the backing storage never moves once addresses are taken.
    words: Box<[i64]>,
    frame_bases: Vec<usize>,
    terminator: usize,
}

impl FakeStack {
    /// Build a stack with one frame per entry of `frame_roots`, innermost
    /// (the frame that would call `_cflat_alloc`) first.
    pub fn build(frame_roots: &[Vec<i64>]) -> Self {
        let mut words: Vec<i64> = Vec::new();
        let mut base_indices = Vec::new();

        for roots in frame_roots {
            let r = roots.len();
            for i in (0..r).rev() {
                words.push(roots[i]);
            }
            words.push(r as i64); // root count at offset -1
            base_indices.push(words.len()); // offset 0: saved link, filled below
            words.push(0);
        }
        let terminator_index = words.len();
        words.push(0); // never read; just needs a valid address

        let mut words = words.into_boxed_slice();
        let base_ptr = words.as_mut_ptr();
        let word_addr = |idx: usize| -> usize {
            // SAFETY: idx is always within the boxed slice built above.
            unsafe { base_ptr.add(idx) as usize }
        };

        let frame_bases: Vec<usize> = base_indices.iter().map(|&i| word_addr(i)).collect();
        let terminator = word_addr(terminator_index);

        for (i, &base_idx) in base_indices.iter().enumerate() {
            let next = frame_bases.get(i + 1).copied().unwrap_or(terminator);
            words[base_idx] = next as i64;
        }

        FakeStack {
            words,
            frame_bases,
            terminator,
        }
    }

    /// Frame base of the innermost (top-of-stack) frame — what a real
    /// `_cflat_alloc` caller's frame base would be.
    pub fn top_frame(&self) -> usize {
        self.frame_bases[0]
    }

    pub fn terminator(&self) -> usize {
        self.terminator
    }

    fn root_slot_addr(&self, frame_idx: usize, root_idx: usize) -> *mut i64 {
        let base = self.frame_bases[frame_idx] as *mut i64;
        // SAFETY: root_idx is caller-guaranteed to be within that frame's root count.
        unsafe { base.sub(2 + root_idx) }
    }

    pub fn read_root(&self, frame_idx: usize, root_idx: usize) -> i64 {
        // SAFETY: slot address is within the boxed backing storage.
        unsafe { *self.root_slot_addr(frame_idx, root_idx) }
    }

    pub fn write_root(&mut self, frame_idx: usize, root_idx: usize, value: i64) {
        let addr = self.root_slot_addr(frame_idx, root_idx);
        // SAFETY: slot address is within the boxed backing storage.
        unsafe { *addr = value };
    }
}
