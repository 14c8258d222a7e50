//! Decoding and encoding of heap object headers.
//!
//! Every heap object is a single header word followed by its payload. The
//! header's low 3 bits are a tag; the remaining 61 bits are interpreted
//! according to that tag (see spec table in the crate root docs). All of
//! the bit arithmetic lives here so the collector's copy/scan loop never
//! has to reason about it directly.

/// How a [`Header::StructWithPtrs`] value's pointer-field list is encoded
/// back into a header word. The two encodings both describe "a struct with
/// some leading or bitmap-selected pointer fields", but they pack the field
/// list differently, so re-encoding needs to know which one produced the
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrEncoding {
    /// Tag 0 with a nonzero 5-bit bitmap: bit `i` set means offset `i + 1`
    /// is a pointer field.
    Bitmap,
    /// Tag 4: the leading `k + 1` fields (offsets `0..=k`) are pointers.
    Leading,
}

/// A decoded heap object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// Tag 2: array of non-pointer elements, `len` elements == `len` payload words.
    AtomicArray(i64),
    /// Tag 6: array of pointer elements, `len` elements == `len` payload words.
    PointerArray(i64),
    /// Tag 0 with a zero bitmap: a struct with no pointer fields at all.
    AtomicStruct(i64),
    /// Tag 0 (bitmap) or tag 4 (leading count): a struct with pointer fields
    /// at the given payload offsets, `size` payload words total.
    StructWithPtrs {
        size: i64,
        ptr_offsets: Vec<i64>,
        encoding: PtrEncoding,
    },
}

const TAG_MASK: i64 = 0b111;
const TAG_ATOMIC_OR_BITMAP: i64 = 0;
const TAG_ATOMIC_ARRAY: i64 = 2;
const TAG_LEADING_PTRS: i64 = 4;
const TAG_POINTER_ARRAY: i64 = 6;
const BITMAP_BITS: i64 = 5;
const BITMAP_MASK: i64 = (1 << BITMAP_BITS) - 1;

impl Header {
    /// Build the tag-2 "array of non-pointer elements" header.
    pub fn atomic_array(len: i64) -> Self {
        Header::AtomicArray(len)
    }

    /// Build the tag-6 "array of pointer elements" header.
    pub fn pointer_array(len: i64) -> Self {
        Header::PointerArray(len)
    }

    /// Build the tag-0 "struct with no pointers" header.
    ///
    /// Tag 0 is shared with the bitmap pointer encoding, disambiguated by
    /// whether `size >> 5` is nonzero (see [`Header::decode`]), so `size`
    /// must stay below 32 here or it will round-trip as
    /// [`Header::StructWithPtrs`] instead.
    pub fn atomic_struct(size: i64) -> Self {
        debug_assert!(size < 32, "atomic struct size {size} collides with the tag-0 bitmap encoding");
        Header::AtomicStruct(size)
    }

    /// Build a tag-0 struct-with-pointers header using the bitmap encoding.
    /// `bit_offsets` are offsets into the bitmap (`0..5`); the resulting
    /// pointer field is at payload offset `bit + 1`.
    pub fn struct_with_ptr_bitmap(size: i64, bit_offsets: &[u8]) -> Self {
        let ptr_offsets = bit_offsets.iter().map(|&b| i64::from(b) + 1).collect();
        Header::StructWithPtrs {
            size,
            ptr_offsets,
            encoding: PtrEncoding::Bitmap,
        }
    }

    /// Build a tag-4 struct-with-pointers header: the leading `count`
    /// payload fields (offsets `0..count`) are pointers.
    pub fn struct_with_leading_ptrs(size: i64, count: u8) -> Self {
        let ptr_offsets = (0..i64::from(count)).collect();
        Header::StructWithPtrs {
            size,
            ptr_offsets,
            encoding: PtrEncoding::Leading,
        }
    }

    /// Decode a raw header word. `h` must not be a forwarding address (the
    /// caller is responsible for the to-space range check that
    /// distinguishes a forwarding address from a real header, per the
    /// forwarding-pointer trick this collector relies on).
    pub fn decode(h: i64) -> Self {
        match h & TAG_MASK {
            TAG_ATOMIC_ARRAY => Header::AtomicArray(h >> 3),
            TAG_POINTER_ARRAY => Header::PointerArray(h >> 3),
            TAG_ATOMIC_OR_BITMAP => {
                // The disambiguator is on the *size* field of the bitmap
                // interpretation, not on the bitmap bits themselves: a
                // pure atomic struct's `len` is written directly into
                // `upper` with no bitmap field reserved, so its low 5 bits
                // are ordinary size bits and can be nonzero.
                let upper = h >> 3;
                let size = upper >> BITMAP_BITS;
                if size > 0 {
                    let bitmap = upper & BITMAP_MASK;
                    let ptr_offsets = (0..BITMAP_BITS)
                        .filter(|bit| bitmap & (1 << bit) != 0)
                        .map(|bit| bit + 1)
                        .collect();
                    Header::StructWithPtrs {
                        size,
                        ptr_offsets,
                        encoding: PtrEncoding::Bitmap,
                    }
                } else {
                    Header::AtomicStruct(upper)
                }
            }
            TAG_LEADING_PTRS => {
                let upper = h >> 3;
                let size = upper >> BITMAP_BITS;
                let k = upper & BITMAP_MASK;
                Header::StructWithPtrs {
                    size,
                    ptr_offsets: (0..=k).collect(),
                    encoding: PtrEncoding::Leading,
                }
            }
            tag => unreachable!(
                "header tag {tag} outside {{0,2,4,6}} — forwarding addresses must be \
                 range-checked against to-space before calling decode"
            ),
        }
    }

    /// Re-encode into a raw header word, inverse of [`Header::decode`].
    pub fn encode(&self) -> i64 {
        match self {
            Header::AtomicArray(len) => (len << 3) | TAG_ATOMIC_ARRAY,
            Header::PointerArray(len) => (len << 3) | TAG_POINTER_ARRAY,
            Header::AtomicStruct(size) => size << 3,
            Header::StructWithPtrs {
                size,
                ptr_offsets,
                encoding: PtrEncoding::Bitmap,
            } => {
                let bitmap = ptr_offsets
                    .iter()
                    .fold(0i64, |acc, &off| acc | (1 << (off - 1)));
                ((size << BITMAP_BITS) | bitmap) << 3
            }
            Header::StructWithPtrs {
                size,
                ptr_offsets,
                encoding: PtrEncoding::Leading,
            } => {
                // decode reads `(0..=k)`, i.e. `k + 1` leading pointer
                // fields, so k is the highest offset, not the count.
                let k = ptr_offsets.iter().copied().max().unwrap_or(0);
                (((size << BITMAP_BITS) | k) << 3) | TAG_LEADING_PTRS
            }
        }
    }

    /// Number of payload words (excluding the header itself).
    pub fn payload_words(&self) -> i64 {
        match self {
            Header::AtomicArray(len) | Header::PointerArray(len) => *len,
            Header::AtomicStruct(size) => *size,
            Header::StructWithPtrs { size, .. } => *size,
        }
    }

    /// Payload offsets (0-based, relative to the first payload word) that
    /// hold pointer fields the scan loop must forward.
    pub fn ptr_offsets(&self) -> Vec<i64> {
        match self {
            Header::AtomicArray(_) | Header::AtomicStruct(_) => Vec::new(),
            Header::PointerArray(len) => (0..*len).collect(),
            Header::StructWithPtrs { ptr_offsets, .. } => ptr_offsets.clone(),
        }
    }

    /// Render the header the way the GC transcript expects it, e.g.
    /// `[Array, len = 3, ptrs = true]` or `[Struct, size = 2, ptr offsets = 1]`.
    pub fn fmt_decoded(&self) -> String {
        match self {
            Header::AtomicArray(len) => format!("[Array, len = {len}, ptrs = false]"),
            Header::PointerArray(len) => format!("[Array, len = {len}, ptrs = true]"),
            Header::AtomicStruct(size) => format!("[Struct, size = {size}, ptr offsets = none]"),
            Header::StructWithPtrs {
                size, ptr_offsets, ..
            } => {
                if ptr_offsets.is_empty() {
                    format!("[Struct, size = {size}, ptr offsets = none]")
                } else {
                    let offsets = ptr_offsets
                        .iter()
                        .map(i64::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!("[Struct, size = {size}, ptr offsets = {offsets}]")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_array_round_trips() {
        let h = Header::atomic_array(5);
        assert_eq!(Header::decode(h.encode()), h);
        assert_eq!(h.payload_words(), 5);
        assert!(h.ptr_offsets().is_empty());
        assert_eq!(h.fmt_decoded(), "[Array, len = 5, ptrs = false]");
    }

    #[test]
    fn pointer_array_round_trips() {
        let h = Header::pointer_array(3);
        assert_eq!(Header::decode(h.encode()), h);
        assert_eq!(h.ptr_offsets(), vec![0, 1, 2]);
        assert_eq!(h.fmt_decoded(), "[Array, len = 3, ptrs = true]");
    }

    #[test]
    fn atomic_struct_round_trips() {
        let h = Header::atomic_struct(2);
        assert_eq!(Header::decode(h.encode()), h);
        assert_eq!(h.fmt_decoded(), "[Struct, size = 2, ptr offsets = none]");
    }

    #[test]
    fn atomic_struct_boundary_does_not_collide_with_bitmap_encoding() {
        // size = 31 keeps `upper >> 5 == 0`, so it still decodes as atomic.
        let h = Header::AtomicStruct(31);
        assert_eq!(Header::decode(h.encode()), h);
    }

    #[test]
    fn struct_with_bitmap_ptrs_round_trips() {
        let h = Header::struct_with_ptr_bitmap(4, &[0, 2]);
        assert_eq!(Header::decode(h.encode()), h);
        assert_eq!(h.ptr_offsets(), vec![1, 3]);
        assert_eq!(h.fmt_decoded(), "[Struct, size = 4, ptr offsets = 1 3]");
    }

    #[test]
    fn struct_with_leading_ptrs_round_trips() {
        let h = Header::struct_with_leading_ptrs(2, 1);
        assert_eq!(Header::decode(h.encode()), h);
        assert_eq!(h.ptr_offsets(), vec![0]);
        assert_eq!(h.fmt_decoded(), "[Struct, size = 2, ptr offsets = 0]");
    }

    #[test]
    fn tags_agree_with_spec_table() {
        assert_eq!(Header::atomic_array(1).encode() & TAG_MASK, 2);
        assert_eq!(Header::pointer_array(1).encode() & TAG_MASK, 6);
        assert_eq!(Header::atomic_struct(1).encode() & TAG_MASK, 0);
        assert_eq!(
            Header::struct_with_leading_ptrs(1, 0).encode() & TAG_MASK,
            4
        );
    }
}
