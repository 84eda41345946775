//! FILENAME: core/crosstab-engine/src/bitvec.rs
//! Fixed-width bit vectors over the sorted item snapshot.
//!
//! Bit `i` corresponds to the item at position `i` of the snapshot. Bits are
//! stored little-endian within each `u64` word:
//! - bit 0 is the LSB of word 0
//! - bit 63 is the MSB of word 0
//!
//! Words past `len` are always zero, so word-wise AND/popcount never needs a
//! tail mask.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    /// An all-zero vector of `bits` width.
    pub fn zeroed(bits: usize) -> Self {
        BitVector {
            words: vec![0u64; bits.div_ceil(64)],
            len: bits,
        }
    }

    pub fn from_indices(bits: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut v = Self::zeroed(bits);
        for i in indices {
            v.set(i);
        }
        v
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVector index out of bounds");
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len, "BitVector index out of bounds");
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn or_inplace(&mut self, other: &BitVector) {
        debug_assert_eq!(self.len, other.len, "BitVector length mismatch");
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= *o;
        }
    }

    /// Overwrites `self` with `a & b`. All three must share a width.
    pub fn assign_and(&mut self, a: &BitVector, b: &BitVector) {
        debug_assert!(self.len == a.len && a.len == b.len, "BitVector length mismatch");
        for ((w, x), y) in self.words.iter_mut().zip(&a.words).zip(&b.words) {
            *w = x & y;
        }
    }

    /// Positions of set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(wi * 64 + bit)
            })
        })
    }
}

/// `|a ∩ b|`.
pub fn intersection_cardinality(a: &BitVector, b: &BitVector) -> usize {
    a.words
        .iter()
        .zip(&b.words)
        .map(|(x, y)| (x & y).count_ones() as usize)
        .sum()
}

/// `|a ∩ b ∩ c|` in a single pass over the words.
pub fn intersection_cardinality3(a: &BitVector, b: &BitVector, c: &BitVector) -> usize {
    a.words
        .iter()
        .zip(&b.words)
        .zip(&c.words)
        .map(|((x, y), z)| (x & y & z).count_ones() as usize)
        .sum()
}

/// Union of the present vectors; absent vectors contribute nothing.
pub fn union<'a>(
    bits: usize,
    vectors: impl IntoIterator<Item = &'a Option<BitVector>>,
) -> BitVector {
    let mut result = BitVector::zeroed(bits);
    for v in vectors.into_iter().flatten() {
        result.or_inplace(v);
    }
    result
}
