//! Fixed-capacity bit set used as the inclusion record of a search trial.

use std::fmt;

/// A fixed-capacity boolean vector backed by 32-bit words.
///
/// Every search branch owns its own copy; cloning is the only way to derive a
/// new inclusion record from an existing one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u32>,
    len: usize,
}

impl BitSet {
    const BITS_PER_WORD: usize = 32;

    /// Create a bit set holding `len` bits, all cleared.
    pub fn new(len: usize) -> Self {
        let num_words = len.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            len,
        }
    }

    /// Number of addressable bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn locate(index: usize) -> (usize, u32) {
        (index / Self::BITS_PER_WORD, 1u32 << (index % Self::BITS_PER_WORD))
    }

    /// Read a bit. Indices past the capacity read as cleared.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Write a bit.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the fixed capacity.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(
            index < self.len,
            "bit index {index} out of range for bit set of {} bits",
            self.len
        );
        let (word, mask) = Self::locate(index);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    /// Invert a bit and return its new value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the fixed capacity.
    #[inline]
    pub fn flip(&mut self, index: usize) -> bool {
        assert!(
            index < self.len,
            "bit index {index} out of range for bit set of {} bits",
            self.len
        );
        let (word, mask) = Self::locate(index);
        self.words[word] ^= mask;
        self.words[word] & mask != 0
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over the indices of set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = (0..self.len)
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect();
        write!(f, "BitSet({bits})")
    }
}
