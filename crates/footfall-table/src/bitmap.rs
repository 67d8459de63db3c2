#![forbid(unsafe_code)]

/// Row selection mask produced by filters.
///
/// Bits are stored little-endian within each `u64` word (bit 0 is the LSB of word 0). Bits past
/// `len` in the last word are always zero, so word-level popcounts stay exact.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

fn tail_mask(len: usize) -> u64 {
    match len % 64 {
        0 => u64::MAX,
        rem => (1u64 << rem) - 1,
    }
}

impl BitVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_len_all_true(bits: usize) -> Self {
        if bits == 0 {
            return Self::new();
        }
        let mut words = vec![u64::MAX; bits.div_ceil(64)];
        if let Some(last) = words.last_mut() {
            *last &= tail_mask(bits);
        }
        Self {
            words,
            len: bits,
            ones: bits,
        }
    }

    pub fn with_len_all_false(bits: usize) -> Self {
        Self {
            words: vec![0u64; bits.div_ceil(64)],
            len: bits,
            ones: 0,
        }
    }

    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut out = Self::new();
        for bit in bits {
            out.push(bit);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, value: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }
        if value {
            self.words[self.len / 64] |= 1u64 << bit;
            self.ones += 1;
        }
        self.len += 1;
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn all_true(&self) -> bool {
        self.ones == self.len
    }

    pub fn and_inplace(&mut self, other: &BitVec) {
        self.combine(other, |a, b| a & b);
    }

    pub fn or_inplace(&mut self, other: &BitVec) {
        self.combine(other, |a, b| a | b);
    }

    pub fn not_inplace(&mut self) {
        self.combine_self(|w| !w);
    }

    /// Indices of set bits, in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(word_idx * 64 + bit)
            })
        })
    }

    fn combine(&mut self, other: &BitVec, op: impl Fn(u64, u64) -> u64) {
        debug_assert_eq!(self.len, other.len, "BitVec length mismatch");
        for (idx, w) in self.words.iter_mut().enumerate() {
            *w = op(*w, other.words.get(idx).copied().unwrap_or(0));
        }
        self.fix_tail();
    }

    fn combine_self(&mut self, op: impl Fn(u64) -> u64) {
        for w in &mut self.words {
            *w = op(*w);
        }
        self.fix_tail();
    }

    fn fix_tail(&mut self) {
        if let Some(last) = self.words.last_mut() {
            *last &= tail_mask(self.len);
        }
        self.ones = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_clears_tail_bits() {
        let mut mask = BitVec::from_bools((0..70).map(|i| i == 3));
        mask.not_inplace();
        assert_eq!(mask.count_ones(), 69);
        assert!(!mask.get(3));
        assert_eq!(mask.iter_ones().last(), Some(69));
    }

    #[test]
    fn and_or_track_popcount() {
        let mut a = BitVec::from_bools([true, true, false, false]);
        let b = BitVec::from_bools([true, false, true, false]);
        let mut c = a.clone();
        a.and_inplace(&b);
        c.or_inplace(&b);
        assert_eq!(a.iter_ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(c.iter_ones().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(c.count_ones(), 3);
    }
}
