// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::bit_stream::{read_bits, BitWriter};
use super::int_vec::bits_for;

const HEADER_BITS: u64 = 64 + 64 + 8;

/// Picks the low-part width for `n` elements over universe `u`.
fn low_width(n: u64, universe: u64) -> u8 {
    if universe > n {
        bits_for(universe / n) - 1
    } else {
        0
    }
}

fn high_len(n: u64, universe: u64, lw: u8) -> u64 {
    n + ((universe - 1) >> lw) + 1
}

/// Appends an Elias-Fano encoded list to a bit stream.
///
/// Values must be strictly ascending and non-empty. Returns the bit offset
/// the list starts at, for storage in an offset map.
pub fn create(writer: &mut BitWriter, values: &[u64]) -> u64 {
    debug_assert!(!values.is_empty(), "empty list");

    let base = writer.position();
    let n = values.len() as u64;
    let last = *values.last().expect("list is non-empty");
    let universe = last + 1;
    let lw = low_width(n, universe);

    writer.write_bits(n, 64);
    writer.write_bits(universe, 64);
    writer.write_bits(u64::from(lw), 8);

    for &v in values {
        writer.write_bits(v, lw);
    }

    // Upper parts as a negated-unary bit vector: the i-th element sets
    // bit (v >> lw) + i
    let mut cursor = 0u64;

    for (i, &v) in values.iter().enumerate() {
        let target = (v >> lw) + i as u64;
        debug_assert!(target >= cursor, "values must be strictly ascending");

        for _ in cursor..target {
            writer.write_bit(false);
        }
        writer.write_bit(true);
        cursor = target + 1;
    }

    for _ in cursor..high_len(n, universe, lw) {
        writer.write_bit(false);
    }

    base
}

/// Read-only view of one Elias-Fano list inside a shared bit blob
#[derive(Clone, Copy, Debug)]
pub struct EliasFanoList<'a> {
    words: &'a [u64],
    n: u64,
    lw: u8,
    low_base: u64,
    high_base: u64,
}

impl<'a> EliasFanoList<'a> {
    /// Attaches to the list starting at bit offset `base`.
    #[must_use]
    pub fn parse(words: &'a [u64], base: u64) -> Self {
        let n = read_bits(words, base, 64);
        let universe = read_bits(words, base + 64, 64);
        let lw = read_bits(words, base + 128, 8) as u8;

        debug_assert!(universe > 0, "corrupt list header");

        let low_base = base + HEADER_BITS;
        let high_base = low_base + n * u64::from(lw);

        Self {
            words,
            n,
            lw,
            low_base,
            high_base,
        }
    }

    /// Number of positions in the list
    #[must_use]
    pub fn len(&self) -> u64 {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Cursor over the list, positioned before the first element.
    #[must_use]
    pub fn cursor(&self) -> EliasFanoCursor<'a> {
        EliasFanoCursor {
            list: *self,
            idx: 0,
            h_pos: self.high_base,
        }
    }

    /// Decodes the whole list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u64> {
        let mut cursor = self.cursor();
        let mut out = Vec::with_capacity(self.n as usize);

        while let Some(v) = cursor.next_value() {
            out.push(v);
        }

        out
    }
}

/// Forward cursor over an [`EliasFanoList`]
#[derive(Clone, Copy, Debug)]
pub struct EliasFanoCursor<'a> {
    list: EliasFanoList<'a>,
    idx: u64,
    h_pos: u64,
}

impl EliasFanoCursor<'_> {
    /// Returns the next element without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u64> {
        let mut probe = *self;
        probe.next_value()
    }

    /// Consumes and returns the next element.
    pub fn next_value(&mut self) -> Option<u64> {
        if self.idx == self.list.n {
            return None;
        }

        // Scan the upper bit vector for the next set bit, skipping
        // whole zero words
        loop {
            let word_idx = (self.h_pos / 64) as usize;
            let shift = (self.h_pos % 64) as u32;

            let word = self.list.words.get(word_idx).copied().unwrap_or_default() >> shift;

            if word == 0 {
                self.h_pos += u64::from(64 - shift);
            } else {
                self.h_pos += u64::from(word.trailing_zeros());
                break;
            }
        }

        let high = (self.h_pos - self.list.high_base) - self.idx;

        let low = if self.list.lw > 0 {
            read_bits(
                self.list.words,
                self.list.low_base + self.idx * u64::from(self.list.lw),
                self.list.lw,
            )
        } else {
            0
        };

        self.h_pos += 1;
        self.idx += 1;

        Some((high << self.list.lw) | low)
    }

    /// Skips forward until the next element is `>= target`.
    pub fn seek(&mut self, target: u64) {
        while let Some(v) = self.peek() {
            if v >= target {
                break;
            }
            let _ = self.next_value();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn encode_one(values: &[u64]) -> (Vec<u64>, u64) {
        let mut writer = BitWriter::new();
        let base = create(&mut writer, values);
        let (words, _) = writer.finish();
        (words, base)
    }

    #[test]
    fn elias_fano_roundtrip_dense() {
        let values = (0..500u64).collect::<Vec<_>>();
        let (words, base) = encode_one(&values);

        let list = EliasFanoList::parse(&words, base);
        assert_eq!(500, list.len());
        assert_eq!(values, list.to_vec());
    }

    #[test]
    fn elias_fano_roundtrip_sparse() {
        let values = vec![3, 90, 91, 1000, 65_536, 1 << 40];
        let (words, base) = encode_one(&values);

        let list = EliasFanoList::parse(&words, base);
        assert_eq!(values, list.to_vec());
    }

    #[test]
    fn elias_fano_single_element() {
        let (words, base) = encode_one(&[0]);
        assert_eq!(vec![0], EliasFanoList::parse(&words, base).to_vec());

        let (words, base) = encode_one(&[12_345]);
        assert_eq!(vec![12_345], EliasFanoList::parse(&words, base).to_vec());
    }

    #[test]
    fn elias_fano_seek() {
        let values = vec![2, 5, 9, 14, 100, 101, 4000];
        let (words, base) = encode_one(&values);
        let list = EliasFanoList::parse(&words, base);

        let mut cursor = list.cursor();
        cursor.seek(10);
        assert_eq!(Some(14), cursor.peek());

        cursor.seek(102);
        assert_eq!(Some(4000), cursor.next_value());
        assert_eq!(None, cursor.next_value());
    }

    #[test]
    fn elias_fano_multiple_lists_in_blob() {
        let a = vec![1, 4, 9];
        let b = vec![0, 2, 1024, 1025];
        let c = (10..200u64).step_by(7).collect::<Vec<_>>();

        let mut writer = BitWriter::new();
        let base_a = create(&mut writer, &a);
        let base_b = create(&mut writer, &b);
        let base_c = create(&mut writer, &c);
        let (words, _) = writer.finish();

        assert_eq!(a, EliasFanoList::parse(&words, base_a).to_vec());
        assert_eq!(b, EliasFanoList::parse(&words, base_b).to_vec());
        assert_eq!(c, EliasFanoList::parse(&words, base_c).to_vec());
    }
}
