// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Number of bits needed to represent `value` (at least 1)
#[must_use]
pub fn bits_for(value: u64) -> u8 {
    let bits = (64 - value.leading_zeros()) as u8;
    bits.max(1)
}

/// Bit-packed vector of fixed-width unsigned integers
///
/// Widths from 1 to 64 bits are supported. Elements are packed
/// back-to-back, least significant bit first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IntVec {
    width: u8,
    len: u64,
    words: Vec<u64>,
}

impl IntVec {
    /// Creates an empty vector of the given element width.
    ///
    /// # Panics
    ///
    /// Panics if the width is not in `1..=64`.
    #[must_use]
    pub fn new(width: u8) -> Self {
        assert!((1..=64).contains(&width), "invalid element width");

        Self {
            width,
            len: 0,
            words: vec![],
        }
    }

    #[must_use]
    pub fn with_capacity(width: u8, capacity: u64) -> Self {
        let mut v = Self::new(width);
        v.words
            .reserve((capacity * u64::from(width)).div_ceil(64) as usize);
        v
    }

    /// Bit-compresses a slice of symbols (width = bits of the maximum value).
    #[must_use]
    pub fn from_slice(symbols: &[u64]) -> Self {
        let max = symbols.iter().copied().max().unwrap_or_default();
        let mut v = Self::with_capacity(bits_for(max), symbols.len() as u64);

        for &sym in symbols {
            v.push(sym);
        }

        v
    }

    /// Element width in bits
    #[must_use]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn mask(&self) -> u64 {
        if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Appends a value, truncated to the element width.
    pub fn push(&mut self, value: u64) {
        let value = value & self.mask();
        let bit_pos = self.len * u64::from(self.width);
        let word_idx = (bit_pos / 64) as usize;
        let shift = (bit_pos % 64) as u32;

        if word_idx == self.words.len() {
            self.words.push(0);
        }

        {
            let word = self.words.get_mut(word_idx).expect("should exist");
            *word |= value << shift;
        }

        // Spill into the next word
        if shift + u32::from(self.width) > 64 {
            self.words.push(value >> (64 - shift));
        }

        self.len += 1;
    }

    /// Gets the i-th element.
    #[must_use]
    pub fn get(&self, idx: u64) -> u64 {
        debug_assert!(idx < self.len, "index out of bounds");

        let bit_pos = idx * u64::from(self.width);
        let word_idx = (bit_pos / 64) as usize;
        let shift = (bit_pos % 64) as u32;

        let mut value = self.words.get(word_idx).expect("should exist") >> shift;

        if shift + u32::from(self.width) > 64 {
            let hi = self.words.get(word_idx + 1).expect("should exist");
            value |= hi << (64 - shift);
        }

        value & self.mask()
    }

    /// Iterates over all elements.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    /// Approximate heap size in bytes
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        (self.words.len() * 8) as u64
    }
}

impl Encode for IntVec {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u8(self.width)?;
        writer.write_u64::<BigEndian>(self.len)?;

        for word in &self.words {
            writer.write_u64::<BigEndian>(*word)?;
        }

        Ok(())
    }
}

impl Decode for IntVec {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let width = reader.read_u8()?;

        if !(1..=64).contains(&width) {
            return Err(DecodeError::InvalidHeader("IntVec"));
        }

        let len = reader.read_u64::<BigEndian>()?;
        let word_count = (len * u64::from(width)).div_ceil(64) as usize;

        let mut words = Vec::with_capacity(word_count);

        for _ in 0..word_count {
            words.push(reader.read_u64::<BigEndian>()?);
        }

        Ok(Self { width, len, words })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn int_vec_bits_for() {
        assert_eq!(1, bits_for(0));
        assert_eq!(1, bits_for(1));
        assert_eq!(2, bits_for(2));
        assert_eq!(2, bits_for(3));
        assert_eq!(3, bits_for(4));
        assert_eq!(8, bits_for(255));
        assert_eq!(9, bits_for(256));
        assert_eq!(64, bits_for(u64::MAX));
    }

    #[test]
    fn int_vec_push_get_narrow() {
        let mut v = IntVec::new(3);
        for i in 0..100 {
            v.push(i % 8);
        }

        assert_eq!(100, v.len());

        for i in 0..100 {
            assert_eq!(i % 8, v.get(i), "element {i}");
        }
    }

    #[test]
    fn int_vec_push_get_unaligned() {
        // 17 bits straddles word boundaries frequently
        let mut v = IntVec::new(17);
        let values = (0..500u64).map(|i| (i * 7919) % (1 << 17)).collect::<Vec<_>>();

        for &x in &values {
            v.push(x);
        }

        for (i, &x) in values.iter().enumerate() {
            assert_eq!(x, v.get(i as u64), "element {i}");
        }
    }

    #[test]
    fn int_vec_full_width() {
        let mut v = IntVec::new(64);
        v.push(u64::MAX);
        v.push(0);
        v.push(0xDEAD_BEEF_CAFE_BABE);

        assert_eq!(u64::MAX, v.get(0));
        assert_eq!(0, v.get(1));
        assert_eq!(0xDEAD_BEEF_CAFE_BABE, v.get(2));
    }

    #[test]
    fn int_vec_from_slice_compresses() {
        let v = IntVec::from_slice(&[0, 1, 2, 3, 4, 5]);
        assert_eq!(3, v.width());
        assert_eq!(vec![0, 1, 2, 3, 4, 5], v.iter().collect::<Vec<_>>());
    }

    #[test]
    fn int_vec_roundtrip() {
        let v = IntVec::from_slice(&(0..1000u64).map(|i| i * 31).collect::<Vec<_>>());

        let bytes = v.encode_into_vec();
        let decoded = IntVec::decode_from(&mut &bytes[..]).expect("should decode");

        assert_eq!(v, decoded);
        assert_eq!(bytes, decoded.encode_into_vec());
    }

    #[test]
    fn int_vec_empty_roundtrip() {
        let v = IntVec::new(13);
        let bytes = v.encode_into_vec();
        let decoded = IntVec::decode_from(&mut &bytes[..]).expect("should decode");
        assert_eq!(v, decoded);
        assert!(decoded.is_empty());
    }
}
