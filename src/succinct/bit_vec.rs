// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Bits per rank directory block
const BLOCK_BITS: u64 = 512;
const WORDS_PER_BLOCK: usize = (BLOCK_BITS / 64) as usize;

/// Append-only plain bit vector
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BitVec {
    len: u64,
    words: Vec<u64>,
}

impl BitVec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(bits: u64) -> Self {
        Self {
            len: 0,
            words: Vec::with_capacity(bits.div_ceil(64) as usize),
        }
    }

    /// Number of bits
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a bit.
    pub fn push(&mut self, bit: bool) {
        let word_idx = (self.len / 64) as usize;

        if word_idx == self.words.len() {
            self.words.push(0);
        }

        if bit {
            let word = self.words.get_mut(word_idx).expect("should exist");
            *word |= 1u64 << (self.len % 64);
        }

        self.len += 1;
    }

    /// Gets the i-th bit.
    #[must_use]
    pub fn get(&self, idx: u64) -> bool {
        debug_assert!(idx < self.len, "bit index out of bounds");

        let word = self.words.get((idx / 64) as usize).expect("should exist");
        (word >> (idx % 64)) & 1 == 1
    }

    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

impl Encode for BitVec {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<BigEndian>(self.len)?;

        for word in &self.words {
            writer.write_u64::<BigEndian>(*word)?;
        }

        Ok(())
    }
}

impl Decode for BitVec {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let len = reader.read_u64::<BigEndian>()?;
        let word_count = len.div_ceil(64) as usize;

        let mut words = Vec::with_capacity(word_count);

        for _ in 0..word_count {
            words.push(reader.read_u64::<BigEndian>()?);
        }

        Ok(Self { len, words })
    }
}

/// Immutable bit vector with a popcount directory for rank queries
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RankBitVec {
    bits: BitVec,

    /// Number of set bits before each 512-bit block
    blocks: Vec<u64>,
}

impl From<BitVec> for RankBitVec {
    fn from(bits: BitVec) -> Self {
        let mut blocks = Vec::with_capacity(bits.words.len() / WORDS_PER_BLOCK + 1);
        let mut ones = 0u64;

        for (idx, word) in bits.words.iter().enumerate() {
            if idx % WORDS_PER_BLOCK == 0 {
                blocks.push(ones);
            }
            ones += u64::from(word.count_ones());
        }

        Self { bits, blocks }
    }
}

impl RankBitVec {
    /// Number of bits
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Gets the i-th bit.
    #[must_use]
    pub fn get(&self, idx: u64) -> bool {
        self.bits.get(idx)
    }

    /// Number of set bits in `[0, pos)`.
    ///
    /// `pos` may equal `len`.
    #[must_use]
    pub fn rank1(&self, pos: u64) -> u64 {
        debug_assert!(pos <= self.len(), "rank position out of bounds");

        let block_idx = (pos / BLOCK_BITS) as usize;
        let mut ones = self.blocks.get(block_idx).copied().unwrap_or_default();

        let first_word = block_idx * WORDS_PER_BLOCK;
        let last_word = (pos / 64) as usize;

        for word in self
            .bits
            .words
            .get(first_word..last_word)
            .unwrap_or_default()
        {
            ones += u64::from(word.count_ones());
        }

        let tail_bits = pos % 64;
        if tail_bits > 0 {
            let word = self.bits.words.get(last_word).copied().unwrap_or_default();
            ones += u64::from((word & ((1u64 << tail_bits) - 1)).count_ones());
        }

        ones
    }

    /// Number of unset bits in `[0, pos)`.
    #[must_use]
    pub fn rank0(&self, pos: u64) -> u64 {
        pos - self.rank1(pos)
    }
}

impl Encode for RankBitVec {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        // The rank directory is derived data and is rebuilt on load
        self.bits.encode_into(writer)
    }
}

impl Decode for RankBitVec {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let bits = BitVec::decode_from(reader)?;
        Ok(Self::from(bits))
    }
}
