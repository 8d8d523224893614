// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::binary_search::partition_point;
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::succinct::{BitVec, IntVec, RankBitVec};
use crate::wavelet::{WaveletTree, WtNode};
use crate::{suffix_array, LexRange};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::io::{Read, Write};

/// Read-only facade over the self-index of one text
///
/// Owns the bit-packed text, its suffix array, a wavelet tree over the
/// suffix array values (driving the lexicographic-positional DFS walks), a
/// wavelet tree over the BWT (driving backward search) and an optional
/// document boundary bit vector. Everything is immutable after
/// construction, so an index can be shared freely between queries.
#[derive(Debug, Eq, PartialEq)]
pub struct MatchingIndex {
    text: IntVec,
    sa: IntVec,
    wt_sa: WaveletTree,
    wt_bwt: WaveletTree,

    /// Distinct BWT symbols, ascending (shifted by one; 0 is the sentinel)
    syms: Vec<u64>,

    /// Per distinct symbol, the count of strictly smaller BWT symbols
    cum: Vec<u64>,

    delimiter: Option<u64>,
    dbs: Option<RankBitVec>,
}

impl MatchingIndex {
    /// Builds the index over a text.
    ///
    /// When a delimiter symbol is given, a document boundary bit vector is
    /// built alongside and the DFS search prunes matches that straddle
    /// documents.
    #[must_use]
    pub fn build(text: IntVec, delimiter: Option<u64>) -> Self {
        let n = text.len();

        log::debug!(
            "building index, n={n}, width={}, delimiter={delimiter:?}",
            text.width(),
        );

        let sa = suffix_array::build(&text);

        let sa_values = sa.iter().collect::<Vec<_>>();
        let wt_sa = WaveletTree::build(&sa_values);

        // BWT with symbols shifted up by one; the empty suffix contributes
        // the sentinel 0
        let mut bwt = Vec::with_capacity(sa_values.len());
        for &p in &sa_values {
            bwt.push(if p == 0 { 0 } else { text.get(p - 1) + 1 });
        }
        let wt_bwt = WaveletTree::build(&bwt);

        let mut sorted = bwt.clone();
        sorted.sort_unstable();

        let mut syms = vec![];
        let mut cum = vec![];
        let mut seen = 0u64;

        for (i, &sym) in sorted.iter().enumerate() {
            if i == 0 || syms.last() != Some(&sym) {
                syms.push(sym);
                cum.push(seen);
            }
            seen += 1;
        }

        let dbs = delimiter.map(|delim| {
            let mut bv = BitVec::with_capacity(n);
            for sym in text.iter() {
                bv.push(sym == delim);
            }
            RankBitVec::from(bv)
        });

        log::debug!("index built, sa_len={}, wt_depth={}", sa.len(), wt_sa.depth());

        Self {
            text,
            sa,
            wt_sa,
            wt_bwt,
            syms,
            cum,
            delimiter,
            dbs,
        }
    }

    /// The indexed text
    #[must_use]
    pub fn text(&self) -> &IntVec {
        &self.text
    }

    /// Text length in symbols
    #[must_use]
    pub fn text_len(&self) -> u64 {
        self.text.len()
    }

    /// Suffix array size (text length plus the empty suffix)
    #[must_use]
    pub fn size(&self) -> u64 {
        self.sa.len()
    }

    /// The suffix array entry at lex position `i`
    #[must_use]
    pub fn sa_value(&self, i: u64) -> u64 {
        self.sa.get(i)
    }

    /// The lex-range covering the entire suffix array
    #[must_use]
    pub fn full_range(&self) -> LexRange {
        LexRange::new(0, self.size() - 1)
    }

    /// Configured document delimiter symbol, if any
    #[must_use]
    pub fn delimiter(&self) -> Option<u64> {
        self.delimiter
    }

    /// Whether a document boundary bit vector is available
    #[must_use]
    pub fn has_documents(&self) -> bool {
        self.dbs.is_some()
    }

    /// Document number of a text position (rank over the boundary bits)
    ///
    /// Positions past the end clamp to the end; without a boundary vector
    /// everything is document 0.
    #[must_use]
    pub fn doc_index(&self, pos: u64) -> u64 {
        match &self.dbs {
            Some(dbs) => dbs.rank1(pos.min(dbs.len())),
            None => 0,
        }
    }

    /// Compares the suffix starting at `start` against a pattern prefix.
    fn cmp_suffix(&self, start: u64, pattern: &[u64]) -> Ordering {
        let n = self.text.len();

        for (k, &p) in pattern.iter().enumerate() {
            let idx = start + k as u64;

            if idx >= n {
                // Suffix exhausted, sorts before the longer pattern
                return Ordering::Less;
            }

            let sym = self.text.get(idx);
            if sym != p {
                return sym.cmp(&p);
            }
        }

        Ordering::Equal
    }

    /// Narrows a lex-range to the suffixes starting with `pattern` by
    /// double binary search over the suffix array.
    ///
    /// Returns `None` when no suffix matches.
    #[must_use]
    pub fn forward_search(&self, range: LexRange, pattern: &[u64]) -> Option<LexRange> {
        if pattern.is_empty() {
            return Some(range);
        }

        let lo = partition_point(range.sp, range.ep + 1, |i| {
            self.cmp_suffix(self.sa.get(i), pattern) == Ordering::Less
        });

        let hi = partition_point(lo, range.ep + 1, |i| {
            self.cmp_suffix(self.sa.get(i), pattern) != Ordering::Greater
        });

        (lo < hi).then(|| LexRange::new(lo, hi - 1))
    }

    /// Number of BWT symbols strictly smaller than the (shifted) symbol,
    /// or `None` when the symbol does not occur at all.
    fn c_array(&self, shifted: u64) -> Option<u64> {
        let idx = self.syms.partition_point(|&s| s < shifted);

        match self.syms.get(idx) {
            Some(&s) if s == shifted => self.cum.get(idx).copied(),
            _ => None,
        }
    }

    /// Narrows a lex-range to the suffixes starting with `pattern` by a
    /// backward FM walk over the BWT wavelet tree.
    ///
    /// Returns `None` when no suffix matches. Same contract as
    /// [`MatchingIndex::forward_search`]: the walk runs over the whole
    /// suffix array and the result is clipped to the given range.
    #[must_use]
    pub fn backward_search(&self, range: LexRange, pattern: &[u64]) -> Option<LexRange> {
        // Half-open bounds during the walk
        let mut lo = 0;
        let mut hi = self.size();

        for &sym in pattern.iter().rev() {
            let shifted = sym.checked_add(1)?;
            let base = self.c_array(shifted)?;

            lo = base + self.wt_bwt.rank(lo, shifted);
            hi = base + self.wt_bwt.rank(hi, shifted);

            if lo >= hi {
                return None;
            }
        }

        // Suffixes starting with the pattern form one contiguous range,
        // so clipping is exact
        let lo = lo.max(range.sp);
        let hi = hi.min(range.ep + 1);

        (lo < hi).then(|| LexRange::new(lo, hi - 1))
    }

    /// Root node of the suffix array wavelet tree
    #[must_use]
    pub fn root(&self) -> WtNode {
        self.wt_sa.root()
    }

    /// Whether the wavelet tree node is a leaf
    #[must_use]
    pub fn is_leaf(&self, node: WtNode) -> bool {
        self.wt_sa.is_leaf(node)
    }

    /// Inclusive text position bounds reachable through the node
    #[must_use]
    pub fn value_range(&self, node: WtNode) -> (u64, u64) {
        self.wt_sa.value_range(node)
    }

    /// The two children of an inner node
    #[must_use]
    pub fn expand(&self, node: WtNode) -> (WtNode, WtNode) {
        self.wt_sa.expand(node)
    }

    /// Maps a lex-range through an inner node onto its children
    #[must_use]
    pub fn expand_range(&self, node: WtNode, range: LexRange) -> [Option<LexRange>; 2] {
        self.wt_sa.expand_range(node, range)
    }

    /// Approximate heap size in bytes
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.text.size_in_bytes() + self.sa.size_in_bytes()
    }
}

impl Encode for MatchingIndex {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.text.encode_into(writer)?;
        self.sa.encode_into(writer)?;
        self.wt_sa.encode_into(writer)?;
        self.wt_bwt.encode_into(writer)?;

        writer.write_u64::<BigEndian>(self.syms.len() as u64)?;
        for &sym in &self.syms {
            writer.write_u64::<BigEndian>(sym)?;
        }
        for &count in &self.cum {
            writer.write_u64::<BigEndian>(count)?;
        }

        match self.delimiter {
            Some(delim) => {
                writer.write_u8(1)?;
                writer.write_u64::<BigEndian>(delim)?;
            }
            None => writer.write_u8(0)?,
        }

        match &self.dbs {
            Some(dbs) => {
                writer.write_u8(1)?;
                dbs.encode_into(writer)?;
            }
            None => writer.write_u8(0)?,
        }

        Ok(())
    }
}

impl Decode for MatchingIndex {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let text = IntVec::decode_from(reader)?;
        let sa = IntVec::decode_from(reader)?;
        let wt_sa = WaveletTree::decode_from(reader)?;
        let wt_bwt = WaveletTree::decode_from(reader)?;

        let sym_count = reader.read_u64::<BigEndian>()? as usize;

        let mut syms = Vec::with_capacity(sym_count);
        for _ in 0..sym_count {
            syms.push(reader.read_u64::<BigEndian>()?);
        }

        let mut cum = Vec::with_capacity(sym_count);
        for _ in 0..sym_count {
            cum.push(reader.read_u64::<BigEndian>()?);
        }

        let delimiter = match reader.read_u8()? {
            0 => None,
            1 => Some(reader.read_u64::<BigEndian>()?),
            tag => return Err(DecodeError::InvalidTag(("MatchingIndex", tag))),
        };

        let dbs = match reader.read_u8()? {
            0 => None,
            1 => Some(RankBitVec::decode_from(reader)?),
            tag => return Err(DecodeError::InvalidTag(("MatchingIndex", tag))),
        };

        Ok(Self {
            text,
            sa,
            wt_sa,
            wt_bwt,
            syms,
            cum,
            delimiter,
            dbs,
        })
    }
}
