// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Coarse q-gram filtering with regex verification
//!
//! All overlapping q-grams of the text are indexed as Elias-Fano position
//! lists inside one shared bit blob. A query intersects the lists of its
//! sub-patterns' q-grams into a small candidate set, then runs the full
//! verification regex only inside narrow windows around the candidates.

pub mod intersect;

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::pattern::Pattern;
use crate::succinct::bit_stream::BitWriter;
use crate::succinct::elias_fano::{self, EliasFanoList};
use crate::succinct::IntVec;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use intersect::intersect_adjacent;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// Candidate start offsets produced by the filter
///
/// Every true match starts inside `p ..= p + slack` for some candidate
/// `p`; `slack` is zero when the filtering sub-pattern is the first one.
/// An empty position set means the pattern provably has no occurrences.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CandidateSet {
    /// Sorted candidate start offsets
    pub positions: Vec<u64>,

    /// Start offset uncertainty per candidate
    pub slack: u64,
}

impl CandidateSet {
    fn empty() -> Self {
        Self {
            positions: vec![],
            slack: 0,
        }
    }
}

/// Inverted index over all overlapping q-grams of a byte text
#[derive(Debug, Eq, PartialEq)]
pub struct QGramIndex {
    q: u8,

    /// q-gram id -> bit offset of its list inside the blob
    map: FxHashMap<u64, u64>,

    blob: Vec<u64>,
    blob_bits: u64,
}

/// Packs up to 8 byte symbols into a q-gram id, first symbol lowest.
fn pack_id(symbols: &[u64]) -> Option<u64> {
    let mut id = 0u64;

    for (k, &sym) in symbols.iter().enumerate() {
        if sym > u64::from(u8::MAX) {
            return None;
        }
        id |= sym << (8 * k);
    }

    Some(id)
}

impl QGramIndex {
    /// Indexes all overlapping q-grams of the text.
    ///
    /// Only byte-width texts and `q` in `1..=8` are supported.
    pub fn build(text: &IntVec, q: u8) -> crate::Result<Self> {
        if !(1..=8).contains(&q) {
            return Err(crate::Error::Unsupported("q must be in 1..=8"));
        }

        if text.width() > 8 {
            return Err(crate::Error::Unsupported(
                "q-gram filter requires byte symbols",
            ));
        }

        let n = text.len();
        log::debug!("building q-gram filter, q={q}, n={n}");

        // Ascending id order keeps the blob layout deterministic
        let mut lists: BTreeMap<u64, Vec<u64>> = BTreeMap::new();

        if n >= u64::from(q) {
            let mut window = (0..u64::from(q))
                .map(|k| text.get(k))
                .collect::<Vec<_>>();

            for pos in 0..=(n - u64::from(q)) {
                let id = pack_id(&window).expect("text symbols fit into bytes");
                lists.entry(id).or_default().push(pos);

                if pos + u64::from(q) < n {
                    window.rotate_left(1);
                    *window.last_mut().expect("window is non-empty") =
                        text.get(pos + u64::from(q));
                }
            }
        }

        let mut writer = BitWriter::new();
        let mut map =
            FxHashMap::with_capacity_and_hasher(lists.len(), rustc_hash::FxBuildHasher);

        for (id, positions) in lists {
            let offset = elias_fano::create(&mut writer, &positions);
            map.insert(id, offset);
        }

        let (blob, blob_bits) = writer.finish();

        log::debug!("q-gram filter built, distinct={}", map.len());

        Ok(Self {
            q,
            map,
            blob,
            blob_bits,
        })
    }

    /// Configured q-gram length
    #[must_use]
    pub fn q(&self) -> u8 {
        self.q
    }

    /// Number of distinct q-grams
    #[must_use]
    pub fn distinct(&self) -> u64 {
        self.map.len() as u64
    }

    fn list(&self, id: u64) -> Option<EliasFanoList<'_>> {
        self.map
            .get(&id)
            .map(|&offset| EliasFanoList::parse(&self.blob, offset))
    }

    /// The ids of the overlapping q-grams of a sub-pattern, or `None` if
    /// a symbol does not fit into a byte.
    fn qgram_ids(&self, sub: &[u64]) -> Option<Vec<u64>> {
        let q = usize::from(self.q);
        debug_assert!(sub.len() >= q);

        sub.windows(q).map(pack_id).collect()
    }

    /// Filters the text down to candidate start offsets for the pattern.
    ///
    /// Uses the sub-pattern producing the smallest candidate set, skipping
    /// sub-patterns shorter than `q` and sub-patterns whose start offset
    /// inside the pattern is unbounded. `None` means no sub-pattern was
    /// usable and the caller has to fall back to a full scan.
    #[must_use]
    pub fn candidates(&self, pattern: &Pattern) -> Option<CandidateSet> {
        let q = u64::from(self.q);

        let mut best: Option<CandidateSet> = None;

        // Start offset bounds of the current sub-pattern inside the match
        let mut min_offset = 0u64;
        let mut max_offset = 0u64;

        for (j, sub) in pattern.subpatterns().iter().enumerate() {
            if sub.len() as u64 >= q && max_offset != u64::MAX {
                let Some(ids) = self.qgram_ids(sub) else {
                    // Symbols beyond a byte cannot occur in a byte text
                    return Some(CandidateSet::empty());
                };

                let mut lists = vec![];
                for id in &ids {
                    match self.list(*id) {
                        // Missing q-gram: the pattern has no occurrences
                        None => return Some(CandidateSet::empty()),
                        Some(list) => lists.push(list),
                    }
                }

                let refs = lists.iter().collect::<Vec<_>>();
                let hits = intersect_adjacent(&refs);

                if hits.is_empty() {
                    return Some(CandidateSet::empty());
                }

                if best
                    .as_ref()
                    .is_none_or(|b| hits.len() < b.positions.len())
                {
                    let mut positions = hits
                        .iter()
                        .map(|&p| p.saturating_sub(max_offset))
                        .collect::<Vec<_>>();
                    positions.dedup();

                    best = Some(CandidateSet {
                        positions,
                        slack: max_offset - min_offset,
                    });
                }
            }

            if let Some(gap) = pattern.gaps().get(j) {
                let len = sub.len() as u64;
                min_offset = min_offset.saturating_add(len).saturating_add(gap.min);
                max_offset = max_offset.saturating_add(len).saturating_add(gap.max);
            }
        }

        best
    }
}

impl Encode for QGramIndex {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u8(self.q)?;
        writer.write_u64::<BigEndian>(self.map.len() as u64)?;

        // Ascending id order for byte-exact save/load
        let mut entries = self.map.iter().collect::<Vec<_>>();
        entries.sort_unstable();

        for (id, offset) in entries {
            writer.write_u64_varint(*id)?;
            writer.write_u64_varint(*offset)?;
        }

        writer.write_u64::<BigEndian>(self.blob_bits)?;
        for word in &self.blob {
            writer.write_u64::<BigEndian>(*word)?;
        }

        Ok(())
    }
}

impl Decode for QGramIndex {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let q = reader.read_u8()?;

        if !(1..=8).contains(&q) {
            return Err(DecodeError::InvalidHeader("QGramIndex"));
        }

        let count = reader.read_u64::<BigEndian>()? as usize;
        let mut map = FxHashMap::with_capacity_and_hasher(count, rustc_hash::FxBuildHasher);

        for _ in 0..count {
            let id = reader.read_u64_varint()?;
            let offset = reader.read_u64_varint()?;
            map.insert(id, offset);
        }

        let blob_bits = reader.read_u64::<BigEndian>()?;
        let word_count = blob_bits.div_ceil(64) as usize;

        let mut blob = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            blob.push(reader.read_u64::<BigEndian>()?);
        }

        Ok(Self {
            q,
            map,
            blob,
            blob_bits,
        })
    }
}

/// Verifies candidate windows with the full pattern regex.
///
/// Reproduces exactly what a whole-text scan would emit: matches are
/// accepted in ascending order, each window is entered at the end of the
/// previous accepted match, and a match starting beyond a candidate's
/// slack is left to the window of a later candidate.
pub fn verify_candidates(
    text: &[u8],
    pattern: &Pattern,
    candidates: &CandidateSet,
) -> crate::Result<Vec<u64>> {
    let regex = pattern.to_byte_regex()?;
    let window_len = pattern.max_window_len();
    let n = text.len() as u64;

    let mut out = vec![];
    let mut scan_from = 0u64;

    for &p in &candidates.positions {
        // Candidate offset arithmetic wraps around on adversarial
        // patterns; such candidates cannot start a match
        if p >= n {
            continue;
        }

        let accept_end = p.saturating_add(candidates.slack);

        let lo = p.max(scan_from);
        let hi = accept_end.saturating_add(window_len).min(n);

        if lo >= hi {
            continue;
        }

        let window = text.get(lo as usize..hi as usize).unwrap_or_default();

        for hit in regex.find_iter(window) {
            let start = lo + hit.start() as u64;

            if start > accept_end {
                break;
            }

            out.push(start);
            scan_from = lo + hit.end() as u64;
        }
    }

    Ok(out)
}

/// Whole-text regex scan, the fallback when no sub-pattern reaches `q`.
pub fn scan_text(text: &[u8], pattern: &Pattern) -> crate::Result<Vec<u64>> {
    let regex = pattern.to_byte_regex()?;

    Ok(regex
        .find_iter(text)
        .map(|hit| hit.start() as u64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ParseMode;
    use test_log::test;

    fn byte_vec(text: &[u8]) -> IntVec {
        IntVec::from_slice(&text.iter().map(|&b| u64::from(b)).collect::<Vec<_>>())
    }

    #[test]
    fn qgram_build_counts() {
        let text = byte_vec(b"abcabc");
        let index = QGramIndex::build(&text, 3).expect("should build");

        // abc, bca, cab, abc -> 3 distinct
        assert_eq!(3, index.distinct());
        assert_eq!(3, index.q());
    }

    #[test]
    fn qgram_build_short_text() {
        let text = byte_vec(b"ab");
        let index = QGramIndex::build(&text, 3).expect("should build");
        assert_eq!(0, index.distinct());
    }

    #[test]
    fn qgram_rejects_bad_parameters() {
        let text = byte_vec(b"abc");
        assert!(QGramIndex::build(&text, 0).is_err());
        assert!(QGramIndex::build(&text, 9).is_err());

        let wide = IntVec::from_slice(&[1000, 2000]);
        assert!(QGramIndex::build(&wide, 3).is_err());
    }

    #[test]
    fn qgram_candidates_exact_for_first_subpattern() {
        let text = byte_vec(b"yyaxxabcyyabc");
        let index = QGramIndex::build(&text, 3).expect("should build");

        // "yya" is rarer than "abc", so the first sub-pattern wins and
        // its candidates are exact start offsets
        let pattern = Pattern::parse("yya.{0,4}abc", ParseMode::Bytes).expect("should parse");
        let set = index.candidates(&pattern).expect("should filter");

        assert_eq!(vec![0, 8], set.positions);
        assert_eq!(0, set.slack);
    }

    #[test]
    fn qgram_candidates_cover_true_matches() {
        let text = byte_vec(b"abcxxabcyyabc");
        let index = QGramIndex::build(&text, 3).expect("should build");

        // The rarer second sub-pattern is chosen; its candidates carry a
        // start offset slack, but still cover the true match at 5
        let pattern = Pattern::parse("abc.{0,2}yya", ParseMode::Bytes).expect("should parse");
        let set = index.candidates(&pattern).expect("should filter");

        assert!(set
            .positions
            .iter()
            .any(|&p| p <= 5 && 5 <= p.saturating_add(set.slack)));
    }

    #[test]
    fn qgram_missing_gram_short_circuits() {
        let text = byte_vec(b"abcabcabc");
        let index = QGramIndex::build(&text, 3).expect("should build");

        let pattern = Pattern::parse("abc.{0,2}zzz", ParseMode::Bytes).expect("should parse");
        let set = index.candidates(&pattern).expect("should filter");

        assert!(set.positions.is_empty());
    }

    #[test]
    fn qgram_short_subpatterns_are_unfiltered() {
        let text = byte_vec(b"abcabcabc");
        let index = QGramIndex::build(&text, 3).expect("should build");

        let pattern = Pattern::parse("ab.{0,2}bc", ParseMode::Bytes).expect("should parse");
        assert!(index.candidates(&pattern).is_none());
    }

    #[test]
    fn qgram_verify_equals_scan() {
        let text = b"abcxbcdxxabcybcdabc";
        let index = QGramIndex::build(&byte_vec(text), 3).expect("should build");

        let pattern = Pattern::parse("abc.{0,5}bcd", ParseMode::Bytes).expect("should parse");
        let set = index.candidates(&pattern).expect("should filter");

        let verified = verify_candidates(text, &pattern, &set).expect("should verify");
        let scanned = scan_text(text, &pattern).expect("should scan");

        assert_eq!(scanned, verified);
        assert!(!verified.is_empty());
    }

    #[test]
    fn qgram_roundtrip_is_byte_exact() {
        let text = byte_vec(b"the quick brown fox jumps over the lazy dog");
        let index = QGramIndex::build(&text, 3).expect("should build");

        let bytes = index.encode_into_vec();
        let decoded = QGramIndex::decode_from(&mut &bytes[..]).expect("should decode");

        assert_eq!(index, decoded);
        assert_eq!(bytes, decoded.encode_into_vec());
    }
}
