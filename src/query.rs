// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::checksum::{Checksum, ChecksummedReader, ChecksummedWriter};
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::config::Config;
use crate::format_version::FormatVersion;
use crate::index::MatchingIndex;
use crate::pattern::Pattern;
use crate::qgram::{self, QGramIndex};
use crate::sa_search;
use crate::stats::QueryStats;
use crate::succinct::IntVec;
use crate::wildcard::{WildcardMatchIter2, WildcardMatchIter3};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use enum_dispatch::enum_dispatch;
use std::io::{Read, Write};

/// Search strategy selection
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Strategy {
    /// Cost-based choice between the other strategies
    #[default]
    Auto,

    /// Materialize and merge sorted suffix array ranges
    SaSearch,

    /// Cascaded DFS over the suffix array wavelet tree
    WcSearch,

    /// q-gram filtering plus regex verification
    QGram,
}

/// Positions and counters produced by one query
#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    /// Match start positions, ascending and non-overlapping
    pub positions: Vec<u64>,

    /// Per-query counters
    pub stats: QueryStats,
}

#[enum_dispatch]
trait SearchEngine {
    fn run(
        &self,
        index: &MatchingIndex,
        qgrams: Option<&QGramIndex>,
        pattern: &Pattern,
    ) -> crate::Result<SearchResult>;
}

struct SaEngine;

impl SearchEngine for SaEngine {
    fn run(
        &self,
        index: &MatchingIndex,
        _qgrams: Option<&QGramIndex>,
        pattern: &Pattern,
    ) -> crate::Result<SearchResult> {
        let subs = pattern.subpatterns();
        let gaps = pattern.start_to_start_gaps();

        let positions = match subs {
            [s0] => sa_search::occurrences(index, s0),
            [s0, s1] => {
                let gap = gaps.first().expect("one gap for two terms");
                sa_search::search_two(index, s0, s1, gap.min, gap.max)
            }
            [s0, s1, s2] => {
                let (ab, bc) = (
                    gaps.first().expect("two gaps for three terms"),
                    gaps.get(1).expect("two gaps for three terms"),
                );
                sa_search::search_three(index, s0, s1, s2, ab.min, ab.max, bc.min, bc.max)
            }
            _ => {
                return Err(crate::Error::Unsupported(
                    "suffix array merge supports at most three terms",
                ))
            }
        };

        Ok(SearchResult {
            positions,
            stats: QueryStats {
                strategy: Strategy::SaSearch,
                ..Default::default()
            },
        })
    }
}

struct WcEngine;

impl SearchEngine for WcEngine {
    fn run(
        &self,
        index: &MatchingIndex,
        _qgrams: Option<&QGramIndex>,
        pattern: &Pattern,
    ) -> crate::Result<SearchResult> {
        let subs = pattern.subpatterns();
        let gaps = pattern.start_to_start_gaps();

        let mut stats = QueryStats {
            strategy: Strategy::WcSearch,
            ..Default::default()
        };

        let positions = match subs {
            // Degenerate single-literal query
            [s0] => sa_search::occurrences(index, s0),
            [s0, s1] => {
                let gap = gaps.first().expect("one gap for two terms");
                let mut iter = WildcardMatchIter2::new(index, s0, s1, gap.min, gap.max);
                let positions = iter.by_ref().map(|(a, _)| a).collect();
                stats.wt_nodes_expanded = iter.nodes_expanded();
                positions
            }
            [s0, s1, s2] => {
                let (ab, bc) = (
                    gaps.first().expect("two gaps for three terms"),
                    gaps.get(1).expect("two gaps for three terms"),
                );
                let mut iter =
                    WildcardMatchIter3::new(index, s0, s1, s2, ab.min, ab.max, bc.min, bc.max);
                let positions = iter.by_ref().map(|(a, _, _)| a).collect();
                stats.wt_nodes_expanded = iter.nodes_expanded();
                positions
            }
            _ => {
                return Err(crate::Error::Unsupported(
                    "wavelet tree search supports at most three terms",
                ))
            }
        };

        Ok(SearchResult { positions, stats })
    }
}

struct QGramEngine;

impl SearchEngine for QGramEngine {
    fn run(
        &self,
        index: &MatchingIndex,
        qgrams: Option<&QGramIndex>,
        pattern: &Pattern,
    ) -> crate::Result<SearchResult> {
        let Some(qgrams) = qgrams else {
            return Err(crate::Error::Unsupported("no q-gram filter was built"));
        };

        if index.text().width() > 8 {
            return Err(crate::Error::Unsupported(
                "q-gram search requires byte symbols",
            ));
        }

        let text = index.text().iter().map(|sym| sym as u8).collect::<Vec<_>>();

        let mut stats = QueryStats {
            strategy: Strategy::QGram,
            ..Default::default()
        };

        let positions = match qgrams.candidates(pattern) {
            // No sub-pattern reaches q, scan the whole text
            None => qgram::scan_text(&text, pattern)?,
            Some(set) => {
                stats.candidates_checked = set.positions.len() as u64;
                if set.positions.is_empty() {
                    vec![]
                } else {
                    qgram::verify_candidates(&text, pattern, &set)?
                }
            }
        };

        Ok(SearchResult { positions, stats })
    }
}

#[enum_dispatch(SearchEngine)]
enum AnyEngine {
    Sa(SaEngine),
    Wc(WcEngine),
    QGram(QGramEngine),
}

/// A searchable gapped-matching index
///
/// Combines the succinct self-index with an optional q-gram filter and
/// picks a strategy per query. Immutable after construction; queries only
/// need `&self`.
#[derive(Debug, Eq, PartialEq)]
pub struct GappedIndex {
    index: MatchingIndex,
    qgrams: Option<QGramIndex>,
}

impl GappedIndex {
    pub(crate) fn build(text: IntVec, config: &Config) -> crate::Result<Self> {
        let qgrams = config
            .qgram
            .map(|q| QGramIndex::build(&text, q))
            .transpose()?;

        let index = MatchingIndex::build(text, config.delimiter);

        Ok(Self { index, qgrams })
    }

    /// The underlying self-index
    #[must_use]
    pub fn index(&self) -> &MatchingIndex {
        &self.index
    }

    /// The q-gram filter, if one was built
    #[must_use]
    pub fn qgrams(&self) -> Option<&QGramIndex> {
        self.qgrams.as_ref()
    }

    /// Sum of the sub-patterns' lex-range sizes
    fn lex_range_total(&self, pattern: &Pattern) -> u64 {
        pattern
            .subpatterns()
            .iter()
            .filter_map(|sub| self.index.forward_search(self.index.full_range(), sub))
            .fold(0u64, |acc, range| acc.saturating_add(range.len()))
    }

    fn pick_engine(&self, pattern: &Pattern, total: u64) -> crate::Result<AnyEngine> {
        let terms = pattern.term_count();

        let qgram_usable = self.qgrams.is_some()
            && self.index.text().width() <= 8
            && pattern.is_byte_pattern();

        if terms > 3 {
            return if qgram_usable {
                Ok(AnyEngine::QGram(QGramEngine))
            } else {
                Err(crate::Error::Unsupported(
                    "patterns with more than three terms need the q-gram filter",
                ))
            };
        }

        if terms == 1 {
            return Ok(AnyEngine::Sa(SaEngine));
        }

        let n = self.index.size();
        let log_n = u64::from(u64::BITS - n.leading_zeros()).max(1);

        // Wide lex-ranges make position list materialization and the
        // DFS walk expensive; a filtered linear scan wins there
        if total.saturating_mul(log_n) > n {
            if qgram_usable {
                return Ok(AnyEngine::QGram(QGramEngine));
            }
            return Ok(AnyEngine::Wc(WcEngine));
        }

        Ok(AnyEngine::Sa(SaEngine))
    }

    /// Searches with the automatic strategy choice.
    pub fn search(&self, pattern: &Pattern) -> crate::Result<SearchResult> {
        self.search_with(pattern, Strategy::Auto)
    }

    /// Searches with an explicit strategy.
    pub fn search_with(
        &self,
        pattern: &Pattern,
        strategy: Strategy,
    ) -> crate::Result<SearchResult> {
        let total = self.lex_range_total(pattern);

        let engine = match strategy {
            Strategy::Auto => self.pick_engine(pattern, total)?,
            Strategy::SaSearch => AnyEngine::Sa(SaEngine),
            Strategy::WcSearch => AnyEngine::Wc(WcEngine),
            Strategy::QGram => AnyEngine::QGram(QGramEngine),
        };

        let mut result = engine.run(&self.index, self.qgrams.as_ref(), pattern)?;
        result.stats.lex_range_total = total;

        log::trace!(
            "query {:?}: {} positions via {:?}",
            pattern.raw(),
            result.positions.len(),
            result.stats.strategy,
        );

        Ok(result)
    }

    /// Serializes the index into a writer, with header and checksum.
    pub fn save_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        FormatVersion::V1.write_file_header(writer)?;

        let mut writer = ChecksummedWriter::new(writer);
        self.encode_into(&mut writer)?;

        let checksum = writer.checksum();
        writer
            .inner_mut()
            .write_u128::<BigEndian>(checksum.into_u128())
            .map_err(EncodeError::from)?;

        Ok(())
    }

    /// Loads an index previously written by [`GappedIndex::save_into`].
    pub fn load_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        FormatVersion::parse_file_header(reader)?;

        let mut reader = ChecksummedReader::new(reader);
        let item = Self::decode_from(&mut reader)?;

        let computed = reader.checksum();
        let stored = Checksum::from_raw(
            reader
                .inner_mut()
                .read_u128::<BigEndian>()
                .map_err(DecodeError::from)?,
        );

        computed.check(stored)?;

        Ok(item)
    }
}

impl Encode for GappedIndex {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.index.encode_into(writer)?;

        match &self.qgrams {
            Some(qgrams) => {
                writer.write_u8(1)?;
                qgrams.encode_into(writer)?;
            }
            None => writer.write_u8(0)?,
        }

        Ok(())
    }
}

impl Decode for GappedIndex {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let index = MatchingIndex::decode_from(reader)?;

        let qgrams = match reader.read_u8()? {
            0 => None,
            1 => Some(QGramIndex::decode_from(reader)?),
            tag => return Err(DecodeError::InvalidTag(("GappedIndex", tag))),
        };

        Ok(Self { index, qgrams })
    }
}
