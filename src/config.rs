// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::query::GappedIndex;
use crate::succinct::IntVec;

/// Index configuration builder
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    /// Document delimiter symbol, e.g. `\n`
    pub delimiter: Option<u64>,

    /// q-gram length of the filter index, disabled when `None`
    pub qgram: Option<u8>,
}

impl Config {
    /// Default configuration: no document boundaries, no q-gram filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats the given symbol as a document delimiter.
    ///
    /// The DFS search then refuses to match across delimiters.
    #[must_use]
    pub fn delimiter(mut self, symbol: u64) -> Self {
        self.delimiter = Some(symbol);
        self
    }

    /// Builds a q-gram filter index alongside (q in 1..=8).
    ///
    /// Only available for byte-width texts.
    #[must_use]
    pub fn qgram_filter(mut self, q: u8) -> Self {
        self.qgram = Some(q);
        self
    }

    /// Builds the index over a bit-packed text.
    pub fn build(self, text: IntVec) -> crate::Result<GappedIndex> {
        GappedIndex::build(text, &self)
    }

    /// Builds the index over a byte text.
    pub fn build_from_bytes(self, text: &[u8]) -> crate::Result<GappedIndex> {
        let packed = IntVec::from_slice(&text.iter().map(|&b| u64::from(b)).collect::<Vec<_>>());
        self.build(packed)
    }
}
