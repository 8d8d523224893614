// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::query::Strategy;

/// Counters collected while answering one query
///
/// Purely informational; a fresh struct is produced per query so shared
/// indices stay free of global state.
#[derive(Copy, Clone, Debug, Default)]
pub struct QueryStats {
    /// Strategy that actually ran
    pub strategy: Strategy,

    /// Sum of the sub-patterns' suffix array range sizes
    ///
    /// A cheap estimate of the number of potential matches; the automatic
    /// strategy choice is based on it.
    pub lex_range_total: u64,

    /// Wavelet tree nodes expanded during DFS walks
    pub wt_nodes_expanded: u64,

    /// Candidate offsets handed to the verification regex
    pub candidates_checked: u64,
}
