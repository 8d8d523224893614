// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Gapped pattern matching over a suffix array and wavelet tree self-index.
//!
//! ##### About
//!
//! A gapped pattern is a sequence of literal sub-patterns interleaved with
//! bounded wildcards, e.g. `s0 .{2,10} s1`. This crate indexes an immutable
//! text over an integer alphabet once and then enumerates every occurrence
//! of such patterns, using one of three strategies:
//!
//! - `SA-SEARCH` materializes the sorted text positions of each sub-pattern
//!   and merges them under the gap constraints.
//! - `WC-SEARCH` runs a cascaded depth-first search over a wavelet tree of
//!   the suffix array, pruning whole subtrees by gap and document bounds.
//! - `QGRAM` intersects q-gram position lists into a small candidate set
//!   and verifies candidates with a regex, inside narrow windows only.
//!
//! Matches are reported as start positions, ascending and non-overlapping:
//! per start, later sub-patterns are placed as far right as the gap bounds
//! allow, and the next match begins after the previous one ends.
//!
//! # Example usage
//!
//! ```
//! use gap_match::{Config, ParseMode, Pattern};
//!
//! // Index once, query many times
//! let index = Config::new().build_from_bytes(b"abracadabra")?;
//!
//! // "a", no gap, then "b"
//! let pattern = Pattern::parse("a.{0,0}b", ParseMode::Bytes)?;
//!
//! let result = index.search(&pattern)?;
//! assert_eq!(vec![0, 7], result.positions);
//! #
//! # Ok::<(), gap_match::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::cargo)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

mod binary_search;
mod checksum;

pub mod coding;

mod collection;
mod config;
mod error;
mod format_version;
mod index;
mod lex_range;

#[doc(hidden)]
pub mod node_cache;

mod pattern;

pub mod qgram;

mod query;

#[doc(hidden)]
pub mod sa_search;

mod stats;

#[doc(hidden)]
pub mod succinct;

mod suffix_array;

#[doc(hidden)]
pub mod walker;

#[doc(hidden)]
pub mod wavelet;

pub mod wildcard;

pub use {
    checksum::Checksum,
    collection::{Collection, TEXT_FILE},
    config::Config,
    error::{Error, Result},
    format_version::FormatVersion,
    index::MatchingIndex,
    lex_range::LexRange,
    pattern::{parse_pattern_file, Gap, ParseMode, Pattern, PatternError},
    qgram::QGramIndex,
    query::{GappedIndex, SearchResult, Strategy},
    stats::QueryStats,
    succinct::IntVec,
};
