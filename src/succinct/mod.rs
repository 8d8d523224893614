// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Bit-packed containers backing the self-index
//!
//! All containers are immutable after construction and (de)serialize
//! byte-exactly through [`crate::coding::Encode`] and [`crate::coding::Decode`].

pub mod bit_stream;
pub mod bit_vec;
pub mod elias_fano;
pub mod int_vec;

pub use bit_vec::{BitVec, RankBitVec};
pub use int_vec::IntVec;
