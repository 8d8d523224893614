// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use gap_match::{Config, ParseMode, Pattern, Strategy};
use test_log::test;

#[test]
fn mandatory_gap_excludes_wrong_distances() -> gap_match::Result<()> {
    let index = Config::new().build_from_bytes(b"aXb aXXb aXXXb")?;

    // One or two symbols between "a" and "b": only the first two
    // instances qualify
    let pattern = Pattern::parse("a.{1,2}b", ParseMode::Bytes)?;

    for strategy in [Strategy::Auto, Strategy::SaSearch, Strategy::WcSearch] {
        let result = index.search_with(&pattern, strategy)?;
        assert_eq!(vec![0, 4], result.positions, "{strategy:?}");
    }

    Ok(())
}

#[test]
fn minimum_gap_skips_adjacent() -> gap_match::Result<()> {
    let index = Config::new().build_from_bytes(b"ab aXb")?;
    let pattern = Pattern::parse("a.{1,5}b", ParseMode::Bytes)?;

    let result = index.search(&pattern)?;

    // "ab" at 0 has gap zero and is rejected; "a" at 0 instead matches
    // the later "b", which overlaps and shadows the aXb instance
    assert_eq!(vec![0], result.positions);

    Ok(())
}
