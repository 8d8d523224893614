// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use gap_match::wildcard::WildcardMatchIter3;
use gap_match::{Config, ParseMode, Pattern, Strategy};
use test_log::test;

#[test]
fn three_term_two_blocks() -> gap_match::Result<()> {
    let index = Config::new().build_from_bytes(b"ax1by2cz ax3by4cz")?;
    let pattern = Pattern::parse("a.{0,4}b.{0,4}c", ParseMode::Bytes)?;

    for strategy in [Strategy::Auto, Strategy::SaSearch, Strategy::WcSearch] {
        let result = index.search_with(&pattern, strategy)?;
        assert_eq!(vec![0, 9], result.positions, "{strategy:?}");
    }

    Ok(())
}

#[test]
fn three_term_greedy_picks_latest_b_and_c() -> gap_match::Result<()> {
    // For a=0, both b=2 and c=6 can be pushed beyond the lazy b=1, c=3
    let text = b"abbccbc";
    let index = Config::new().build_from_bytes(text)?;

    let s = |b: u8| vec![u64::from(b)];

    let tuples = WildcardMatchIter3::new(
        index.index(),
        &s(b'a'),
        &s(b'b'),
        &s(b'c'),
        1, // min a-b (start-to-start)
        4, // max a-b
        1, // min b-c
        4, // max b-c
    )
    .collect::<Vec<_>>();

    // b pushed to 2, then c pushed to 6 (within 2+4); b=5 would lose c
    assert_eq!(vec![(0, 2, 6)], tuples);

    Ok(())
}

#[test]
fn three_term_non_overlap_is_enforced() -> gap_match::Result<()> {
    let index = Config::new().build_from_bytes(b"abcabcabc")?;
    let pattern = Pattern::parse("a.{0,0}b.{0,0}c", ParseMode::Bytes)?;

    let result = index.search(&pattern)?;
    assert_eq!(vec![0, 3, 6], result.positions);

    Ok(())
}
