// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The q-gram filter must never lose a true match: candidates are a
//! superset of the real start positions, verification trims them down to
//! exactly the reference result.

use gap_match::{Config, ParseMode, Pattern, Strategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_log::test;

fn reference_scan(text: &[u8], pattern: &str) -> Vec<u64> {
    let regex = regex::bytes::RegexBuilder::new(pattern)
        .unicode(false)
        .dot_matches_new_line(true)
        .build()
        .expect("reference pattern should compile");

    regex.find_iter(text).map(|m| m.start() as u64).collect()
}

fn random_text(rng: &mut StdRng, len: usize, alphabet: &[u8]) -> Vec<u8> {
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

#[test]
fn qgram_candidates_are_a_superset_of_matches() {
    let mut rng = StdRng::seed_from_u64(0xCAFE);

    // 10 KiB random text over a small alphabet, q = 3
    let text = random_text(&mut rng, 10 * 1024, b"abcd");
    let index = Config::new()
        .qgram_filter(3)
        .build_from_bytes(&text)
        .expect("index should build");

    let qgrams = index.qgrams().expect("filter was built");

    for raw in [
        "abc.{0,8}bcd",
        "aaa.{2,5}ddd",
        "abcd.{0,3}dcba",
        "cab.{1,9}abc.{1,9}bca",
    ] {
        let pattern = Pattern::parse(raw, ParseMode::Bytes).expect("pattern should parse");

        let expected = reference_scan(&text, raw);

        // Every true start must be covered by a candidate interval
        if let Some(set) = qgrams.candidates(&pattern) {
            for &start in &expected {
                assert!(
                    set.positions
                        .iter()
                        .any(|&p| p <= start && start <= p.saturating_add(set.slack)),
                    "candidate set misses start {start} for {raw:?}"
                );
            }
        }

        // After verification the result equals the reference
        let result = index
            .search_with(&pattern, Strategy::QGram)
            .expect("search should succeed");
        assert_eq!(expected, result.positions, "verification differs for {raw:?}");
    }
}

#[test]
fn qgram_prefers_the_rarest_subpattern() {
    let mut rng = StdRng::seed_from_u64(0xBEEF);

    let mut text = random_text(&mut rng, 4096, b"ab");
    // Plant a rare literal a few times
    for &at in &[100usize, 2000, 3000] {
        text[at..at + 3].copy_from_slice(b"zzz");
    }

    let index = Config::new()
        .qgram_filter(3)
        .build_from_bytes(&text)
        .expect("index should build");

    let pattern = Pattern::parse("aba.{0,5}zzz", ParseMode::Bytes).expect("pattern should parse");

    let set = index
        .qgrams()
        .expect("filter was built")
        .candidates(&pattern)
        .expect("should filter");

    // "zzz" occurs three times, "aba" is everywhere
    assert!(set.positions.len() <= 3);

    let expected = reference_scan(&text, "aba.{0,5}zzz");
    let result = index
        .search_with(&pattern, Strategy::QGram)
        .expect("search should succeed");
    assert_eq!(expected, result.positions);
}

#[test]
fn qgram_short_subpatterns_fall_back_to_scan() {
    let mut rng = StdRng::seed_from_u64(7);

    let text = random_text(&mut rng, 2048, b"abc");
    let index = Config::new()
        .qgram_filter(4)
        .build_from_bytes(&text)
        .expect("index should build");

    // Both literals are shorter than q = 4
    let raw = "ab.{0,4}ca";
    let pattern = Pattern::parse(raw, ParseMode::Bytes).expect("pattern should parse");

    assert!(index
        .qgrams()
        .expect("filter was built")
        .candidates(&pattern)
        .is_none());

    let result = index
        .search_with(&pattern, Strategy::QGram)
        .expect("search should succeed");
    assert_eq!(reference_scan(&text, raw), result.positions);
}
