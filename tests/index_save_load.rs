// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use gap_match::{Collection, Config, GappedIndex, ParseMode, Pattern, Strategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_log::test;

fn random_text(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let alphabet = b"abcdefgh\n";
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

#[test]
fn save_load_is_byte_exact() -> gap_match::Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let text = random_text(&mut rng, 64 * 1024);

    let index = Config::new()
        .delimiter(u64::from(b'\n'))
        .qgram_filter(3)
        .build_from_bytes(&text)?;

    let mut bytes = vec![];
    index.save_into(&mut bytes)?;

    let loaded = GappedIndex::load_from(&mut &bytes[..])?;
    assert_eq!(index, loaded);

    // Re-serializing the loaded instance reproduces the stream exactly
    let mut again = vec![];
    loaded.save_into(&mut again)?;
    assert_eq!(bytes, again);

    Ok(())
}

#[test]
fn save_load_preserves_query_results() -> gap_match::Result<()> {
    let mut rng = StdRng::seed_from_u64(0xACE);
    let text = random_text(&mut rng, 16 * 1024);

    let index = Config::new()
        .delimiter(u64::from(b'\n'))
        .qgram_filter(3)
        .build_from_bytes(&text)?;

    let mut bytes = vec![];
    index.save_into(&mut bytes)?;
    let loaded = GappedIndex::load_from(&mut &bytes[..])?;

    let patterns = [
        "ab.{0,5}cd",
        "abc.*cba",
        "a.{1,3}b.{1,3}c",
        "ef.{0,10}gh",
        "fff.{2,8}aaa",
    ];

    for raw in patterns {
        let pattern = Pattern::parse(raw, ParseMode::Bytes)?;

        for strategy in [Strategy::SaSearch, Strategy::WcSearch, Strategy::QGram] {
            let before = index.search_with(&pattern, strategy)?;
            let after = loaded.search_with(&pattern, strategy)?;

            assert_eq!(
                before.positions, after.positions,
                "{strategy:?} differs after reload for {raw:?}"
            );
        }
    }

    Ok(())
}

#[test]
fn collection_round_trips_through_disk() -> gap_match::Result<()> {
    let mut rng = StdRng::seed_from_u64(0xD15C);
    let text = random_text(&mut rng, 8 * 1024);

    let dir = tempfile::tempdir()?;
    let collection = Collection::create(dir.path().join("col"), &text)?;

    let packed = collection.load_text()?;
    let index = Config::new().qgram_filter(3).build(packed)?;
    collection.store_index("bench", &index)?;

    let reopened = Collection::open(collection.path())?;
    let loaded = reopened.load_index("bench")?.expect("index was cached");

    assert_eq!(index, loaded);

    let pattern = Pattern::parse("abc.{0,4}def", ParseMode::Bytes)?;
    let before = index.search(&pattern)?;
    let after = loaded.search(&pattern)?;
    assert_eq!(before.positions, after.positions);

    Ok(())
}
