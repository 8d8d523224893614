// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::succinct::IntVec;

/// Builds the suffix array of the text, including the empty suffix.
///
/// Returns a bit-packed permutation of `0..=n` where entry 0 is always `n`
/// (the empty suffix sorts before everything else). Prefix doubling,
/// O(n log² n) - construction runs once per collection, queries do not
/// touch this code.
#[must_use]
pub fn build(text: &IntVec) -> IntVec {
    let n = text.len() as usize;

    // Dense initial ranks; rank 0 is reserved for the empty suffix
    let mut symbols = text.iter().collect::<Vec<_>>();
    symbols.sort_unstable();
    symbols.dedup();

    let mut rank = Vec::with_capacity(n + 1);
    for sym in text.iter() {
        let dense = symbols.partition_point(|&x| x < sym) as u64;
        rank.push(dense + 1);
    }
    rank.push(0);

    let mut sa = (0..=n).collect::<Vec<_>>();
    let mut key = vec![(0u64, 0u64); n + 1];
    let mut tmp = vec![0u64; n + 1];

    let mut k = 1usize;
    loop {
        for i in 0..=n {
            let head = *rank.get(i).expect("should exist");
            let tail = rank.get(i + k).map(|r| r + 1).unwrap_or_default();
            *key.get_mut(i).expect("should exist") = (head, tail);
        }

        sa.sort_unstable_by_key(|&i| *key.get(i).expect("should exist"));

        let mut prev_key = *key.get(*sa.first().expect("should exist")).expect("should exist");
        let mut next_rank = 0u64;

        for &suffix in &sa {
            let this_key = *key.get(suffix).expect("should exist");
            if this_key != prev_key {
                next_rank += 1;
                prev_key = this_key;
            }
            *tmp.get_mut(suffix).expect("should exist") = next_rank;
        }

        std::mem::swap(&mut rank, &mut tmp);

        if next_rank as usize == n || k >= n.max(1) {
            break;
        }

        k *= 2;
    }

    IntVec::from_slice(&sa.iter().map(|&i| i as u64).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn naive_suffix_array(text: &[u64]) -> Vec<u64> {
        let n = text.len();
        let mut sa = (0..=n).collect::<Vec<_>>();
        sa.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
        sa.iter().map(|&i| i as u64).collect()
    }

    fn from_bytes(text: &[u8]) -> IntVec {
        IntVec::from_slice(&text.iter().map(|&b| u64::from(b)).collect::<Vec<_>>())
    }

    #[test]
    fn suffix_array_banana() {
        let text = from_bytes(b"banana");
        let sa = build(&text);

        // "", "a", "ana", "anana", "banana", "na", "nana"
        assert_eq!(vec![6, 5, 3, 1, 0, 4, 2], sa.iter().collect::<Vec<_>>());
    }

    #[test]
    fn suffix_array_empty_text() {
        let text = IntVec::new(1);
        let sa = build(&text);
        assert_eq!(vec![0], sa.iter().collect::<Vec<_>>());
    }

    #[test]
    fn suffix_array_single_symbol() {
        let text = from_bytes(b"aaaa");
        let sa = build(&text);
        assert_eq!(vec![4, 3, 2, 1, 0], sa.iter().collect::<Vec<_>>());
    }

    #[test]
    fn suffix_array_matches_naive() {
        let texts: &[&[u8]] = &[
            b"abracadabra",
            b"mississippi",
            b"abcabcabcabc",
            b"zyxwvu",
            b"aabbaabbaa",
        ];

        for text in texts {
            let packed = from_bytes(text);
            let expected = naive_suffix_array(&text.iter().map(|&b| u64::from(b)).collect::<Vec<_>>());
            assert_eq!(
                expected,
                build(&packed).iter().collect::<Vec<_>>(),
                "text {:?}",
                String::from_utf8_lossy(text)
            );
        }
    }

    #[test]
    fn suffix_array_wide_alphabet() {
        let symbols = vec![1_000_000u64, 3, 99, 1_000_000, 0, 42];
        let packed = IntVec::from_slice(&symbols);
        let expected = naive_suffix_array(&symbols);
        assert_eq!(expected, build(&packed).iter().collect::<Vec<_>>());
    }
}
