// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Sorted-position merging over materialized suffix array ranges
//!
//! When the lex-ranges are small enough to materialize, a plain merge
//! over the sorted text positions beats the wavelet tree walk. The merge
//! rules mirror the DFS iterators exactly: greedy-lazy extension, a later
//! middle position is only committed once a compatible tail position is
//! confirmed, and the head is pulled past the emitted tail so matches
//! never overlap.

use crate::index::MatchingIndex;

/// All start positions of a single literal, ascending.
#[must_use]
pub fn occurrences(index: &MatchingIndex, pattern: &[u64]) -> Vec<u64> {
    if pattern.is_empty() {
        return vec![];
    }

    let Some(range) = index.forward_search(index.full_range(), pattern) else {
        return vec![];
    };

    let mut positions = (range.sp..=range.ep)
        .map(|i| index.sa_value(i))
        .collect::<Vec<_>>();
    positions.sort_unstable();
    positions
}

/// Two-term merge; gap bounds are start-to-start distances.
#[must_use]
pub fn search_two(
    index: &MatchingIndex,
    s0: &[u64],
    s1: &[u64],
    min_gap: u64,
    max_gap: u64,
) -> Vec<u64> {
    let ra = occurrences(index, s0);
    let rb = occurrences(index, s1);

    let mut out = vec![];
    let mut ia = 0usize;
    let mut ib = 0usize;

    while let Some(&a) = ra.get(ia) {
        // Enforce the minimum gap
        let floor = a.saturating_add(min_gap);
        while rb.get(ib).is_some_and(|&b| b < floor) {
            ib += 1;
        }
        let Some(&first) = rb.get(ib) else {
            break;
        };

        // Check the maximum gap
        if a.saturating_add(max_gap) < first {
            ia += 1;
            continue;
        }

        // Greedy push b to the latest admissible position
        let mut b = first;
        ib += 1;
        while rb.get(ib).is_some_and(|&v| v <= a.saturating_add(max_gap)) {
            b = *rb.get(ib).expect("checked above");
            ib += 1;
        }

        out.push(a);

        // Pull a past the emitted tail (non-overlapping)
        let limit = b.saturating_add(s1.len() as u64);
        while ra.get(ia).is_some_and(|&v| v < limit) {
            ia += 1;
        }
    }

    out
}

/// Three-term merge; both gap windows are start-to-start distances.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn search_three(
    index: &MatchingIndex,
    s0: &[u64],
    s1: &[u64],
    s2: &[u64],
    min_ab: u64,
    max_ab: u64,
    min_bc: u64,
    max_bc: u64,
) -> Vec<u64> {
    let ra = occurrences(index, s0);
    let rb = occurrences(index, s1);
    let rc = occurrences(index, s2);

    let mut out = vec![];
    let mut ia = 0usize;
    let mut ib = 0usize;
    let mut ic = 0usize;

    while let Some(&a) = ra.get(ia) {
        // Enforce min gap a-b
        let b_floor = a.saturating_add(min_ab);
        while rb.get(ib).is_some_and(|&v| v < b_floor) {
            ib += 1;
        }
        let Some(&b_first) = rb.get(ib) else {
            break;
        };

        if a.saturating_add(max_ab) < b_first {
            ia += 1;
            continue;
        }
        let mut b = b_first;

        // Enforce min gap b-c
        let c_floor = b.saturating_add(min_bc);
        while rc.get(ic).is_some_and(|&v| v < c_floor) {
            ic += 1;
        }
        let Some(&c_first) = rc.get(ic) else {
            break;
        };

        if b.saturating_add(max_bc) < c_first {
            // This b cannot reach any remaining c, try the next one
            ib += 1;
            continue;
        }
        let mut c = c_first;

        // Valid but lazy (a, b, c); push c greedily first
        ic += 1;
        while rc.get(ic).is_some_and(|&v| v <= b.saturating_add(max_bc)) {
            c = *rc.get(ic).expect("checked above");
            ic += 1;
        }

        // Push b greedily; commit a later b only once a compatible c is
        // confirmed, so a failed push keeps the previous valid pair
        ib += 1;
        while rb.get(ib).is_some_and(|&v| v <= a.saturating_add(max_ab)) {
            let b_temp = *rb.get(ib).expect("checked above");
            let floor = b_temp.saturating_add(min_bc);

            if floor <= c {
                b = b_temp;
            }

            while rc.get(ic).is_some_and(|&v| v <= b_temp.saturating_add(max_bc)) {
                let v = *rc.get(ic).expect("checked above");
                ic += 1;

                if v >= floor {
                    b = b_temp;
                    c = v;
                }
            }

            ib += 1;
        }

        debug_assert!(b >= a.saturating_add(min_ab) && b <= a.saturating_add(max_ab));
        debug_assert!(c >= b.saturating_add(min_bc) && c <= b.saturating_add(max_bc));

        out.push(a);

        // Pull a past the emitted tail (non-overlapping)
        let limit = c.saturating_add(s2.len() as u64);
        while ra.get(ia).is_some_and(|&v| v < limit) {
            ia += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::succinct::IntVec;
    use test_log::test;

    fn byte_index(text: &[u8]) -> MatchingIndex {
        let packed = IntVec::from_slice(&text.iter().map(|&b| u64::from(b)).collect::<Vec<_>>());
        MatchingIndex::build(packed, None)
    }

    fn syms(s: &[u8]) -> Vec<u64> {
        s.iter().map(|&b| u64::from(b)).collect()
    }

    #[test]
    fn occurrences_includes_overlaps() {
        let index = byte_index(b"aaaa");
        assert_eq!(vec![0, 1, 2], occurrences(&index, &syms(b"aa")));
    }

    #[test]
    fn occurrences_missing() {
        let index = byte_index(b"aaaa");
        assert!(occurrences(&index, &syms(b"b")).is_empty());
        assert!(occurrences(&index, &syms(b"aaaaa")).is_empty());
    }

    #[test]
    fn two_term_merge_basic() {
        let index = byte_index(b"abracadabra");
        assert_eq!(
            vec![0, 7],
            search_two(&index, &syms(b"a"), &syms(b"b"), 1, 1)
        );
    }

    #[test]
    fn two_term_merge_greedy_non_overlap() {
        let index = byte_index(b"aab");
        assert_eq!(vec![0], search_two(&index, &syms(b"a"), &syms(b"b"), 1, 2));
    }

    #[test]
    fn three_term_merge_greedy_commit() {
        let index = byte_index(b"abbc");
        assert_eq!(
            vec![0],
            search_three(&index, &syms(b"a"), &syms(b"b"), &syms(b"c"), 1, 3, 1, 2)
        );
    }

    #[test]
    fn three_term_merge_exhausted_lists() {
        let index = byte_index(b"abc");
        assert!(search_three(&index, &syms(b"a"), &syms(b"x"), &syms(b"c"), 1, 3, 1, 3).is_empty());
    }
}
