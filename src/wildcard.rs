// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Cascaded DFS over the suffix array wavelet tree
//!
//! One walker per sub-pattern advances in lockstep under the gap
//! constraints. Leaves surface in ascending text position order, so the
//! walkers never move backwards; document and gap pruning discard whole
//! subtrees before they are expanded.

use crate::index::MatchingIndex;
use crate::node_cache::NodeArena;
use crate::walker::RangeWalker;
use crate::LexRange;

/// Advances a walker to its next leaf with value `<= bound`, consuming it.
///
/// Stops without consuming anything once the next leaf would exceed the
/// bound or leave the document, so no position is ever lost to a failed
/// probe.
fn next_leaf_at_most(
    walker: &mut RangeWalker,
    arena: &mut NodeArena,
    index: &MatchingIndex,
    bound: u64,
    doc: Option<u64>,
    expanded: &mut u64,
) -> Option<u64> {
    loop {
        let (_, id) = walker.current()?;
        let node = *arena.get(id);

        if node.range_begin > bound {
            return None;
        }

        if let Some(d) = doc {
            if node.doc_begin > d {
                return None;
            }
        }

        if node.is_leaf {
            // Leaf bounds are exact
            if doc.is_some_and(|d| node.doc_begin != d) {
                return None;
            }

            walker.skip_subtree();
            return Some(node.range_begin);
        }

        walker.expand(arena, index);
        *expanded += 1;
    }
}

fn search_range(index: &MatchingIndex, pattern: &[u64]) -> Option<LexRange> {
    if pattern.is_empty() {
        return None;
    }
    index.backward_search(index.full_range(), pattern)
}

/// Lazy match iterator for two-term gapped patterns
///
/// Gap bounds are start-to-start distances: the caller has already added
/// `|s0|` to the declared gap. Emits `(a, b)` start pairs with strictly
/// increasing `a`, choosing the latest admissible `b` per `a` and pulling
/// `a` past `b + |s1|` so emissions never overlap.
pub struct WildcardMatchIter2<'a> {
    index: &'a MatchingIndex,
    arena: NodeArena,
    walkers: [RangeWalker; 2],
    min_gap: u64,
    max_gap: u64,
    tail_len: u64,
    pull_limit: u64,
    use_docs: bool,
    expanded: u64,
}

impl<'a> WildcardMatchIter2<'a> {
    /// Creates the iterator; gap bounds are start-to-start.
    #[must_use]
    pub fn new(index: &'a MatchingIndex, s0: &[u64], s1: &[u64], min_gap: u64, max_gap: u64) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert_root(index);

        let walkers = [
            RangeWalker::new(search_range(index, s0), root),
            RangeWalker::new(search_range(index, s1), root),
        ];

        Self {
            index,
            arena,
            walkers,
            min_gap,
            max_gap,
            tail_len: s1.len() as u64,
            pull_limit: 0,
            use_docs: index.has_documents(),
            expanded: 0,
        }
    }

    /// Number of wavelet tree nodes expanded so far
    #[must_use]
    pub fn nodes_expanded(&self) -> u64 {
        self.expanded
    }
}

impl Iterator for WildcardMatchIter2<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (r0, id0) = self.walkers[0].current()?;
            let (r1, id1) = self.walkers[1].current()?;

            let n0 = *self.arena.get(id0);
            let n1 = *self.arena.get(id1);

            // Document prune: everything below n0 lies in documents
            // strictly before anything n1 can still produce
            if self.use_docs && n0.doc_end < n1.doc_begin {
                self.walkers[0].skip_subtree();
                continue;
            }

            // Gap prunes
            if n0.range_end.saturating_add(self.max_gap) < n1.range_begin {
                self.walkers[0].skip_subtree();
                continue;
            }
            if n0.range_begin.saturating_add(self.min_gap) > n1.range_end {
                self.walkers[1].skip_subtree();
                continue;
            }

            if n0.is_leaf && n1.is_leaf {
                let a = n0.range_begin;

                // Non-overlap with the previous emission
                if a < self.pull_limit {
                    self.walkers[0].skip_subtree();
                    continue;
                }

                let doc = self.use_docs.then_some(n0.doc_begin);
                let mut b = n1.range_begin;
                self.walkers[1].skip_subtree();

                // Greedy-lazy push: advance b to the latest admissible
                // position before emitting
                let bound = a.saturating_add(self.max_gap);
                while let Some(v) = next_leaf_at_most(
                    &mut self.walkers[1],
                    &mut self.arena,
                    self.index,
                    bound,
                    doc,
                    &mut self.expanded,
                ) {
                    b = v;
                }

                let limit = b.saturating_add(self.tail_len);
                while let Some((_, id)) = self.walkers[0].current() {
                    if self.arena.get(id).range_end < limit {
                        self.walkers[0].skip_subtree();
                    } else {
                        break;
                    }
                }
                self.pull_limit = limit;

                return Some((a, b));
            }

            // Expand whichever inner node covers the wider lex-range
            let expand_second = if n0.is_leaf {
                true
            } else if n1.is_leaf {
                false
            } else {
                r1.len() >= r0.len()
            };

            let walker = self
                .walkers
                .get_mut(usize::from(expand_second))
                .expect("should exist");
            walker.expand(&mut self.arena, self.index);
            self.expanded += 1;
        }
    }
}

/// Lazy match iterator for three-term gapped patterns
///
/// Same contract as [`WildcardMatchIter2`], extended to `(a, b, c)` with
/// two start-to-start gap windows. The greedy push of `b` is speculative:
/// walker snapshots are taken before it and restored afterwards, so a
/// failed push never loses positions for later emissions.
pub struct WildcardMatchIter3<'a> {
    index: &'a MatchingIndex,
    arena: NodeArena,
    walkers: [RangeWalker; 3],
    min_ab: u64,
    max_ab: u64,
    min_bc: u64,
    max_bc: u64,
    tail_len: u64,
    pull_limit: u64,
    use_docs: bool,
    expanded: u64,
}

impl<'a> WildcardMatchIter3<'a> {
    /// Creates the iterator; both gap windows are start-to-start.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        index: &'a MatchingIndex,
        s0: &[u64],
        s1: &[u64],
        s2: &[u64],
        min_ab: u64,
        max_ab: u64,
        min_bc: u64,
        max_bc: u64,
    ) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert_root(index);

        let walkers = [
            RangeWalker::new(search_range(index, s0), root),
            RangeWalker::new(search_range(index, s1), root),
            RangeWalker::new(search_range(index, s2), root),
        ];

        Self {
            index,
            arena,
            walkers,
            min_ab,
            max_ab,
            min_bc,
            max_bc,
            tail_len: s2.len() as u64,
            pull_limit: 0,
            use_docs: index.has_documents(),
            expanded: 0,
        }
    }

    /// Number of wavelet tree nodes expanded so far
    #[must_use]
    pub fn nodes_expanded(&self) -> u64 {
        self.expanded
    }
}

impl Iterator for WildcardMatchIter3<'_> {
    type Item = (u64, u64, u64);

    #[allow(clippy::too_many_lines)]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (r0, id0) = self.walkers[0].current()?;
            let (r1, id1) = self.walkers[1].current()?;
            let (r2, id2) = self.walkers[2].current()?;

            let n0 = *self.arena.get(id0);
            let n1 = *self.arena.get(id1);
            let n2 = *self.arena.get(id2);

            // Document prunes
            if self.use_docs {
                if n1.doc_end < n2.doc_begin {
                    self.walkers[1].skip_subtree();
                    continue;
                }
                if n0.doc_end < n1.doc_begin {
                    self.walkers[0].skip_subtree();
                    continue;
                }
            }

            // Gap prunes, b-c window first
            if n1.range_end.saturating_add(self.max_bc) < n2.range_begin {
                self.walkers[1].skip_subtree();
                continue;
            }
            if n1.range_begin.saturating_add(self.min_bc) > n2.range_end {
                self.walkers[2].skip_subtree();
                continue;
            }
            if n0.range_end.saturating_add(self.max_ab) < n1.range_begin {
                self.walkers[0].skip_subtree();
                continue;
            }
            if n0.range_begin.saturating_add(self.min_ab) > n1.range_end {
                self.walkers[1].skip_subtree();
                continue;
            }

            if n0.is_leaf && n1.is_leaf && n2.is_leaf {
                let a = n0.range_begin;

                if a < self.pull_limit {
                    self.walkers[0].skip_subtree();
                    continue;
                }

                let doc = self.use_docs.then_some(n0.doc_begin);
                let mut b = n1.range_begin;
                let mut c = n2.range_begin;

                self.walkers[1].skip_subtree();
                self.walkers[2].skip_subtree();

                // Greedy push of c for the initial b
                while let Some(v) = next_leaf_at_most(
                    &mut self.walkers[2],
                    &mut self.arena,
                    self.index,
                    b.saturating_add(self.max_bc),
                    doc,
                    &mut self.expanded,
                ) {
                    c = v;
                }

                // Speculative greedy push of b: a later b is only
                // committed once a compatible c is confirmed
                let state1 = self.walkers[1].save_state();
                let state2 = self.walkers[2].save_state();

                let b_bound = a.saturating_add(self.max_ab);

                while let Some(b_temp) = next_leaf_at_most(
                    &mut self.walkers[1],
                    &mut self.arena,
                    self.index,
                    b_bound,
                    doc,
                    &mut self.expanded,
                ) {
                    let c_floor = b_temp.saturating_add(self.min_bc);

                    if c_floor <= c {
                        b = b_temp;
                    }

                    while let Some(v) = next_leaf_at_most(
                        &mut self.walkers[2],
                        &mut self.arena,
                        self.index,
                        b_temp.saturating_add(self.max_bc),
                        doc,
                        &mut self.expanded,
                    ) {
                        if v >= c_floor {
                            b = b_temp;
                            c = v;
                        }
                    }
                }

                self.walkers[1].restore_state(state1);
                self.walkers[2].restore_state(state2);

                let limit = c.saturating_add(self.tail_len);
                while let Some((_, id)) = self.walkers[0].current() {
                    if self.arena.get(id).range_end < limit {
                        self.walkers[0].skip_subtree();
                    } else {
                        break;
                    }
                }
                self.pull_limit = limit;

                return Some((a, b, c));
            }

            // Expand the inner node covering the widest lex-range,
            // later walkers winning ties
            let mut pick = None;
            for (i, (range, leaf)) in [(r0, n0.is_leaf), (r1, n1.is_leaf), (r2, n2.is_leaf)]
                .into_iter()
                .enumerate()
            {
                if leaf {
                    continue;
                }
                match pick {
                    Some((len, _)) if range.len() < len => {}
                    _ => pick = Some((range.len(), i)),
                }
            }

            let (_, idx) = pick.expect("at least one node is inner");
            let walker = self.walkers.get_mut(idx).expect("should exist");
            walker.expand(&mut self.arena, self.index);
            self.expanded += 1;
        }
    }
}
