// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::index::MatchingIndex;
use crate::node_cache::{NodeArena, NodeId};
use crate::LexRange;

/// Snapshot of a walker's DFS stack
#[derive(Clone, Debug)]
pub struct WalkerState {
    stack: Vec<(LexRange, NodeId)>,
}

/// Depth-first iterator over a wavelet tree subtree, restricted to an
/// initial lex-range
///
/// The stack holds disjoint (lex-range, node) pairs that together cover
/// exactly the unvisited part of the initial range, in DFS order. Since
/// the left child of every node owns the smaller half of the value
/// domain, leaves surface in ascending text position order.
#[derive(Debug)]
pub struct RangeWalker {
    stack: Vec<(LexRange, NodeId)>,
}

impl RangeWalker {
    /// Creates a walker over `range`; `None` yields an exhausted walker.
    #[must_use]
    pub fn new(range: Option<LexRange>, root: NodeId) -> Self {
        Self {
            stack: range.map(|r| vec![(r, root)]).unwrap_or_default(),
        }
    }

    /// Whether any subtree is left to visit
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The current (lex-range, node) pair
    #[must_use]
    pub fn current(&self) -> Option<(LexRange, NodeId)> {
        self.stack.last().copied()
    }

    /// The current node handle
    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        self.stack.last().map(|(_, id)| *id)
    }

    /// Drops the current subtree without visiting it.
    pub fn skip_subtree(&mut self) {
        self.stack.pop();
    }

    /// Replaces the current node by its non-empty children, left on top.
    pub fn expand(&mut self, arena: &mut NodeArena, index: &MatchingIndex) {
        let Some((range, id)) = self.stack.pop() else {
            return;
        };

        debug_assert!(!arena.get(id).is_leaf, "cannot expand a leaf");

        let (left_id, right_id) = arena.ensure_children(id, index);
        let node = arena.get(id).node;

        let [left, right] = index.expand_range(node, range);

        if let Some(r) = right {
            self.stack.push((r, right_id));
        }
        if let Some(r) = left {
            self.stack.push((r, left_id));
        }
    }

    /// Advances to the next unvisited leaf.
    ///
    /// A current leaf is skipped first, so repeated calls enumerate
    /// leaves strictly forward. Returns `None` once the range is
    /// exhausted.
    pub fn next_leaf(&mut self, arena: &mut NodeArena, index: &MatchingIndex) -> Option<NodeId> {
        if let Some((_, id)) = self.current() {
            if arena.get(id).is_leaf {
                self.skip_subtree();
            }
        }

        loop {
            let (_, id) = self.current()?;

            if arena.get(id).is_leaf {
                return Some(id);
            }

            self.expand(arena, index);
        }
    }

    /// Full-copy snapshot of the DFS stack.
    #[must_use]
    pub fn save_state(&self) -> WalkerState {
        WalkerState {
            stack: self.stack.clone(),
        }
    }

    /// Rewinds to a previously saved snapshot.
    pub fn restore_state(&mut self, state: WalkerState) {
        self.stack = state.stack;
    }
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

    fn leaf_values(
        walker: &mut RangeWalker,
        arena: &mut NodeArena,
        index: &MatchingIndex,
    ) -> Vec<u64> {
        let mut out = vec![];
        while let Some(id) = walker.next_leaf(arena, index) {
            out.push(arena.get(id).range_begin);
        }
        out
    }

    #[test]
    fn walker_enumerates_positions_in_order() {
        let index = byte_index(b"abracadabra");
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        // All occurrences of "a"
        let range = index.forward_search(index.full_range(), &[u64::from(b'a')]);
        let mut walker = RangeWalker::new(range, root);

        let values = leaf_values(&mut walker, &mut arena, &index);
        assert_eq!(vec![0, 3, 5, 7, 10], values);
        assert!(!walker.has_more());
    }

    #[test]
    fn walker_empty_range() {
        let index = byte_index(b"abracadabra");
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        let mut walker = RangeWalker::new(None, root);
        assert!(!walker.has_more());
        assert!(walker.next_leaf(&mut arena, &index).is_none());
    }

    #[test]
    fn walker_skip_subtree_drops_values() {
        let index = byte_index(b"aaaa");
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        let range = index.forward_search(index.full_range(), &[u64::from(b'a')]);
        let mut walker = RangeWalker::new(range, root);

        // Skipping the whole initial range leaves nothing
        walker.skip_subtree();
        assert!(walker.next_leaf(&mut arena, &index).is_none());
    }

    #[test]
    fn walker_save_restore_replays_leaves() {
        let index = byte_index(b"abracadabra");
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        let range = index.forward_search(index.full_range(), &[u64::from(b'a')]);
        let mut walker = RangeWalker::new(range, root);

        let state = walker.save_state();
        let first = leaf_values(&mut walker, &mut arena, &index);

        walker.restore_state(state);
        let second = leaf_values(&mut walker, &mut arena, &index);

        assert_eq!(first, second);
    }
}
