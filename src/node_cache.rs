// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::index::MatchingIndex;
use crate::wavelet::WtNode;

/// Handle into a [`NodeArena`]
pub type NodeId = u32;

const NIL: NodeId = u32::MAX;

/// Per-query metadata of one wavelet tree node
///
/// `range_begin ..= range_end` are the text position bounds reachable
/// through the node; for a leaf both equal the single suffix array value.
/// `doc_begin`/`doc_end` are the document ranks of those bounds. Children
/// stay unmaterialized until [`NodeArena::ensure_children`].
#[derive(Copy, Clone, Debug)]
pub struct CachedNode {
    pub node: WtNode,
    pub range_begin: u64,
    pub range_end: u64,
    pub doc_begin: u64,
    pub doc_end: u64,
    pub is_leaf: bool,
    left: NodeId,
    right: NodeId,
}

impl CachedNode {
    /// Width of the reachable text position interval
    #[must_use]
    pub fn range_size(&self) -> u64 {
        self.range_end - self.range_begin
    }
}

/// Arena of cached wavelet tree nodes, shared by all walkers of one query
///
/// Handles replace shared ownership; a node lives exactly as long as the
/// query that created it, and a parent always outlives its children.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<CachedNode>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materialized nodes
    #[must_use]
    pub fn len(&self) -> u64 {
        self.nodes.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(
        &mut self,
        node: WtNode,
        index: &MatchingIndex,
        parent_docs: Option<(u64, u64)>,
    ) -> NodeId {
        let (range_begin, range_end) = index.value_range(node);

        // A parent fully inside one document passes its endpoints down;
        // otherwise the split point is unknown and both are recomputed
        let (doc_begin, doc_end) = match parent_docs {
            Some(docs) => docs,
            None => (index.doc_index(range_begin), index.doc_index(range_end)),
        };

        let id = self.nodes.len() as NodeId;

        self.nodes.push(CachedNode {
            node,
            range_begin,
            range_end,
            doc_begin,
            doc_end,
            is_leaf: index.is_leaf(node),
            left: NIL,
            right: NIL,
        });

        id
    }

    /// Materializes the root of the suffix array wavelet tree.
    pub fn insert_root(&mut self, index: &MatchingIndex) -> NodeId {
        self.insert(index.root(), index, None)
    }

    /// Gets a node by handle.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &CachedNode {
        self.nodes.get(id as usize).expect("node should exist")
    }

    /// Materializes both children of an inner node; idempotent.
    pub fn ensure_children(&mut self, id: NodeId, index: &MatchingIndex) -> (NodeId, NodeId) {
        let cached = *self.get(id);
        debug_assert!(!cached.is_leaf, "leaves have no children");

        if cached.left != NIL {
            return (cached.left, cached.right);
        }

        let (left_node, right_node) = index.expand(cached.node);

        let parent_docs =
            (cached.doc_begin == cached.doc_end).then_some((cached.doc_begin, cached.doc_end));

        let left = self.insert(left_node, index, parent_docs);
        let right = self.insert(right_node, index, parent_docs);

        {
            let slot = self.nodes.get_mut(id as usize).expect("node should exist");
            slot.left = left;
            slot.right = right;
        }

        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::succinct::IntVec;
    use test_log::test;

    fn byte_index(text: &[u8], delimiter: Option<u8>) -> MatchingIndex {
        let packed = IntVec::from_slice(&text.iter().map(|&b| u64::from(b)).collect::<Vec<_>>());
        MatchingIndex::build(packed, delimiter.map(u64::from))
    }

    #[test]
    fn node_cache_root_invariants() {
        let index = byte_index(b"abracadabra", None);
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        let cached = arena.get(root);
        assert_eq!(0, cached.range_begin);
        assert!(cached.range_end >= index.text_len());
        assert!(!cached.is_leaf);
    }

    #[test]
    fn node_cache_children_are_idempotent() {
        let index = byte_index(b"abracadabra", None);
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        let first = arena.ensure_children(root, &index);
        let second = arena.ensure_children(root, &index);

        assert_eq!(first, second);
        assert_eq!(3, arena.len());
    }

    #[test]
    fn node_cache_leaf_has_exact_range() {
        let index = byte_index(b"abc", None);
        let mut arena = NodeArena::new();
        let mut id = arena.insert_root(&index);

        // Walk down the left spine to a leaf
        while !arena.get(id).is_leaf {
            let (left, _) = arena.ensure_children(id, &index);
            id = left;
        }

        let leaf = arena.get(id);
        assert_eq!(leaf.range_begin, leaf.range_end);
        assert_eq!(0, leaf.range_size());
    }

    #[test]
    fn node_cache_single_document_inherits_doc_range() {
        // No delimiter occurs, so every node sits in document 0
        let index = byte_index(b"abcabc", Some(b'\n'));
        let mut arena = NodeArena::new();
        let root = arena.insert_root(&index);

        let (left, right) = arena.ensure_children(root, &index);

        assert_eq!(arena.get(root).doc_begin, arena.get(left).doc_begin);
        assert_eq!(arena.get(root).doc_end, arena.get(right).doc_end);
    }
}
