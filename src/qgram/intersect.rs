// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::succinct::elias_fano::{EliasFanoCursor, EliasFanoList};

/// Forward cursor over an ascending position list
pub trait PositionCursor {
    /// The next position, if any
    fn peek(&self) -> Option<u64>;

    /// Consumes the next position.
    fn advance(&mut self);

    /// Skips forward until the next position is `>= target`.
    fn seek(&mut self, target: u64);
}

/// An ascending list of text positions
///
/// The Elias-Fano view is the production representation; plain sorted
/// slices implement the same interface and stand in for it in tests.
pub trait PositionList {
    /// Cursor type handed out by this list
    type Cursor<'a>: PositionCursor
    where
        Self: 'a;

    /// Number of positions
    fn len(&self) -> u64;

    /// Whether the list is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A cursor positioned before the first element
    fn cursor(&self) -> Self::Cursor<'_>;
}

impl PositionCursor for EliasFanoCursor<'_> {
    fn peek(&self) -> Option<u64> {
        EliasFanoCursor::peek(self)
    }

    fn advance(&mut self) {
        let _ = self.next_value();
    }

    fn seek(&mut self, target: u64) {
        EliasFanoCursor::seek(self, target);
    }
}

impl<'a> PositionList for EliasFanoList<'a> {
    type Cursor<'b>
        = EliasFanoCursor<'a>
    where
        Self: 'b;

    fn len(&self) -> u64 {
        EliasFanoList::len(self)
    }

    fn cursor(&self) -> Self::Cursor<'_> {
        EliasFanoList::cursor(self)
    }
}

/// Cursor over a plain sorted slice
#[derive(Clone, Copy, Debug)]
pub struct SliceCursor<'a> {
    positions: &'a [u64],
    idx: usize,
}

impl PositionCursor for SliceCursor<'_> {
    fn peek(&self) -> Option<u64> {
        self.positions.get(self.idx).copied()
    }

    fn advance(&mut self) {
        self.idx += 1;
    }

    fn seek(&mut self, target: u64) {
        let rest = self.positions.get(self.idx..).unwrap_or_default();
        self.idx += rest.partition_point(|&v| v < target);
    }
}

impl PositionList for [u64] {
    type Cursor<'b>
        = SliceCursor<'b>
    where
        Self: 'b;

    fn len(&self) -> u64 {
        <[u64]>::len(self) as u64
    }

    fn cursor(&self) -> Self::Cursor<'_> {
        SliceCursor {
            positions: self,
            idx: 0,
        }
    }
}

/// Offset-adjacent intersection of position lists
///
/// List `j` carries the implicit positional offset `j`: the result keeps
/// every position `p` of the first list where each further list contains
/// `p + j`. This is how the lists of the overlapping q-grams of one
/// sub-pattern are combined into occurrences of the whole sub-pattern.
#[must_use]
pub fn intersect_adjacent<L: PositionList + ?Sized>(lists: &[&L]) -> Vec<u64> {
    let Some(first) = lists.first() else {
        return vec![];
    };

    if lists.len() == 1 {
        let mut cursor = first.cursor();
        let mut out = Vec::with_capacity(first.len() as usize);
        while let Some(v) = cursor.peek() {
            out.push(v);
            cursor.advance();
        }
        return out;
    }

    let mut cursors = lists.iter().map(|l| l.cursor()).collect::<Vec<_>>();
    let mut out = vec![];

    loop {
        let Some(base) = cursors.first().and_then(PositionCursor::peek) else {
            break;
        };

        // Leapfrog the tail cursors to their aligned targets
        let mut realign = None;

        for j in 1..cursors.len() {
            let target = base + j as u64;
            let cursor = cursors.get_mut(j).expect("should exist");

            cursor.seek(target);

            match cursor.peek() {
                None => return out,
                Some(v) if v == target => {}
                Some(v) => {
                    realign = Some(v - j as u64);
                    break;
                }
            }
        }

        let head = cursors.get_mut(0).expect("should exist");

        match realign {
            None => {
                out.push(base);
                head.advance();
            }
            Some(new_base) => head.seek(new_base),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn intersect_adjacent_slices() {
        // Positions of overlapping q-grams of "abc" in "abcxabc"
        let ab: &[u64] = &[0, 4];
        let bc: &[u64] = &[1, 5];

        assert_eq!(vec![0, 4], intersect_adjacent(&[ab, bc]));
    }

    #[test]
    fn intersect_adjacent_no_alignment() {
        let a: &[u64] = &[0, 10, 20];
        let b: &[u64] = &[5, 15, 25];

        assert!(intersect_adjacent(&[a, b]).is_empty());
    }

    #[test]
    fn intersect_adjacent_three_lists() {
        let a: &[u64] = &[0, 3, 7, 9];
        let b: &[u64] = &[1, 4, 8, 11];
        let c: &[u64] = &[2, 9, 12];

        // 0/1/2 and 7/8/9 align; 3/4 lacks a 5 in c, 9 lacks a 10 in b
        assert_eq!(vec![0, 7], intersect_adjacent(&[a, b, c]));
    }

    #[test]
    fn intersect_single_list_passes_through() {
        let a: &[u64] = &[2, 4, 6];
        assert_eq!(vec![2, 4, 6], intersect_adjacent(&[a]));
    }

    #[test]
    fn intersect_elias_fano_matches_slices() {
        use crate::succinct::bit_stream::BitWriter;
        use crate::succinct::elias_fano;

        let a = vec![0u64, 3, 7, 9, 40, 41];
        let b = vec![1u64, 4, 8, 11, 41, 42];

        let mut writer = BitWriter::new();
        let base_a = elias_fano::create(&mut writer, &a);
        let base_b = elias_fano::create(&mut writer, &b);
        let (words, _) = writer.finish();

        let list_a = EliasFanoList::parse(&words, base_a);
        let list_b = EliasFanoList::parse(&words, base_b);

        let expected = intersect_adjacent(&[&a[..], &b[..]]);
        assert_eq!(expected, intersect_adjacent(&[&list_a, &list_b]));
        assert_eq!(vec![0, 3, 7, 40, 41], expected);
    }
}
