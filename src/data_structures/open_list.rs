use std::fmt::Debug;

use crate::cost::Cost;
use crate::search::SearchNodeIndex;

type HeapIndex = usize;

/// Where the nodes referenced by the heap live.
///
/// The heap only stores `(rank, SearchNodeIndex)` pairs and keeps the remote
/// node informed of where its pair sits, so it can be re-ranked without a
/// linear search.
pub(crate) trait HeapSlots {
    fn set_heap_index(&mut self, node: SearchNodeIndex, i: HeapIndex);
    fn heap_index(&self, node: SearchNodeIndex) -> HeapIndex;
}

impl HeapSlots for crate::search::SearchTable {
    #[inline(always)]
    fn set_heap_index(&mut self, node: SearchNodeIndex, i: HeapIndex) {
        self[node].heap_index = i;
    }
    #[inline(always)]
    fn heap_index(&self, node: SearchNodeIndex) -> HeapIndex {
        self[node].heap_index
    }
}

/// The ranking tuple for A*
///
/// We prefer better f-values, and tie break for lower h, which favours nodes
/// closer to the goal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AStarRank<C: Cost> {
    f: C,
    h: C,
}
impl<C> AStarRank<C>
where
    C: Cost,
{
    pub fn new(g: C, h: C) -> Self {
        Self {
            f: g.saturating_add(&h),
            h,
        }
    }
    /// Improves `g` in `Rank{f, h}` without recomputing `h`.
    pub fn improve_g(&mut self, new_g: C) {
        self.f = new_g.saturating_add(&self.h);
    }

    pub fn f(&self) -> C {
        self.f
    }
    pub fn h(&self) -> C {
        self.h
    }
}

#[derive(Debug, Clone)]
pub struct OpenEntry<C: Cost> {
    pub rank: AStarRank<C>,
    pub node: SearchNodeIndex,
}

const HEAP_ARITY: usize = 4usize;

/// The parent slot.
///
/// ```text
///                    0
///       1        2        3        4
///    5..=8   9..=12  13..=16  17..=20
/// ```
#[inline(always)]
#[must_use]
fn up(i: HeapIndex) -> HeapIndex {
    (i - 1) / HEAP_ARITY
}
/// The first child slot.
#[inline(always)]
#[must_use]
fn down_first(i: HeapIndex) -> HeapIndex {
    (HEAP_ARITY * i) + 1
}

/// The candidate set of an A* search.
///
/// A d-ary min-heap on [`AStarRank`] that mirrors the position of each entry
/// into the remote search node, which allows decrease-key.
#[derive(Debug)]
pub struct OpenList<C: Cost> {
    heap: Vec<OpenEntry<C>>,
}

impl<C> OpenList<C>
where
    C: Cost,
{
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    pub fn capacity(&self) -> usize {
        self.heap.capacity()
    }

    pub fn peek(&self) -> Option<&OpenEntry<C>> {
        self.heap.first()
    }

    pub(crate) fn push<S: HeapSlots>(&mut self, entry: OpenEntry<C>, slots: &mut S) -> HeapIndex {
        self.verify_heap(slots);

        let heap_index = self.heap.len();
        slots.set_heap_index(entry.node, heap_index);
        self.heap.push(entry);
        let heap_index = self.sift_up(heap_index, slots);

        self.verify_heap(slots);
        heap_index
    }

    /// Removes the best entry.
    pub(crate) fn pop<S: HeapSlots>(&mut self, slots: &mut S) -> Option<SearchNodeIndex> {
        #[cfg(feature = "coz_profile")]
        coz::scope!("Pop");

        self.verify_heap(slots);
        if self.heap.len() <= 1 {
            return self.heap.pop().map(|e| e.node);
        }

        let top = self.heap.swap_remove(0);
        slots.set_heap_index(self.heap[0].node, 0);
        self.sift_down(0, slots);

        self.verify_heap(slots);
        Some(top.node)
    }

    /// Lowers the `g` of the entry at `heap_index` and restores the heap.
    ///
    /// Returns the new index of the entry.
    pub(crate) fn improve<S: HeapSlots>(
        &mut self,
        heap_index: HeapIndex,
        new_g: C,
        slots: &mut S,
    ) -> HeapIndex {
        debug_assert!(heap_index < self.heap.len(), "Improving a missing entry");
        let old_rank = self.heap[heap_index].rank;
        self.heap[heap_index].rank.improve_g(new_g);
        debug_assert!(self.heap[heap_index].rank <= old_rank);

        let heap_index = self.sift_up(heap_index, slots);
        self.verify_heap(slots);
        heap_index
    }

    #[inline(always)]
    #[cfg(not(feature = "verify"))]
    pub(crate) fn verify_heap<S: HeapSlots>(&self, _slots: &S) {
        // All good... (hopefully)
    }

    #[inline(always)]
    #[cfg(feature = "verify")]
    pub(crate) fn verify_heap<S: HeapSlots>(&self, slots: &S) {
        // Every entry,
        for (i, e) in self.heap.iter().enumerate() {
            // - Has the right intrusive index set.
            assert_eq!(slots.heap_index(e.node), i);

            // - Goes after its parent entry, if any.
            if i == 0 {
                continue;
            }
            let p = up(i);
            assert!(
                self.heap[p].rank <= e.rank,
                "Entry[{p}]={:?} !<= child [{i}]={:?}. Out of heap of len={}",
                self.heap[p],
                e,
                self.heap.len(),
            );
        }
    }

    /// Raises an entry
    /// Returns its new index
    #[inline(always)]
    fn sift_up<S: HeapSlots>(&mut self, index: HeapIndex, slots: &mut S) -> HeapIndex {
        debug_assert!(
            index < self.heap.len(),
            "Entry is way out of sync. Index out of bounds..."
        );

        let mut pos = index;
        while pos > 0 {
            let parent = up(pos);
            if self.heap[parent].rank <= self.heap[pos].rank {
                break;
            }
            self.swap(parent, pos, slots);
            pos = parent;
        }
        pos
    }

    /// Lowers an entry
    /// Returns its new index
    #[inline(always)]
    fn sift_down<S: HeapSlots>(&mut self, mut index: HeapIndex, slots: &mut S) -> HeapIndex {
        let len = self.heap.len();
        loop {
            let first = down_first(index);
            if first >= len {
                break;
            }
            let last = std::cmp::min(first + HEAP_ARITY, len);

            // Find the best child
            let mut child = first;
            for c in (first + 1)..last {
                if self.heap[c].rank < self.heap[child].rank {
                    child = c;
                }
            }

            if self.heap[index].rank <= self.heap[child].rank {
                break;
            }
            self.swap(index, child, slots);
            index = child;
        }
        index
    }

    /// Swaps two entries and keeps the intrusive indices in sync.
    ///
    /// For consistency in calling code `l < r` is checked.
    #[inline(always)]
    fn swap<S: HeapSlots>(&mut self, l: HeapIndex, r: HeapIndex, slots: &mut S) {
        debug_assert!(l < r, "Swap({l}, {r}) uses wrong argument order");

        self.heap.swap(l, r);
        slots.set_heap_index(self.heap[l].node, l);
        slots.set_heap_index(self.heap[r].node, r);
        debug_assert!(
            self.heap[l].rank <= self.heap[r].rank,
            "Swaps must locally restore the heap invariant."
        );
    }
}

impl<C> Default for OpenList<C>
where
    C: Cost,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
