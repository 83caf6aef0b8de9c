use fnv::FnvHashSet;
use std::collections::BinaryHeap;
use std::hash::Hash;

/// A max-heap of candidate derivations ordered by weight, then by the
/// derivation itself. Every derivation enters the heap at most once, even
/// after it was popped.
///
/// ```
/// use hierodec::kbest::candidates::CandidateHeap;
/// let mut heap = CandidateHeap::new();
/// assert!(heap.push("b", 2));
/// assert!(heap.push("a", 3));
/// assert_eq!(heap.pop(), Some(("a", 3)));
/// assert!(!heap.push("a", 1));
/// assert_eq!(heap.pop(), Some(("b", 2)));
/// assert_eq!(heap.pop(), None);
/// ```
#[derive(Debug, Clone)]
pub struct CandidateHeap<I, W>
where
    I: Ord + Hash,
    W: Ord,
{
    heap: BinaryHeap<(W, I)>,
    seen: FnvHashSet<I>,
}

impl<I, W> Default for CandidateHeap<I, W>
where
    I: Ord + Hash,
    W: Ord,
{
    fn default() -> Self {
        CandidateHeap {
            heap: BinaryHeap::new(),
            seen: FnvHashSet::default(),
        }
    }
}

impl<I, W> CandidateHeap<I, W>
where
    I: Ord + Hash + Clone,
    W: Ord,
{
    pub fn new() -> Self {
        CandidateHeap::default()
    }

    /// Pushes `item` unless it was pushed before. Returns whether it was.
    pub fn push(&mut self, item: I, weight: W) -> bool {
        if self.seen.insert(item.clone()) {
            self.heap.push((weight, item));
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<(I, W)> {
        self.heap.pop().map(|(w, i)| (i, w))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
