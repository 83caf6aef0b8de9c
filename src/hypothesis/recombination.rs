//! Recombination of hypotheses that no future expansion can tell apart.

use super::{HypoId, Hypothesis, HypothesisArena};
use crate::config::DecoderConfig;
use crate::score::Score;
use min_max_heap::MinMaxHeap;
use std::cmp::{Ordering, Reverse};
use std::mem;

/// Compares the states of all stateful features in registration order.
pub fn compare_states(a: &Hypothesis, b: &Hypothesis) -> Ordering {
    assert_eq!(
        a.states.len(),
        b.states.len(),
        "hypotheses {} and {} were scored by different feature sets",
        a.id,
        b.id
    );
    for (sa, sb) in a.states.iter().zip(&b.states) {
        match sa.compare(sb.as_ref()) {
            Ordering::Equal => (),
            o => return o,
        }
    }
    Ordering::Equal
}

/// The order of recombination classes. Two hypotheses are equivalent iff
/// they cover the same span, have the same boundary words and all their
/// feature states compare equal. Scores play no role.
pub fn recombine_compare(a: &Hypothesis, b: &Hypothesis) -> Ordering {
    a.span()
        .cmp(&b.span())
        .then_with(|| a.prefix.cmp(&b.prefix))
        .then_with(|| a.suffix.cmp(&b.suffix))
        .then_with(|| compare_states(a, b))
}

/// Makes `loser` an arc of `winner`. The winner takes over the arcs the
/// loser collected so far.
pub fn add_arc(arena: &mut HypothesisArena, winner: HypoId, loser: HypoId) {
    assert_ne!(winner, loser, "hypothesis {} recombined with itself", winner);
    let mut adopted = {
        let l = arena.get_mut(loser);
        l.demoted = true;
        mem::take(&mut l.arcs)
    };
    let w = arena.get_mut(winner);
    assert!(!w.demoted, "demoted hypothesis {} cannot win", w.id);
    if w.arcs.is_empty() {
        mem::swap(&mut w.arcs, &mut adopted);
    } else {
        w.arcs.append(&mut adopted);
    }
    w.arcs.push(loser);
    // hand the emptied buffer back to the loser
    arena.get_mut(loser).arcs = adopted;
}

/// What happened when a hypothesis was added to a `RecombinationIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recombined {
    /// No equivalent hypothesis was known.
    NewClass,
    /// The new hypothesis beat the representative `loser`, which is now one
    /// of its arcs.
    Replaced { loser: HypoId },
    /// The new hypothesis became an arc of `winner`.
    Merged { winner: HypoId },
}

/// The representatives of all recombination classes of a chart cell, kept
/// sorted by `recombine_compare`.
///
/// Among equivalent hypotheses the one with the highest total score is the
/// representative; on equal totals the one added first stays.
#[derive(Debug, Default, Clone)]
pub struct RecombinationIndex {
    classes: Vec<HypoId>,
}

impl RecombinationIndex {
    pub fn new() -> Self {
        RecombinationIndex::default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn representatives(&self) -> &[HypoId] {
        &self.classes
    }

    /// The representative of the class `id` would belong to.
    pub fn find(&self, arena: &HypothesisArena, id: HypoId) -> Option<HypoId> {
        let h = arena.get(id);
        self.classes
            .binary_search_by(|&rep| recombine_compare(arena.get(rep), h))
            .ok()
            .map(|i| self.classes[i])
    }

    pub fn add(&mut self, arena: &mut HypothesisArena, id: HypoId) -> Recombined {
        let position = {
            let h = arena.get(id);
            assert!(!h.demoted, "hypothesis {} was already recombined", h.id);
            self.classes
                .binary_search_by(|&rep| recombine_compare(arena.get(rep), h))
        };
        match position {
            Err(i) => {
                self.classes.insert(i, id);
                tracing::trace!(hypothesis = arena.get(id).id, "new recombination class");
                Recombined::NewClass
            }
            Ok(i) => {
                let rep = self.classes[i];
                assert_ne!(rep, id, "hypothesis {} added twice", id);
                if arena.get(id).total > arena.get(rep).total {
                    assert!(
                        !arena.get(rep).expanded,
                        "hypothesis {} was replaced after it had been expanded",
                        arena.get(rep).id
                    );
                    add_arc(arena, id, rep);
                    self.classes[i] = id;
                    tracing::trace!(
                        winner = arena.get(id).id,
                        loser = arena.get(rep).id,
                        "recombined, replacing representative"
                    );
                    Recombined::Replaced { loser: rep }
                } else {
                    assert!(
                        !arena.get(id).expanded,
                        "hypothesis {} was recombined after it had been expanded",
                        arena.get(id).id
                    );
                    add_arc(arena, rep, id);
                    tracing::trace!(
                        winner = arena.get(rep).id,
                        loser = arena.get(id).id,
                        "recombined into representative"
                    );
                    Recombined::Merged { winner: rep }
                }
            }
        }
    }

    /// The representative with the highest total; the first in class order
    /// on ties.
    pub fn best(&self, arena: &HypothesisArena) -> Option<HypoId> {
        let mut best: Option<(HypoId, Score)> = None;
        for &rep in &self.classes {
            let total = arena.get(rep).total;
            match best {
                Some((_, b)) if b >= total => (),
                _ => best = Some((rep, total)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Representatives by descending total score.
    pub fn sorted_by_score(&self, arena: &HypothesisArena) -> Vec<HypoId> {
        let mut sorted = self.classes.clone();
        sorted.sort_by(|&a, &b| arena.get(b).total.cmp(&arena.get(a).total));
        sorted
    }

    /// Finishes the cell: every representative becomes its own winner,
    /// arc lists are cut down to the `n_best_size` best arcs (unless distinct
    /// n-best lists are requested) and the remaining arcs point to their
    /// representative. Dropped arcs are released.
    pub fn cleanup_arc_lists(&self, arena: &mut HypothesisArena, config: &DecoderConfig) {
        let n = config.n_best_size;
        let mut released = 0;
        for &rep in &self.classes {
            let mut arcs = {
                let r = arena.get_mut(rep);
                r.set_winning(rep);
                mem::take(&mut r.arcs)
            };
            if !config.distinct_n_best && arcs.len() > n {
                let mut heap = MinMaxHeap::with_capacity(n);
                for arc in arcs.drain(..) {
                    let h = arena.get(arc);
                    let key = (h.total, Reverse(h.id), arc);
                    let dropped = if heap.len() < n {
                        heap.push(key);
                        None
                    } else if n > 0 {
                        Some(heap.push_pop_min(key).2)
                    } else {
                        Some(arc)
                    };
                    if let Some(d) = dropped {
                        arena.release(d);
                        released += 1;
                    }
                }
                while let Some((_, _, arc)) = heap.pop_max() {
                    arcs.push(arc);
                }
            }
            for &arc in &arcs {
                arena.get_mut(arc).set_winning(rep);
            }
            arena.get_mut(rep).arcs = arcs;
        }
        tracing::debug!(
            classes = self.classes.len(),
            released,
            n_best_size = n,
            "cleaned up arc lists"
        );
    }
}

/// The hypotheses of the best derivation below `top`, in pre-order.
pub fn best_path(arena: &HypothesisArena, top: HypoId) -> Vec<HypoId> {
    let mut path = Vec::new();
    let mut stack = vec![top];
    while let Some(id) = stack.pop() {
        path.push(id);
        stack.extend(arena.get(id).antecedents.iter().rev());
    }
    path
}
