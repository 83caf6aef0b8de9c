//! Lazy enumeration of the k best derivations of a finished chart, following
//! Huang and Chiang, "Better k-best Parsing" (2005).
//!
//! A node of the hypergraph is a recombination class, identified by its
//! representative. Its incoming edges are the representative itself and
//! every hypothesis in its arc list; the tails of an edge are the nodes of
//! its antecedents.

pub mod candidates;

use self::candidates::CandidateHeap;
use crate::hypothesis::{HypoId, Hypothesis, HypothesisArena};
use crate::phrase::{TargetSymbol, Word};
use crate::score::Score;
use fnv::{FnvHashMap, FnvHashSet};

/// A derivation: an edge together with the rank of the derivation chosen
/// for each of its tails.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Derivation {
    edge: HypoId,
    ranks: Vec<u32>,
}

/// The virtual root collects all top-level recombination classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Root,
    Class(HypoId),
}

/// One entry of a k-best list.
#[derive(Debug, Clone, PartialEq)]
pub struct KBestEntry {
    pub score: Score,
    pub output: Vec<Word>,
    /// The hypotheses of the derivation in pre-order.
    pub edges: Vec<HypoId>,
}

struct NodeDerivations {
    found: Vec<(Derivation, Score)>,
    candidates: CandidateHeap<Derivation, Score>,
}

/// Iterates the derivations below a set of top-level representatives in
/// order of descending score.
///
/// Arc lists must have been cleaned up (see
/// `RecombinationIndex::cleanup_arc_lists`) before.
pub struct KBestIterator<'a> {
    arena: &'a HypothesisArena,
    tops: Vec<HypoId>,
    nodes: FnvHashMap<Node, NodeDerivations>,
    k: usize,
}

fn class_of(hypo: &Hypothesis, id: HypoId) -> HypoId {
    hypo.winning().unwrap_or(id)
}

impl<'a> KBestIterator<'a> {
    pub fn new(arena: &'a HypothesisArena, tops: &[HypoId]) -> Self {
        KBestIterator {
            arena,
            tops: tops.to_vec(),
            nodes: FnvHashMap::default(),
            k: 0,
        }
    }

    fn edges(&self, node: Node) -> Vec<HypoId> {
        let mut edges = Vec::new();
        let classes = match node {
            Node::Root => self.tops.as_slice(),
            Node::Class(ref id) => std::slice::from_ref(id),
        };
        for &rep in classes {
            edges.push(rep);
            edges.extend_from_slice(self.arena.get(rep).arcs());
        }
        edges
    }

    fn tail(&self, edge: HypoId, i: usize) -> Node {
        let ante = self.arena.get(edge).antecedent(i);
        Node::Class(class_of(self.arena.get(ante), ante))
    }

    /// The score of a derivation, if the sub-derivations it uses exist.
    fn score(&mut self, derivation: &Derivation) -> Option<Score> {
        let arena = self.arena;
        let edge = arena.get(derivation.edge);
        let mut score = edge.total();
        for (i, &rank) in derivation.ranks.iter().enumerate() {
            let ante = arena.get(edge.antecedent(i));
            let tail = self.tail(derivation.edge, i);
            let (_, sub) = self.kth(tail, rank as usize)?;
            score = score - ante.total() + sub;
        }
        Some(score)
    }

    fn initial_candidates(&mut self, node: Node) -> CandidateHeap<Derivation, Score> {
        let mut candidates = CandidateHeap::new();
        for edge in self.edges(node) {
            let derivation = Derivation {
                edge,
                ranks: vec![0; self.arena.get(edge).antecedents().len()],
            };
            if let Some(score) = self.score(&derivation) {
                candidates.push(derivation, score);
            }
        }
        candidates
    }

    /// The `k`th best derivation of `node` (counting from 0).
    fn kth(&mut self, node: Node, k: usize) -> Option<(Derivation, Score)> {
        if !self.nodes.contains_key(&node) {
            let mut candidates = self.initial_candidates(node);
            let found = candidates.pop().into_iter().collect();
            self.nodes.insert(node, NodeDerivations { found, candidates });
        }

        loop {
            let last = {
                let entry = &self.nodes[&node];
                if let Some(d) = entry.found.get(k) {
                    return Some(d.clone());
                }
                match entry.found.last() {
                    Some(&(ref d, _)) => d.clone(),
                    None => return None,
                }
            };

            // the neighbours of the last derivation found are the next
            // candidates
            let mut successors = Vec::with_capacity(last.ranks.len());
            for i in 0..last.ranks.len() {
                let mut next = last.clone();
                next.ranks[i] += 1;
                if let Some(score) = self.score(&next) {
                    successors.push((next, score));
                }
            }

            let entry = match self.nodes.get_mut(&node) {
                Some(entry) => entry,
                None => unreachable!(),
            };
            for (d, score) in successors {
                entry.candidates.push(d, score);
            }
            match entry.candidates.pop() {
                Some(best) => entry.found.push(best),
                None => return None,
            }
        }
    }

    /// Reads the output and the edges of `derivation`.
    fn read(&mut self, derivation: &Derivation, output: &mut Vec<Word>, edges: &mut Vec<HypoId>) {
        edges.push(derivation.edge);
        let arena = self.arena;
        let hypo = arena.get(derivation.edge);
        for symbol in &hypo.target_phrase().symbols {
            match *symbol {
                TargetSymbol::Terminal(ref w) => output.push(w.clone()),
                TargetSymbol::NonTerminal(i) => {
                    let tail = self.tail(derivation.edge, i);
                    match self.kth(tail, derivation.ranks[i] as usize) {
                        Some((sub, _)) => self.read(&sub, output, edges),
                        None => panic!("derivation {:?} uses a missing sub-derivation", derivation),
                    }
                }
            }
        }
    }

    /// Skips derivations whose output was already produced by a better one.
    pub fn distinct(self) -> impl Iterator<Item = KBestEntry> + 'a {
        let mut outputs = FnvHashSet::default();
        self.filter(move |entry| outputs.insert(entry.output.clone()))
    }
}

impl<'a> Iterator for KBestIterator<'a> {
    type Item = KBestEntry;

    fn next(&mut self) -> Option<KBestEntry> {
        let k = self.k;
        self.k += 1;
        let (derivation, score) = self.kth(Node::Root, k)?;
        let mut output = Vec::new();
        let mut edges = Vec::new();
        self.read(&derivation, &mut output, &mut edges);
        Some(KBestEntry {
            score,
            output,
            edges,
        })
    }
}
