//! Derivation hypotheses: one way of translating a source span, built from a
//! rule application and one antecedent hypothesis per nonterminal of the
//! rule.

pub mod arena;
pub mod ids;
pub mod recombination;

pub use self::arena::{HypoId, HypothesisArena};
pub use self::ids::HypothesisIds;
pub use self::recombination::{RecombinationIndex, Recombined};

use crate::feature::FeatureState;
use crate::phrase::{RuleApplication, Sentence, TargetPhrase, TargetSymbol, Word};
use crate::score::{Score, ScoreBreakdown};
use crate::span::Span;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// A scored derivation of a source span.
///
/// All fields but the arc list, the winning hypothesis and the bookkeeping
/// flags are fixed once the hypothesis is created.
#[derive(Debug)]
pub struct Hypothesis {
    pub(crate) id: u32,
    pub(crate) rule: Arc<RuleApplication>,
    pub(crate) antecedents: Vec<HypoId>,
    pub(crate) prefix: Vec<Word>,
    pub(crate) suffix: Vec<Word>,
    pub(crate) context_window: usize,
    pub(crate) scores: ScoreBreakdown,
    pub(crate) lm_ngram: ScoreBreakdown,
    pub(crate) lm_prefix: ScoreBreakdown,
    pub(crate) total: Score,
    pub(crate) states: Vec<Box<dyn FeatureState>>,
    pub(crate) num_target_terminals: usize,
    pub(crate) arcs: Vec<HypoId>,
    pub(crate) winning: Option<HypoId>,
    // became an arc of a better equivalent hypothesis
    pub(crate) demoted: bool,
    // used as an antecedent of some other hypothesis
    pub(crate) expanded: bool,
}

impl Hypothesis {
    /// Diagnostic id; says nothing about the derivation.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn rule(&self) -> &RuleApplication {
        &self.rule
    }

    pub fn rule_arc(&self) -> &Arc<RuleApplication> {
        &self.rule
    }

    pub fn target_phrase(&self) -> &TargetPhrase {
        &self.rule.target
    }

    pub fn target_lhs(&self) -> Option<&Word> {
        self.rule.target.lhs.as_ref()
    }

    pub fn span(&self) -> Span {
        self.rule.span
    }

    pub fn antecedents(&self) -> &[HypoId] {
        &self.antecedents
    }

    pub fn antecedent(&self, i: usize) -> HypoId {
        self.antecedents[i]
    }

    /// The first target words of the output, at most as many as the widest
    /// context window of all stateful features.
    pub fn prefix(&self) -> &[Word] {
        &self.prefix
    }

    /// The last target words of the output; bounded like `prefix`.
    pub fn suffix(&self) -> &[Word] {
        &self.suffix
    }

    /// Whether the output is long enough to fill the context window. If not,
    /// prefix and suffix both are the whole output.
    pub fn is_context_complete(&self) -> bool {
        self.num_target_terminals >= self.context_window
    }

    pub fn scores(&self) -> &ScoreBreakdown {
        &self.scores
    }

    /// Score components that were computed with full context.
    pub fn lm_ngram(&self) -> &ScoreBreakdown {
        &self.lm_ngram
    }

    /// Score components that were computed with truncated context.
    pub fn lm_prefix(&self) -> &ScoreBreakdown {
        &self.lm_prefix
    }

    pub fn total(&self) -> Score {
        self.total
    }

    pub fn state(&self, slot: usize) -> &dyn FeatureState {
        self.states[slot].as_ref()
    }

    pub fn states(&self) -> &[Box<dyn FeatureState>] {
        &self.states
    }

    pub fn num_target_terminals(&self) -> usize {
        self.num_target_terminals
    }

    /// Equivalent hypotheses that lost against this one.
    pub fn arcs(&self) -> &[HypoId] {
        &self.arcs
    }

    /// The representative of this hypothesis' equivalence class, once
    /// search has finished.
    pub fn winning(&self) -> Option<HypoId> {
        self.winning
    }

    pub fn is_demoted(&self) -> bool {
        self.demoted
    }

    pub fn set_winning(&mut self, winner: HypoId) {
        match self.winning {
            Some(w) if w != winner => panic!(
                "winning hypothesis of {} set twice ({:?} and {:?})",
                self.id, w, winner
            ),
            _ => self.winning = Some(winner),
        }
    }

    /// Takes all buffers out of `self`, emptied, for reuse by another
    /// hypothesis.
    pub(crate) fn into_buffers(self) -> Buffers {
        let Hypothesis {
            mut antecedents,
            mut prefix,
            mut suffix,
            scores,
            lm_ngram,
            lm_prefix,
            mut states,
            mut arcs,
            ..
        } = self;
        antecedents.clear();
        prefix.clear();
        suffix.clear();
        states.clear();
        arcs.clear();
        Buffers {
            antecedents,
            prefix,
            suffix,
            scores,
            lm_ngram,
            lm_prefix,
            states,
            arcs,
        }
    }
}

impl Display for Hypothesis {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} [total={}, arcs={}]",
            self.id,
            self.rule.span,
            self.rule.target,
            self.total,
            self.arcs.len()
        )
    }
}

/// The reusable memory of a hypothesis.
#[derive(Default)]
pub(crate) struct Buffers {
    pub antecedents: Vec<HypoId>,
    pub prefix: Vec<Word>,
    pub suffix: Vec<Word>,
    pub scores: ScoreBreakdown,
    pub lm_ngram: ScoreBreakdown,
    pub lm_prefix: ScoreBreakdown,
    pub states: Vec<Box<dyn FeatureState>>,
    pub arcs: Vec<HypoId>,
}

/// Collects the first `window` target words of a rule application whose
/// nonterminals are replaced by `antecedents`.
pub(crate) fn collect_prefix(
    symbols: &[TargetSymbol],
    antecedents: &[&Hypothesis],
    window: usize,
    out: &mut Vec<Word>,
) {
    for symbol in symbols {
        if out.len() >= window {
            break;
        }
        match *symbol {
            TargetSymbol::Terminal(ref w) => out.push(w.clone()),
            TargetSymbol::NonTerminal(i) => {
                let free = window - out.len();
                out.extend(antecedents[i].prefix.iter().take(free).cloned());
            }
        }
    }
}

/// Collects the last `window` target words, like `collect_prefix`.
pub(crate) fn collect_suffix(
    symbols: &[TargetSymbol],
    antecedents: &[&Hypothesis],
    window: usize,
    out: &mut Vec<Word>,
) {
    for symbol in symbols.iter().rev() {
        if out.len() >= window {
            break;
        }
        match *symbol {
            TargetSymbol::Terminal(ref w) => out.push(w.clone()),
            TargetSymbol::NonTerminal(i) => {
                let free = window - out.len();
                out.extend(antecedents[i].suffix.iter().rev().take(free).cloned());
            }
        }
    }
    out.reverse();
}

/// Appends the full output of `id` to `out`.
pub fn output_phrase(arena: &HypothesisArena, id: HypoId, out: &mut Vec<Word>) {
    let hypo = arena.get(id);
    for symbol in &hypo.rule.target.symbols {
        match *symbol {
            TargetSymbol::Terminal(ref w) => out.push(w.clone()),
            TargetSymbol::NonTerminal(i) => output_phrase(arena, hypo.antecedents[i], out),
        }
    }
}

/// A read-only view of a hypothesis under construction, given to feature
/// functions during search.
pub struct HypothesisView<'a> {
    pub(crate) hypo: &'a Hypothesis,
    pub(crate) arena: &'a HypothesisArena,
    pub(crate) input: &'a Sentence,
}

impl<'a> HypothesisView<'a> {
    pub fn hypothesis(&self) -> &'a Hypothesis {
        self.hypo
    }

    pub fn rule(&self) -> &'a RuleApplication {
        &self.hypo.rule
    }

    pub fn target_phrase(&self) -> &'a TargetPhrase {
        &self.hypo.rule.target
    }

    pub fn span(&self) -> Span {
        self.hypo.rule.span
    }

    pub fn input(&self) -> &'a Sentence {
        self.input
    }

    pub fn arity(&self) -> usize {
        self.hypo.antecedents.len()
    }

    pub fn antecedent(&self, i: usize) -> &'a Hypothesis {
        self.arena.get(self.hypo.antecedents[i])
    }

    /// The state the stateful feature in `slot` assigned to the `i`th
    /// antecedent.
    pub fn prev_state(&self, i: usize, slot: usize) -> &'a dyn FeatureState {
        self.antecedent(i).states[slot].as_ref()
    }

    /// Up to `n` target words directly left of the rule symbol at `position`
    /// inside this hypothesis, oldest first, and whether all `n` were found.
    pub fn left_context(&self, position: usize, n: usize) -> (Vec<Word>, bool) {
        let mut context = Vec::with_capacity(n);
        for symbol in self.target_phrase().symbols[..position].iter().rev() {
            if context.len() >= n {
                break;
            }
            match *symbol {
                TargetSymbol::Terminal(ref w) => context.push(w.clone()),
                TargetSymbol::NonTerminal(i) => {
                    let antecedent = self.antecedent(i);
                    let free = n - context.len();
                    context.extend(antecedent.suffix.iter().rev().take(free).cloned());
                    if antecedent.suffix.len() < antecedent.num_target_terminals {
                        // words left of a truncated suffix are not known here
                        break;
                    }
                }
            }
        }
        let complete = context.len() == n;
        context.reverse();
        (context, complete)
    }
}
