//! The protocol between the decoder core and its scoring components
//! ("feature functions").
//!
//! Every feature is scored in up to three phases:
//!
//! * `evaluate_in_isolation` once per distinct target phrase,
//! * `evaluate_with_source_context` once per rule application, before
//!   search, and
//! * `evaluate_when_applied` whenever a hypothesis is built from a rule
//!   application and its antecedents.
//!
//! Each phase only writes to the score components of its own feature, so the
//! result does not depend on the order features are evaluated in.
//! Stateful features additionally return a `FeatureState` in the last phase;
//! hypotheses whose states compare equal (and which agree on span and
//! boundary words) are recombined.

pub mod bilingual_lm;
pub mod rule_scores;
pub mod vocab;
pub mod word_penalty;
pub mod worker;

use crate::config::DecoderConfig;
use crate::error::DecoderError;
use crate::hypothesis::HypothesisView;
use crate::phrase::{RuleApplication, Sentence, TargetPhrase, Word};
use crate::score::{ScoreBreakdown, ScoreLayout, Weights};
use crate::span::Span;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

pub use self::worker::WorkerContext;

/// The context a stateful feature carries from antecedents to the
/// hypotheses built from them.
///
/// Implementations must guarantee that `compare` returns `Equal` iff no
/// future evaluation can distinguish the two states.
pub trait FeatureState: Any + Debug + Send + Sync {
    fn compare(&self, other: &dyn FeatureState) -> Ordering;
    fn as_any(&self) -> &dyn Any;
}

/// Casts a state to the concrete type of the feature that created it.
pub fn downcast_state<T: FeatureState>(state: &dyn FeatureState) -> &T {
    match state.as_any().downcast_ref::<T>() {
        Some(s) => s,
        None => panic!("unexpected feature state {:?}", state),
    }
}

/// Phases shared by stateless and stateful features.
pub trait FeatureFunction: Send + Sync {
    fn name(&self) -> &str;

    /// The number of score components of this feature.
    fn num_scores(&self) -> usize;

    /// Loads all resources the feature needs. Called once before search.
    fn load(&mut self) -> Result<(), DecoderError> {
        Ok(())
    }

    fn evaluate_in_isolation(
        &self,
        _source: &[Word],
        _target: &TargetPhrase,
        _scores: &mut [f64],
        _future: &mut [f64],
    ) {
    }

    fn evaluate_with_source_context(
        &self,
        _input: &Sentence,
        _span: Span,
        _target: &TargetPhrase,
        _scores: &mut [f64],
    ) {
    }
}

pub trait StatelessFeature: FeatureFunction {
    fn evaluate_when_applied(&self, _hypo: &HypothesisView, _scores: &mut [f64]) {}
}

/// The score components a stateful feature writes to during search.
/// `scores` receives the whole delta; `ngram` and `prefix` split it into the
/// part computed with full context and the part computed with truncated
/// context that a larger hypothesis may still revise.
pub struct AppliedScores<'a> {
    pub scores: &'a mut [f64],
    pub ngram: &'a mut [f64],
    pub prefix: &'a mut [f64],
}

pub trait StatefulFeature: FeatureFunction {
    /// The number of boundary words this feature needs to see of each
    /// antecedent.
    fn context_window(&self) -> usize {
        0
    }

    /// The state of this feature for an empty hypothesis.
    fn empty_state(&self, input: &Sentence) -> Box<dyn FeatureState>;

    /// Scores `hypo` given the states of its antecedents
    /// (`hypo.prev_state(i, slot)`) and returns the new state. Must always
    /// succeed; anomalies like unknown words are handled by the feature.
    fn evaluate_when_applied(
        &self,
        hypo: &HypothesisView,
        slot: usize,
        worker: &mut WorkerContext,
        acc: AppliedScores,
    ) -> Box<dyn FeatureState>;
}

struct Registered<F: ?Sized> {
    feature: Box<F>,
    // index into the score layout
    slot: usize,
    ignored: bool,
}

/// All loaded features, the layout of their scores and their weights.
/// Shared read-only between all workers.
pub struct FeatureSet {
    stateless: Vec<Registered<dyn StatelessFeature>>,
    stateful: Vec<Registered<dyn StatefulFeature>>,
    layout: ScoreLayout,
    weights: Weights,
    context_window: usize,
}

/// Collects features in registration order.
#[derive(Default)]
pub struct FeatureSetBuilder {
    stateless: Vec<(usize, Box<dyn StatelessFeature>)>,
    stateful: Vec<(usize, Box<dyn StatefulFeature>)>,
}

impl FeatureSetBuilder {
    pub fn new() -> Self {
        FeatureSetBuilder::default()
    }

    fn next_index(&self) -> usize {
        self.stateless.len() + self.stateful.len()
    }

    pub fn stateless<F: StatelessFeature + 'static>(mut self, feature: F) -> Self {
        let i = self.next_index();
        self.stateless.push((i, Box::new(feature)));
        self
    }

    pub fn stateful<F: StatefulFeature + 'static>(mut self, feature: F) -> Self {
        let i = self.next_index();
        self.stateful.push((i, Box::new(feature)));
        self
    }

    /// Loads every feature and assigns score slots and weights.
    pub fn build(self, config: &DecoderConfig) -> Result<FeatureSet, DecoderError> {
        let FeatureSetBuilder {
            stateless,
            stateful,
        } = self;

        let mut names = HashSet::new();
        let mut order: Vec<(usize, &str, usize)> = Vec::new();
        for &(i, ref f) in &stateless {
            order.push((i, f.name(), f.num_scores()));
        }
        for &(i, ref f) in &stateful {
            order.push((i, f.name(), f.num_scores()));
        }
        order.sort_by_key(|&(i, _, _)| i);

        let mut layout = ScoreLayout::default();
        let mut weights = Vec::new();
        for &(_, name, num_scores) in &order {
            if !names.insert(name.to_string()) {
                return Err(DecoderError::DuplicateFeature(name.to_string()));
            }
            let w = config
                .weights
                .get(name)
                .ok_or_else(|| DecoderError::MissingWeights {
                    feature: name.to_string(),
                })?;
            if w.len() != num_scores {
                return Err(DecoderError::WeightArity {
                    feature: name.to_string(),
                    expected: num_scores,
                    found: w.len(),
                });
            }
            layout.push(name, num_scores);
            weights.extend_from_slice(w);
        }
        for name in config.weights.keys() {
            if !names.contains(name) {
                tracing::warn!(feature = name.as_str(), "weights for unknown feature are ignored");
            }
        }

        // registration indices are contiguous, so they double as layout slots
        let mut loaded_stateless = Vec::with_capacity(stateless.len());
        for (slot, mut feature) in stateless {
            feature.load()?;
            let ignored = config.is_ignored(feature.name());
            tracing::info!(feature = feature.name(), slot, ignored, "loaded stateless feature");
            loaded_stateless.push(Registered { feature, slot, ignored });
        }
        let mut loaded_stateful = Vec::with_capacity(stateful.len());
        let mut context_window = 0;
        for (slot, mut feature) in stateful {
            feature.load()?;
            let ignored = config.is_ignored(feature.name());
            context_window = context_window.max(feature.context_window());
            tracing::info!(
                feature = feature.name(),
                slot,
                ignored,
                context_window = feature.context_window(),
                "loaded stateful feature"
            );
            loaded_stateful.push(Registered { feature, slot, ignored });
        }

        Ok(FeatureSet {
            stateless: loaded_stateless,
            stateful: loaded_stateful,
            layout,
            weights: Weights::from_vec(weights),
            context_window,
        })
    }
}

impl FeatureSet {
    pub fn builder() -> FeatureSetBuilder {
        FeatureSetBuilder::new()
    }

    pub fn layout(&self) -> &ScoreLayout {
        &self.layout
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// The largest number of boundary words any stateful feature needs.
    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn num_stateful(&self) -> usize {
        self.stateful.len()
    }

    /// The stateful feature slot of the feature called `name`.
    pub fn stateful_slot(&self, name: &str) -> Option<usize> {
        self.stateful.iter().position(|r| r.feature.name() == name)
    }

    /// Runs the isolation phase of all features on `target`.
    pub fn evaluate_in_isolation(&self, source: &[Word], target: &mut TargetPhrase) {
        let mut scores = self.layout.zeros();
        let mut future = self.layout.zeros();
        for r in &self.stateless {
            let slot = self.layout.slot(r.slot);
            r.feature
                .evaluate_in_isolation(source, target, scores.get_mut(slot), future.get_mut(slot));
        }
        for r in &self.stateful {
            let slot = self.layout.slot(r.slot);
            r.feature
                .evaluate_in_isolation(source, target, scores.get_mut(slot), future.get_mut(slot));
        }
        target.scores = scores;
        target.future = future;
    }

    /// Instantiates a scored target phrase over `span`, running the
    /// source-context phase of all features.
    pub fn apply_rule(
        &self,
        input: &Sentence,
        target: Arc<TargetPhrase>,
        span: Span,
        nonterminal_spans: Vec<Span>,
    ) -> RuleApplication {
        assert_eq!(
            target.scores.len(),
            self.layout.size(),
            "target phrase `{}` was not scored in isolation",
            target
        );
        assert_eq!(
            target.arity(),
            nonterminal_spans.len(),
            "rule `{}` applied with {} nonterminal spans",
            target,
            nonterminal_spans.len()
        );
        let covered: usize = nonterminal_spans.iter().map(Span::len).sum();
        let source_terminals = span.len().checked_sub(covered).unwrap_or_else(|| {
            panic!("nonterminal spans {:?} do not fit into {}", nonterminal_spans, span)
        });

        let mut scores = target.scores.clone();
        for r in &self.stateless {
            let slot = self.layout.slot(r.slot);
            r.feature
                .evaluate_with_source_context(input, span, &target, scores.get_mut(slot));
        }
        for r in &self.stateful {
            let slot = self.layout.slot(r.slot);
            r.feature
                .evaluate_with_source_context(input, span, &target, scores.get_mut(slot));
        }

        RuleApplication {
            target,
            span,
            nonterminal_spans,
            source_terminals,
            scores,
        }
    }

    pub(crate) fn evaluate_stateless(&self, hypo: &HypothesisView, scores: &mut ScoreBreakdown) {
        for r in self.stateless.iter().filter(|r| !r.ignored) {
            r.feature
                .evaluate_when_applied(hypo, scores.get_mut(self.layout.slot(r.slot)));
        }
    }

    /// Scores `hypo` with all stateful features and returns their states in
    /// slot order.
    pub(crate) fn evaluate_stateful(
        &self,
        hypo: &HypothesisView,
        worker: &mut WorkerContext,
        scores: &mut ScoreBreakdown,
        ngram: &mut ScoreBreakdown,
        prefix: &mut ScoreBreakdown,
        states: &mut Vec<Box<dyn FeatureState>>,
    ) {
        states.clear();
        for (i, r) in self.stateful.iter().enumerate() {
            if r.ignored {
                states.push(r.feature.empty_state(hypo.input()));
                continue;
            }
            let slot = self.layout.slot(r.slot);
            let acc = AppliedScores {
                scores: scores.get_mut(slot),
                ngram: ngram.get_mut(slot),
                prefix: prefix.get_mut(slot),
            };
            states.push(r.feature.evaluate_when_applied(hypo, i, worker, acc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::rule_scores::RuleScores;
    use super::word_penalty::WordPenalty;
    use super::*;
    use crate::phrase::{words, TargetPhrase};

    fn config() -> DecoderConfig {
        DecoderConfig::default()
            .with_weights("RuleTable0", vec![1.0, 0.5])
            .with_weights("WordPenalty", vec![-1.0])
    }

    #[test]
    fn layout_in_registration_order() {
        let features = FeatureSet::builder()
            .stateless(RuleScores::new("RuleTable0", 2))
            .stateless(WordPenalty::new())
            .build(&config())
            .unwrap();
        let layout = features.layout();
        assert_eq!(layout.size(), 3);
        assert_eq!(layout.slot(0).name, "RuleTable0");
        assert_eq!(layout.slot(1).offset, 2);
        assert_eq!(features.weights().as_slice(), &[1.0, 0.5, -1.0]);
        assert_eq!(features.context_window(), 0);
    }

    #[test]
    fn missing_and_mismatched_weights() {
        let err = FeatureSet::builder()
            .stateless(WordPenalty::new())
            .build(&DecoderConfig::default())
            .err();
        match err {
            Some(DecoderError::MissingWeights { feature }) => assert_eq!(feature, "WordPenalty"),
            other => panic!("unexpected {:?}", other.map(|e| e.to_string())),
        }

        let config = DecoderConfig::default().with_weights("WordPenalty", vec![1.0, 2.0]);
        match FeatureSet::builder().stateless(WordPenalty::new()).build(&config).err() {
            Some(DecoderError::WeightArity { expected: 1, found: 2, .. }) => (),
            other => panic!("unexpected {:?}", other.map(|e| e.to_string())),
        }
    }

    #[test]
    fn duplicate_feature() {
        let config = config();
        match FeatureSet::builder()
            .stateless(WordPenalty::new())
            .stateless(WordPenalty::new())
            .build(&config)
            .err()
        {
            Some(DecoderError::DuplicateFeature(name)) => assert_eq!(name, "WordPenalty"),
            other => panic!("unexpected {:?}", other.map(|e| e.to_string())),
        }
    }

    #[test]
    fn isolation_and_source_context() {
        let features = FeatureSet::builder()
            .stateless(RuleScores::new("RuleTable0", 2))
            .stateless(WordPenalty::new())
            .build(&config())
            .unwrap();
        let mut target = TargetPhrase::parse("the [X,0] house").with_rule_scores(vec![-0.5, -1.5]);
        features.evaluate_in_isolation(&words("das [X] haus"), &mut target);
        assert_eq!(target.scores.as_slice(), &[-0.5, -1.5, -2.0]);

        let input = Sentence::from("das kleine haus");
        let rule = features.apply_rule(
            &input,
            Arc::new(target),
            Span::new(0, 3),
            vec![Span::new(1, 2)],
        );
        assert_eq!(rule.source_terminals, 2);
        assert_eq!(rule.scores.as_slice(), &[-0.5, -1.5, -2.0]);
    }

    #[test]
    #[should_panic(expected = "not scored in isolation")]
    fn unscored_phrase() {
        let features = FeatureSet::builder()
            .stateless(WordPenalty::new())
            .build(&config())
            .unwrap();
        features.apply_rule(
            &Sentence::from("a"),
            Arc::new(TargetPhrase::parse("a")),
            Span::new(0, 1),
            vec![],
        );
    }
}
