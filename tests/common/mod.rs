#![allow(dead_code)]

use hierodec::feature::rule_scores::RuleScores;
use hierodec::feature::{
    downcast_state, AppliedScores, FeatureFunction, FeatureSet, FeatureState, StatefulFeature,
    WorkerContext,
};
use hierodec::hypothesis::HypothesisView;
use hierodec::phrase::{Sentence, TargetPhrase, Word};
use hierodec::search::{Decoder, SentenceSearch};
use hierodec::{DecoderConfig, HypoId, Span};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

/// Penalises every target word that repeats the word directly before it.
pub struct Repetition {
    window: usize,
}

impl Repetition {
    /// `window` only widens the boundary context hypotheses keep.
    pub fn with_window(window: usize) -> Self {
        assert!(window >= 1);
        Repetition { window }
    }
}

#[derive(Debug)]
pub struct LastWord(pub Option<Word>);

impl FeatureState for LastWord {
    fn compare(&self, other: &dyn FeatureState) -> Ordering {
        self.0.cmp(&downcast_state::<LastWord>(other).0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FeatureFunction for Repetition {
    fn name(&self) -> &str {
        "Repetition"
    }

    fn num_scores(&self) -> usize {
        1
    }
}

impl StatefulFeature for Repetition {
    fn context_window(&self) -> usize {
        self.window
    }

    fn empty_state(&self, _input: &Sentence) -> Box<dyn FeatureState> {
        Box::new(LastWord(None))
    }

    fn evaluate_when_applied(
        &self,
        hypo: &HypothesisView,
        _slot: usize,
        _worker: &mut WorkerContext,
        acc: AppliedScores,
    ) -> Box<dyn FeatureState> {
        for (position, word) in hypo.target_phrase().terminals() {
            let (history, complete) = hypo.left_context(position, 1);
            let penalty = if history.last() == Some(word) { -1.0 } else { 0.0 };
            acc.scores[0] += penalty;
            if complete {
                acc.ngram[0] += penalty;
            } else {
                acc.prefix[0] += penalty;
            }
        }
        Box::new(LastWord(hypo.hypothesis().suffix().last().cloned()))
    }
}

pub fn config() -> DecoderConfig {
    DecoderConfig::default()
        .with_weights("RuleTable0", vec![1.0])
        .with_weights("Repetition", vec![1.0])
}

/// Rule scores plus the repetition penalty with the given window.
pub fn decoder(config: DecoderConfig, window: usize) -> Decoder {
    let features = FeatureSet::builder()
        .stateless(RuleScores::new("RuleTable0", 1))
        .stateful(Repetition::with_window(window))
        .build(&config)
        .unwrap();
    Decoder::new(features, config)
}

/// Rule scores only; all hypotheses over the same span recombine.
pub fn stateless_decoder(config: DecoderConfig) -> Decoder {
    let features = FeatureSet::builder()
        .stateless(RuleScores::new("RuleTable0", 1))
        .build(&config)
        .unwrap();
    Decoder::new(features, config)
}

/// Scores `template` in isolation and applies it over `span`.
pub fn rule(
    search: &SentenceSearch,
    decoder: &Decoder,
    template: &str,
    score: f64,
    span: Span,
    nonterminal_spans: Vec<Span>,
) -> Arc<hierodec::phrase::RuleApplication> {
    let mut target = TargetPhrase::parse(template).with_rule_scores(vec![score]);
    let source = search.input().slice(span).to_vec();
    decoder.features().evaluate_in_isolation(&source, &mut target);
    search.apply_rule(Arc::new(target), span, nonterminal_spans)
}

/// A hypothesis without antecedents.
pub fn leaf(search: &mut SentenceSearch, decoder: &Decoder, template: &str, score: f64, span: Span) -> HypoId {
    let r = rule(search, decoder, template, score, span, vec![]);
    search.create_hypothesis(r, &[])
}

pub fn output(search: &SentenceSearch, id: HypoId) -> String {
    search
        .output_phrase(id)
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
