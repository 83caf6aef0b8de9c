//! The surface a chart search uses to build, recombine and read off
//! hypotheses of one sentence.
//!
//! A `Decoder` holds everything that is shared between workers. Each worker
//! thread owns a `Worker` (its arena and feature scratch) and opens one
//! `SentenceSearch` per sentence; closing it releases all hypotheses of the
//! sentence at once.

use crate::config::DecoderConfig;
use crate::feature::{FeatureSet, WorkerContext};
use crate::hypothesis::{
    collect_prefix, collect_suffix, output_phrase, recombination, Buffers, HypoId, Hypothesis,
    HypothesisArena, HypothesisIds, HypothesisView, RecombinationIndex, Recombined,
};
use crate::kbest::{KBestEntry, KBestIterator};
use crate::phrase::{RuleApplication, Sentence, TargetPhrase, Word};
use crate::score::{Score, ScoreBreakdown};
use crate::span::Span;
use num_traits::Zero;
use std::sync::Arc;

/// Everything shared read-only (or behind locks) by all workers.
pub struct Decoder {
    features: FeatureSet,
    config: DecoderConfig,
    ids: HypothesisIds,
}

impl Decoder {
    pub fn new(features: FeatureSet, config: DecoderConfig) -> Self {
        Decoder {
            features,
            config,
            ids: HypothesisIds::new(),
        }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn ids(&self) -> &HypothesisIds {
        &self.ids
    }

    pub fn new_worker(&self, id: usize) -> Worker {
        Worker {
            context: WorkerContext::new(id),
            arena: HypothesisArena::with_capacity(self.config.pool_capacity),
            delta: Delta::default(),
        }
    }

    /// Starts decoding `input` with the resources of `worker`.
    pub fn search<'a>(&'a self, worker: &'a mut Worker, input: &'a Sentence) -> SentenceSearch<'a> {
        tracing::debug!(
            worker = worker.context.worker_id(),
            words = input.len(),
            "starting sentence"
        );
        SentenceSearch {
            decoder: self,
            worker,
            input,
        }
    }
}

// score deltas of the search-time phase, reused for every hypothesis
#[derive(Default)]
struct Delta {
    scores: ScoreBreakdown,
    ngram: ScoreBreakdown,
    prefix: ScoreBreakdown,
}

impl Delta {
    fn reset(&mut self, size: usize) {
        self.scores.reset(size);
        self.ngram.reset(size);
        self.prefix.reset(size);
    }
}

/// The resources owned by one decoding thread.
pub struct Worker {
    context: WorkerContext,
    arena: HypothesisArena,
    delta: Delta,
}

impl Worker {
    pub fn id(&self) -> usize {
        self.context.worker_id()
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    pub fn arena(&self) -> &HypothesisArena {
        &self.arena
    }
}

pub struct SentenceSearch<'a> {
    decoder: &'a Decoder,
    worker: &'a mut Worker,
    input: &'a Sentence,
}

impl<'a> SentenceSearch<'a> {
    pub fn input(&self) -> &Sentence {
        self.input
    }

    pub fn arena(&self) -> &HypothesisArena {
        &self.worker.arena
    }

    pub fn hypothesis(&self, id: HypoId) -> &Hypothesis {
        self.worker.arena.get(id)
    }

    /// Instantiates a target phrase over `span` (see
    /// `FeatureSet::apply_rule`).
    pub fn apply_rule(
        &self,
        target: Arc<TargetPhrase>,
        span: Span,
        nonterminal_spans: Vec<Span>,
    ) -> Arc<RuleApplication> {
        Arc::new(
            self.decoder
                .features
                .apply_rule(self.input, target, span, nonterminal_spans),
        )
    }

    /// Builds and scores the hypothesis that applies `rule` to
    /// `antecedents`, one per nonterminal in source order.
    ///
    /// # Panics
    ///
    /// If the antecedents do not fit the rule: wrong number, wrong spans,
    /// released or already recombined into another hypothesis.
    pub fn create_hypothesis(&mut self, rule: Arc<RuleApplication>, antecedents: &[HypoId]) -> HypoId {
        let features = &self.decoder.features;
        let worker = &mut *self.worker;

        assert_eq!(
            antecedents.len(),
            rule.arity(),
            "rule `{}` over {} applied to {} antecedents",
            rule.target,
            rule.span,
            antecedents.len()
        );
        assert!(
            rule.span.is_tiled_by(&rule.nonterminal_spans, rule.source_terminals),
            "nonterminal spans {:?} and {} terminals do not tile {}",
            rule.nonterminal_spans,
            rule.source_terminals,
            rule.span
        );
        for (&ante, &span) in antecedents.iter().zip(&rule.nonterminal_spans) {
            let a = match worker.arena.try_get(ante) {
                Some(a) => a,
                None => panic!("antecedent {} of rule `{}` was released", ante, rule.target),
            };
            assert!(!a.demoted, "antecedent {} was recombined into another hypothesis", a.id);
            assert_eq!(a.span(), span, "antecedent {} does not cover {}", a.id, span);
        }

        let Buffers {
            antecedents: mut ante_ids,
            mut prefix,
            mut suffix,
            mut scores,
            mut lm_ngram,
            mut lm_prefix,
            mut states,
            arcs,
        } = worker.arena.take_buffers();

        let size = features.layout().size();
        let window = features.context_window();
        ante_ids.extend_from_slice(antecedents);
        scores.reset(size);
        lm_ngram.reset(size);
        lm_prefix.reset(size);
        let mut num_target_terminals = rule.target.num_terminals();
        {
            let antes: Vec<&Hypothesis> = antecedents.iter().map(|&a| worker.arena.get(a)).collect();
            collect_prefix(&rule.target.symbols, &antes, window, &mut prefix);
            collect_suffix(&rule.target.symbols, &antes, window, &mut suffix);
            for a in &antes {
                scores.plus_equals(&a.scores);
                lm_ngram.plus_equals(&a.lm_ngram);
                lm_prefix.plus_equals(&a.lm_prefix);
                num_target_terminals += a.num_target_terminals;
            }
        }
        scores.plus_equals(&rule.scores);

        let mut hypo = Hypothesis {
            id: self.decoder.ids.next_id(),
            rule,
            antecedents: ante_ids,
            prefix,
            suffix,
            context_window: window,
            scores,
            lm_ngram,
            lm_prefix,
            total: Score::zero(),
            states: Vec::new(),
            num_target_terminals,
            arcs,
            winning: None,
            demoted: false,
            expanded: false,
        };

        worker.delta.reset(size);
        {
            let view = HypothesisView {
                hypo: &hypo,
                arena: &worker.arena,
                input: self.input,
            };
            let delta = &mut worker.delta;
            features.evaluate_stateless(&view, &mut delta.scores);
            features.evaluate_stateful(
                &view,
                &mut worker.context,
                &mut delta.scores,
                &mut delta.ngram,
                &mut delta.prefix,
                &mut states,
            );
        }
        hypo.scores.plus_equals(&worker.delta.scores);
        hypo.lm_ngram.plus_equals(&worker.delta.ngram);
        hypo.lm_prefix.plus_equals(&worker.delta.prefix);
        hypo.states = states;
        hypo.total = hypo.scores.inner_product(features.weights());

        tracing::trace!(hypothesis = %hypo, "created hypothesis");
        let id = worker.arena.insert(hypo);
        for &a in antecedents {
            worker.arena.get_mut(a).expanded = true;
        }
        id
    }

    /// Adds `id` to the recombination classes of its cell.
    pub fn recombine(&mut self, index: &mut RecombinationIndex, id: HypoId) -> Recombined {
        index.add(&mut self.worker.arena, id)
    }

    /// Finishes a cell once no more hypotheses are added to it.
    pub fn finish_cell(&mut self, index: &RecombinationIndex) {
        index.cleanup_arc_lists(&mut self.worker.arena, &self.decoder.config);
    }

    /// Releases hypotheses that will never be used, e.g. those pruned from a
    /// cell.
    pub fn release(&mut self, ids: &[HypoId]) {
        for &id in ids {
            self.worker.arena.release(id);
        }
    }

    /// The target words of the best derivation below `id`.
    pub fn output_phrase(&self, id: HypoId) -> Vec<Word> {
        let mut output = Vec::with_capacity(self.hypothesis(id).num_target_terminals());
        output_phrase(&self.worker.arena, id, &mut output);
        output
    }

    /// The hypotheses of the best derivation below `top`, in pre-order.
    pub fn best_path(&self, top: HypoId) -> Vec<HypoId> {
        recombination::best_path(&self.worker.arena, top)
    }

    /// Up to `n` best derivations below the representatives `tops`.
    pub fn k_best(&self, tops: &[HypoId], n: usize) -> Vec<KBestEntry> {
        let derivations = KBestIterator::new(&self.worker.arena, tops);
        if self.decoder.config.distinct_n_best {
            derivations.distinct().take(n).collect()
        } else {
            derivations.take(n).collect()
        }
    }
}

impl<'a> Drop for SentenceSearch<'a> {
    fn drop(&mut self) {
        tracing::debug!(
            worker = self.worker.context.worker_id(),
            hypotheses = self.worker.arena.len(),
            "finished sentence"
        );
        self.worker.arena.reset();
    }
}
