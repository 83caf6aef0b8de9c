use super::{FeatureFunction, StatelessFeature};
use crate::phrase::{TargetPhrase, Word};

/// Exposes the dense scores a rule table attached to each target phrase,
/// e.g. translation probabilities in both directions.
///
/// Phrases without scores (glue rules, unknown word rules) score zero.
pub struct RuleScores {
    name: String,
    num_scores: usize,
}

impl RuleScores {
    pub fn new(name: &str, num_scores: usize) -> Self {
        RuleScores {
            name: name.to_string(),
            num_scores,
        }
    }
}

impl FeatureFunction for RuleScores {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_scores(&self) -> usize {
        self.num_scores
    }

    fn evaluate_in_isolation(
        &self,
        _source: &[Word],
        target: &TargetPhrase,
        scores: &mut [f64],
        _future: &mut [f64],
    ) {
        if target.rule_scores.is_empty() {
            return;
        }
        assert_eq!(
            target.rule_scores.len(),
            self.num_scores,
            "rule `{}` has {} scores, but `{}` expects {}",
            target,
            target.rule_scores.len(),
            self.name,
            self.num_scores
        );
        for (s, r) in scores.iter_mut().zip(&target.rule_scores) {
            *s += *r;
        }
    }
}

impl StatelessFeature for RuleScores {}
