use super::{FeatureFunction, StatelessFeature};
use crate::phrase::{TargetPhrase, Word};

/// Penalises every target word by `-1`.
pub struct WordPenalty {
    name: String,
}

impl WordPenalty {
    pub fn new() -> Self {
        WordPenalty::named("WordPenalty")
    }

    pub fn named(name: &str) -> Self {
        WordPenalty {
            name: name.to_string(),
        }
    }
}

impl Default for WordPenalty {
    fn default() -> Self {
        WordPenalty::new()
    }
}

impl FeatureFunction for WordPenalty {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_scores(&self) -> usize {
        1
    }

    fn evaluate_in_isolation(
        &self,
        _source: &[Word],
        target: &TargetPhrase,
        scores: &mut [f64],
        _future: &mut [f64],
    ) {
        scores[0] -= target.num_terminals() as f64;
    }
}

impl StatelessFeature for WordPenalty {}
