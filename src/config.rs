use crate::error::DecoderError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Decoder settings relevant to hypothesis management.
///
/// ```
/// use hierodec::config::DecoderConfig;
/// let config = DecoderConfig::from_json_str(r#"{
///     "weights": { "WordPenalty": [-0.5] },
///     "n_best_size": 10
/// }"#).unwrap();
/// assert_eq!(config.n_best_size, 10);
/// assert!(!config.distinct_n_best);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Weights per feature name, one per score component.
    pub weights: BTreeMap<String, Vec<f64>>,
    /// Size of the n-best list; arc lists are trimmed to this size.
    pub n_best_size: usize,
    /// Keeps all arcs, since distinct n-best lists may need more than
    /// `n_best_size` of them.
    pub distinct_n_best: bool,
    /// Features whose search-time evaluation is skipped.
    pub ignored_features: Vec<String>,
    /// Number of released hypotheses whose buffers an arena keeps for reuse.
    pub pool_capacity: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            weights: BTreeMap::new(),
            n_best_size: 0,
            distinct_n_best: false,
            ignored_features: Vec::new(),
            pool_capacity: 1024,
        }
    }
}

impl DecoderConfig {
    pub fn from_json_str(s: &str) -> Result<Self, DecoderError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DecoderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DecoderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn with_weights(mut self, feature: &str, weights: Vec<f64>) -> Self {
        self.weights.insert(feature.to_string(), weights);
        self
    }

    pub fn is_ignored(&self, feature: &str) -> bool {
        self.ignored_features.iter().any(|f| f == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DecoderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert_eq!(config.pool_capacity, 1024);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        match DecoderConfig::from_json_str(r#"{ "nbest": 3 }"#) {
            Err(DecoderError::Config(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_file() {
        match DecoderConfig::from_path("/nonexistent/decoder.json") {
            Err(DecoderError::Io { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/decoder.json"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ignored_features() {
        let config = DecoderConfig::from_json_str(
            r#"{ "ignored_features": ["BilingualLM0"], "distinct_n_best": true }"#,
        )
        .unwrap();
        assert!(config.is_ignored("BilingualLM0"));
        assert!(!config.is_ignored("WordPenalty"));
        assert!(config.distinct_n_best);
    }
}
