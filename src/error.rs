use std::path::PathBuf;
use thiserror::Error;

/// Failures that can occur while setting up a decoder, i.e. before any
/// sentence is searched. Contract violations during search are not errors;
/// they panic.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("feature `{feature}` could not load `{}`: {source}", .path.display())]
    ResourceLoad {
        feature: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("feature `{feature}` could not construct a worker instance: {reason}")]
    ScratchInit { feature: String, reason: String },

    #[error("no weights configured for feature `{feature}`")]
    MissingWeights { feature: String },

    #[error("feature `{feature}` has {expected} scores, but {found} weights were configured")]
    WeightArity {
        feature: String,
        expected: usize,
        found: usize,
    },

    #[error("feature `{0}` is registered twice")]
    DuplicateFeature(String),

    #[error("invalid feature parameter for `{feature}`: {reason}")]
    InvalidParameter { feature: String, reason: String },

    #[error("could not read configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("could not open `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_feature_and_path() {
        let err = DecoderError::ResourceLoad {
            feature: "BilingualLM0".to_string(),
            path: PathBuf::from("/models/blm.nnlm"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("BilingualLM0"));
        assert!(msg.contains("/models/blm.nnlm"));
    }
}
