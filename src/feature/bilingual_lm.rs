//! A bilingual neural language model: every target word is predicted from
//! its target history and a window of source words around the source word
//! it is aligned to.
//!
//! The network itself is a black box behind `NeuralBackend`. The backend is
//! loaded once and shared; each worker lazily builds its own
//! `NeuralInstance` (scratch buffers, caches), which is never shared.

use super::vocab::VocabCache;
use super::{
    downcast_state, AppliedScores, FeatureFunction, FeatureState, StatefulFeature, WorkerContext,
};
use crate::error::DecoderError;
use crate::hypothesis::HypothesisView;
use crate::phrase::{Sentence, Word};
use log_domain::LogDomain;
use serde::Deserialize;
use std::any::Any;
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A loaded model, shared by all workers.
pub trait NeuralBackend: Send + Sync {
    /// The id of a source word; unknown words map to the unknown-word id.
    fn source_id(&self, word: &str) -> usize;
    /// The id of a target word; unknown words map to the unknown-word id.
    fn target_id(&self, word: &str) -> usize;
    fn bos_id(&self) -> usize;
    fn eos_id(&self) -> usize;
    /// A fresh per-worker instance of the model.
    fn new_instance(&self) -> Result<Box<dyn NeuralInstance>, String>;
}

/// The mutable part of a model, owned by exactly one worker.
pub trait NeuralInstance: Send {
    /// The probability of the last id of `ngram` given all others, i.e. the
    /// source window followed by the target history.
    fn probability(&mut self, ngram: &[usize]) -> LogDomain<f64>;
}

/// Reads a model from disk.
pub type BackendLoader = Box<dyn Fn(&Path) -> io::Result<Arc<dyn NeuralBackend>> + Send + Sync>;

fn default_name() -> String {
    "BilingualLM".to_string()
}

fn default_order() -> usize {
    4
}

fn default_source_window() -> usize {
    9
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BilingualLmConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub path: PathBuf,
    /// Order of the target n-grams.
    #[serde(default = "default_order")]
    pub order: usize,
    /// Number of source words the model sees.
    #[serde(default = "default_source_window")]
    pub source_window: usize,
}

impl BilingualLmConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        BilingualLmConfig {
            name: default_name(),
            path: path.into(),
            order: default_order(),
            source_window: default_source_window(),
        }
    }
}

/// The state of a hypothesis: the length of its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilingualLmState {
    pub target_len: usize,
}

impl FeatureState for BilingualLmState {
    fn compare(&self, other: &dyn FeatureState) -> Ordering {
        self.target_len
            .cmp(&downcast_state::<BilingualLmState>(other).target_len)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Loaded {
    backend: Arc<dyn NeuralBackend>,
    bos: usize,
    eos: usize,
}

pub struct BilingualLm {
    config: BilingualLmConfig,
    loader: BackendLoader,
    model: Option<Loaded>,
    source_vocab: VocabCache,
    target_vocab: VocabCache,
}

impl BilingualLm {
    pub fn new(config: BilingualLmConfig, loader: BackendLoader) -> Self {
        BilingualLm {
            config,
            loader,
            model: None,
            source_vocab: VocabCache::new(),
            target_vocab: VocabCache::new(),
        }
    }

    pub fn config(&self) -> &BilingualLmConfig {
        &self.config
    }

    fn model(&self) -> &Loaded {
        match self.model {
            Some(ref m) => m,
            None => panic!("feature `{}` used before it was loaded", self.config.name),
        }
    }

    fn new_instance(&self) -> Result<Box<dyn NeuralInstance>, DecoderError> {
        self.model()
            .backend
            .new_instance()
            .map_err(|reason| DecoderError::ScratchInit {
                feature: self.config.name.clone(),
                reason,
            })
    }

    fn source_id(&self, word: &Word) -> usize {
        let backend = &self.model().backend;
        self.source_vocab
            .get_or_insert_with(word, |w| backend.source_id(w))
    }

    fn target_id(&self, word: &Word) -> usize {
        let backend = &self.model().backend;
        self.target_vocab
            .get_or_insert_with(word, |w| backend.target_id(w))
    }

    /// Appends the ids of the `source_window` words centred on `center`,
    /// padded with sentence boundary ids.
    fn push_source_window(&self, input: &Sentence, center: usize, ngram: &mut Vec<usize>) {
        let window = self.config.source_window;
        if window == 0 {
            return;
        }
        let model = self.model();
        let left = (window - 1) / 2;
        for i in 0..window {
            let position = (center + i).checked_sub(left);
            let id = match position {
                None => model.bos,
                Some(p) => match input.get(p) {
                    Some(w) => self.source_id(w),
                    None => model.eos,
                },
            };
            ngram.push(id);
        }
    }
}

impl FeatureFunction for BilingualLm {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn num_scores(&self) -> usize {
        1
    }

    fn load(&mut self) -> Result<(), DecoderError> {
        if self.config.order == 0 {
            return Err(DecoderError::InvalidParameter {
                feature: self.config.name.clone(),
                reason: "order must be at least 1".to_string(),
            });
        }
        let backend = (self.loader)(&self.config.path).map_err(|source| {
            DecoderError::ResourceLoad {
                feature: self.config.name.clone(),
                path: self.config.path.clone(),
                source,
            }
        })?;
        let model = Loaded {
            bos: backend.bos_id(),
            eos: backend.eos_id(),
            backend,
        };
        self.model = Some(model);
        // construction problems of worker instances must show up now
        self.new_instance()?;
        tracing::info!(
            feature = self.config.name.as_str(),
            path = %self.config.path.display(),
            order = self.config.order,
            source_window = self.config.source_window,
            "loaded bilingual language model"
        );
        Ok(())
    }
}

impl StatefulFeature for BilingualLm {
    fn context_window(&self) -> usize {
        self.config.order.saturating_sub(1)
    }

    fn empty_state(&self, _input: &Sentence) -> Box<dyn FeatureState> {
        Box::new(BilingualLmState { target_len: 0 })
    }

    fn evaluate_when_applied(
        &self,
        hypo: &HypothesisView,
        slot: usize,
        worker: &mut WorkerContext,
        acc: AppliedScores,
    ) -> Box<dyn FeatureState> {
        let target = hypo.target_phrase();
        let mut target_len = target.num_terminals();
        for i in 0..hypo.arity() {
            target_len += downcast_state::<BilingualLmState>(hypo.prev_state(i, slot)).target_len;
        }

        let history_len = self.config.order - 1;
        let bos = self.model().bos;
        let instance = worker.get_or_init(slot, &self.config.name, || self.new_instance());
        let mut ngram = Vec::with_capacity(self.config.source_window + self.config.order);
        for (position, word) in target.terminals() {
            ngram.clear();
            let center = hypo.span().start + target.aligned_source(position).unwrap_or(0);
            self.push_source_window(hypo.input(), center, &mut ngram);

            let (history, complete) = hypo.left_context(position, history_len);
            ngram.extend((history.len()..history_len).map(|_| bos));
            ngram.extend(history.iter().map(|w| self.target_id(w)));
            ngram.push(self.target_id(word));

            let score = instance.probability(&ngram).ln();
            acc.scores[0] += score;
            if complete {
                acc.ngram[0] += score;
            } else {
                acc.prefix[0] += score;
            }
        }

        Box::new(BilingualLmState { target_len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrase::word;

    struct Uniform;

    impl NeuralBackend for Uniform {
        fn source_id(&self, word: &str) -> usize {
            word.len() + 10
        }
        fn target_id(&self, word: &str) -> usize {
            word.len() + 100
        }
        fn bos_id(&self) -> usize {
            1
        }
        fn eos_id(&self) -> usize {
            2
        }
        fn new_instance(&self) -> Result<Box<dyn NeuralInstance>, String> {
            Err("out of memory".to_string())
        }
    }

    fn loader() -> BackendLoader {
        Box::new(|_: &Path| Ok(Arc::new(Uniform) as Arc<dyn NeuralBackend>))
    }

    #[test]
    fn config_defaults() {
        let config: BilingualLmConfig =
            serde_json::from_str(r#"{ "path": "model.bin", "order": 3 }"#).unwrap();
        assert_eq!(config.name, "BilingualLM");
        assert_eq!(config.order, 3);
        assert_eq!(config.source_window, 9);
        assert!(serde_json::from_str::<BilingualLmConfig>(r#"{ "path": "m", "typo": 1 }"#).is_err());
    }

    #[test]
    fn loading_errors() {
        let missing: BackendLoader = Box::new(|_: &Path| {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
        });
        let mut lm = BilingualLm::new(BilingualLmConfig::new("nplm.bin"), missing);
        match lm.load() {
            Err(DecoderError::ResourceLoad { path, .. }) => assert_eq!(path, PathBuf::from("nplm.bin")),
            other => panic!("unexpected {:?}", other.map_err(|e| e.to_string())),
        }

        let mut lm = BilingualLm::new(BilingualLmConfig::new("nplm.bin"), loader());
        match lm.load() {
            Err(DecoderError::ScratchInit { reason, .. }) => assert_eq!(reason, "out of memory"),
            other => panic!("unexpected {:?}", other.map_err(|e| e.to_string())),
        }

        let mut config = BilingualLmConfig::new("nplm.bin");
        config.order = 0;
        let mut lm = BilingualLm::new(config, loader());
        assert!(matches!(lm.load(), Err(DecoderError::InvalidParameter { .. })));
    }

    #[test]
    fn source_window_is_padded() {
        let mut config = BilingualLmConfig::new("nplm.bin");
        config.source_window = 3;
        let mut lm = BilingualLm::new(config, loader());
        lm.model = Some(Loaded {
            backend: Arc::new(Uniform),
            bos: 1,
            eos: 2,
        });
        let input = Sentence::from("a bb");
        let mut ngram = Vec::new();
        lm.push_source_window(&input, 0, &mut ngram);
        assert_eq!(ngram, vec![1, 11, 12]);
        ngram.clear();
        lm.push_source_window(&input, 1, &mut ngram);
        assert_eq!(ngram, vec![11, 12, 2]);
        assert_eq!(lm.source_vocab.get("bb"), Some(12));
        assert_eq!(lm.target_id(&word("bb")), 102);
    }

    #[test]
    fn states_compare_by_length() {
        let a = BilingualLmState { target_len: 2 };
        let b = BilingualLmState { target_len: 3 };
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(a.compare(&a.clone()), Ordering::Equal);
    }
}
