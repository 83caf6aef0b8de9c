//! Hypothesis management for chart-based hierarchical translation decoders.
//!
//! The crate represents, scores and recombines the partial translations
//! ("hypotheses") a chart decoder builds by applying synchronous rules over
//! spans of the input, and reads the best and the k best derivations off the
//! finished chart. Rule lookup and cube pruning are left to the caller; see
//! `search::SentenceSearch` for the surface it uses.

pub mod config;
pub mod error;
pub mod feature;
pub mod hypothesis;
pub mod kbest;
pub mod phrase;
pub mod score;
pub mod search;
pub mod span;

pub use crate::config::DecoderConfig;
pub use crate::error::DecoderError;
pub use crate::feature::{FeatureSet, FeatureState, StatefulFeature, StatelessFeature};
pub use crate::hypothesis::{HypoId, Hypothesis, RecombinationIndex, Recombined};
pub use crate::phrase::{Sentence, TargetPhrase, Word};
pub use crate::score::Score;
pub use crate::search::{Decoder, SentenceSearch, Worker};
pub use crate::span::Span;
