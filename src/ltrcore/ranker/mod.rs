//! Ranking models: a function from a per-document feature vector to one score.

pub mod linear;
pub mod logger;
pub mod null;
pub mod tree;

use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use crate::ltrcore::{LtrError, Result};
pub use linear::LinearRanker;
pub use logger::{LogConsumer, LogLtrRanker, SharedLogConsumer};
pub use null::NullRanker;
pub use tree::{NaiveAdditiveDecisionTree, Node};

/// Per-document feature scores, indexed by feature ordinal.
///
/// Ordinals never set for the current document read as the model's
/// default. The buffer is reset between documents, not reallocated.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    scores: Vec<f32>,
    set: Vec<bool>,
    default_score: f32,
}

impl FeatureVector {
    pub fn new(size: usize, default_score: f32) -> Self {
        FeatureVector {
            scores: vec![default_score; size],
            set: vec![false; size],
            default_score,
        }
    }

    pub fn reset(&mut self) {
        let default_score = self.default_score;
        self.scores.fill(default_score);
        self.set.fill(false);
    }

    pub fn set_feature_score(&mut self, ordinal: usize, score: f32) {
        self.scores[ordinal] = score;
        self.set[ordinal] = true;
    }

    pub fn feature_score(&self, ordinal: usize) -> f32 {
        self.scores.get(ordinal).copied().unwrap_or(self.default_score)
    }

    pub fn is_set(&self, ordinal: usize) -> bool {
        self.set.get(ordinal).copied().unwrap_or(false)
    }

    // (ordinal, score) of every feature set for the current document
    pub fn set_scores(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.scores
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.set[*i])
            .map(|(i, s)| (i, *s))
    }

    pub fn default_score(&self) -> f32 {
        self.default_score
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

pub trait LtrRanker: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn feature_count(&self) -> usize;

    // value of a feature that did not match
    fn default_score(&self) -> f32 {
        0.0
    }

    fn new_feature_vector(&self, reuse: Option<FeatureVector>) -> FeatureVector {
        match reuse {
            Some(mut fv) if fv.len() == self.feature_count() && fv.default_score() == self.default_score() => {
                fv.reset();
                fv
            },
            _ => FeatureVector::new(self.feature_count(), self.default_score()),
        }
    }

    fn score(&self, vector: &FeatureVector) -> f32;

    // set when the ranker records feature values for logging
    fn log_consumer(&self) -> Option<&SharedLogConsumer> {
        None
    }
}

/// In-memory model definition, as found in model files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDefinition {
    Linear {
        weights: Vec<f32>,
        #[serde(default)]
        default_score: f32,
    },
    TreeEnsemble {
        trees: Vec<Node>,
        #[serde(default)]
        default_score: f32,
    },
    Null,
}

impl ModelDefinition {
    pub fn to_ranker(&self, name: &str, feature_count: usize) -> Result<Arc<dyn LtrRanker>> {
        let ranker: Arc<dyn LtrRanker> = match self {
            ModelDefinition::Linear { weights, default_score } => {
                Arc::new(LinearRanker::new(name, weights.clone(), *default_score))
            },
            ModelDefinition::TreeEnsemble { trees, default_score } => {
                let tree = NaiveAdditiveDecisionTree::new(name, trees.clone(), feature_count, *default_score);
                tree.validate()?;
                Arc::new(tree)
            },
            ModelDefinition::Null => Arc::new(NullRanker::new(feature_count)),
        };
        if ranker.feature_count() != feature_count {
            return Err(LtrError::FeatureCountMismatch {
                model: name.to_string(),
                expected: ranker.feature_count(),
                got: feature_count,
            });
        }
        Ok(ranker)
    }
}
