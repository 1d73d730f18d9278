use std::sync::Arc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use super::{FeatureVector, LtrRanker};

/// Receives the feature values of the document being logged.
pub trait LogConsumer: Send {
    // starts a fresh log for hit `hit`, dropping the state of the previous doc
    fn next_doc(&mut self, hit: usize);

    fn accept(&mut self, ordinal: usize, score: f32);

    // free-form values logged next to the features, created on first use
    fn extra_logging_map(&mut self) -> &mut Map<String, Value>;
}

pub type SharedLogConsumer = Arc<Mutex<dyn LogConsumer>>;

// Hands every matched feature value to a log consumer, then delegates
// scoring to the wrapped ranker.
#[derive(Clone)]
pub struct LogLtrRanker {
    ranker: Arc<dyn LtrRanker>,
    consumer: SharedLogConsumer,
}

impl LogLtrRanker {
    pub fn new(ranker: Arc<dyn LtrRanker>, consumer: SharedLogConsumer) -> Self {
        LogLtrRanker { ranker, consumer }
    }
}

impl std::fmt::Debug for LogLtrRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLtrRanker").field("ranker", &self.ranker).finish()
    }
}

impl LtrRanker for LogLtrRanker {
    fn name(&self) -> &str {
        self.ranker.name()
    }

    fn feature_count(&self) -> usize {
        self.ranker.feature_count()
    }

    fn default_score(&self) -> f32 {
        self.ranker.default_score()
    }

    fn new_feature_vector(&self, reuse: Option<FeatureVector>) -> FeatureVector {
        self.ranker.new_feature_vector(reuse)
    }

    fn score(&self, vector: &FeatureVector) -> f32 {
        {
            let mut consumer = self.consumer.lock();
            for (ordinal, score) in vector.set_scores() {
                consumer.accept(ordinal, score);
            }
        }
        self.ranker.score(vector)
    }

    fn log_consumer(&self) -> Option<&SharedLogConsumer> {
        Some(&self.consumer)
    }
}
