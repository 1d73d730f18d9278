use super::{FeatureVector, LtrRanker};

// Computes no score, used when only the feature values are of interest.
#[derive(Debug, Clone)]
pub struct NullRanker {
    feature_count: usize,
}

impl NullRanker {
    pub fn new(feature_count: usize) -> Self {
        NullRanker { feature_count }
    }
}

impl LtrRanker for NullRanker {
    fn name(&self) -> &str {
        "null_ranker"
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn score(&self, _vector: &FeatureVector) -> f32 {
        0.0
    }
}
