use super::{FeatureVector, LtrRanker};

// score = sum(weight[i] * fv[i])
#[derive(Debug, Clone)]
pub struct LinearRanker {
    name: String,
    weights: Vec<f32>,
    default_score: f32,
}

impl LinearRanker {
    pub fn new(name: &str, weights: Vec<f32>, default_score: f32) -> Self {
        LinearRanker {
            name: name.to_string(),
            weights,
            default_score,
        }
    }
}

impl LtrRanker for LinearRanker {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> usize {
        self.weights.len()
    }

    fn default_score(&self) -> f32 {
        self.default_score
    }

    fn score(&self, vector: &FeatureVector) -> f32 {
        self.weights
            .iter()
            .enumerate()
            .fold(0f32, |sum, (i, w)| sum + w * vector.feature_score(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_score() {
        let ranker = LinearRanker::new("lin", vec![1.0, 2.0, -0.5], 1.0);
        let mut fv = ranker.new_feature_vector(None);
        fv.set_feature_score(0, 2.0);
        fv.set_feature_score(2, 4.0);
        // unset ordinal 1 reads as the default 1.0
        assert_eq!(ranker.score(&fv), 2.0 + 2.0 - 2.0);
        assert_eq!(ranker.feature_count(), 3);
        assert_eq!(ranker.name(), "lin");
    }
}
