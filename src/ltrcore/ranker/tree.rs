use serde::{Serialize, Deserialize};
use crate::ltrcore::{LtrError, Result};
use super::{FeatureVector, LtrRanker};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        output: f32,
    },
}

impl Node {
    // goes left when the feature value is below the threshold
    pub fn eval(&self, vector: &FeatureVector) -> f32 {
        let mut node = self;
        loop {
            match node {
                Node::Split { feature, threshold, left, right } => {
                    node = if vector.feature_score(*feature) < *threshold { left.as_ref() } else { right.as_ref() };
                },
                Node::Leaf { output } => return *output,
            }
        }
    }

    fn max_feature(&self) -> Option<usize> {
        match self {
            Node::Split { feature, left, right, .. } => {
                let children = left.max_feature().max(right.max_feature());
                Some(children.map_or(*feature, |c| c.max(*feature)))
            },
            Node::Leaf { .. } => None,
        }
    }
}

/// Sum of the outputs of every tree of the ensemble.
#[derive(Debug, Clone)]
pub struct NaiveAdditiveDecisionTree {
    name: String,
    trees: Vec<Node>,
    feature_count: usize,
    default_score: f32,
}

impl NaiveAdditiveDecisionTree {
    pub fn new(name: &str, trees: Vec<Node>, feature_count: usize, default_score: f32) -> Self {
        NaiveAdditiveDecisionTree {
            name: name.to_string(),
            trees,
            feature_count,
            default_score,
        }
    }

    // every split must reference a feature of the set
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.trees.iter().filter_map(|t| t.max_feature()).max() {
            if max >= self.feature_count {
                return Err(LtrError::InvalidDefinition {
                    name: self.name.clone(),
                    reason: format!("split on feature {} but only {} features", max, self.feature_count),
                });
            }
        }
        Ok(())
    }
}

impl LtrRanker for NaiveAdditiveDecisionTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn default_score(&self) -> f32 {
        self.default_score
    }

    fn score(&self, vector: &FeatureVector) -> f32 {
        self.trees.iter().map(|t| t.eval(vector)).sum()
    }
}
