use std::fs;
use std::path::Path;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use crate::ltrcore::{LtrError, Result};
use crate::ltrcore::query::subquery::SubQuery;
use crate::ltrcore::ranker::{LtrRanker, ModelDefinition};
use super::{Feature, FeatureSet, PrebuiltFeature, StoredFeatureSet};

/// A ranker together with the feature set it was trained on.
#[derive(Debug, Clone)]
pub struct LtrModel {
    name: String,
    feature_set: Arc<FeatureSet>,
    ranker: Arc<dyn LtrRanker>,
}

impl LtrModel {
    pub fn new(name: &str, feature_set: Arc<FeatureSet>, ranker: Arc<dyn LtrRanker>) -> Result<Self> {
        if ranker.feature_count() != feature_set.size() {
            return Err(LtrError::FeatureCountMismatch {
                model: name.to_string(),
                expected: ranker.feature_count(),
                got: feature_set.size(),
            });
        }
        Ok(LtrModel {
            name: name.to_string(),
            feature_set,
            ranker,
        })
    }

    // model over sub-queries that were built ahead of time
    pub fn prebuilt(name: &str, queries: Vec<(&str, SubQuery)>, ranker: Arc<dyn LtrRanker>) -> Result<Self> {
        let features: Vec<Arc<dyn Feature>> = queries
            .into_iter()
            .map(|(n, q)| Arc::new(PrebuiltFeature::new(n, q)) as Arc<dyn Feature>)
            .collect();
        let set = FeatureSet::new(name, features)?;
        Self::new(name, Arc::new(set), ranker)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_set(&self) -> &Arc<FeatureSet> {
        &self.feature_set
    }

    pub fn ranker(&self) -> &Arc<dyn LtrRanker> {
        &self.ranker
    }
}

/// On disk form of a model: its features and its definition.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct ModelFile {
    name: String,
    feature_set: StoredFeatureSet,
    model: ModelDefinition,
}

impl ModelFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn compile(&self) -> Result<LtrModel> {
        let feature_set = self.feature_set.compile()?;
        let ranker = self.model.to_ranker(&self.name, feature_set.size())?;
        LtrModel::new(&self.name, Arc::new(feature_set), ranker)
    }
}
