//! Features, feature sets and the models built on top of them.

pub mod builder;
pub mod model;
pub mod stored;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use crate::ltrcore::{LtrError, Params, Result, TermId};
use crate::ltrcore::analyzer::Analyzer;
use crate::ltrcore::query::subquery::SubQuery;
pub use builder::{QueryBuilder, SltrQueryBuilder};
pub use model::{LtrModel, ModelFile};
pub use stored::{FeatureTemplate, StoredFeature, StoredFeatureSet};

/// What a feature may use to turn query parameters into a sub-query.
#[derive(Clone, Copy, Default)]
pub struct LtrQueryContext<'c> {
    analyzer: Option<&'c Analyzer>,
}

impl<'c> LtrQueryContext<'c> {
    pub fn new(analyzer: &'c Analyzer) -> Self {
        LtrQueryContext { analyzer: Some(analyzer) }
    }

    // context of prebuilt models, features there carry their query already
    pub fn empty() -> Self {
        LtrQueryContext { analyzer: None }
    }

    // words not in the index dictionary cannot match and are dropped
    pub fn terms(&self, text: &str) -> Vec<TermId> {
        match self.analyzer {
            Some(analyzer) => analyzer.parse(text).0,
            None => vec![],
        }
    }

    // empty as soon as one word of the phrase is unknown
    pub fn phrase_terms(&self, text: &str) -> Vec<TermId> {
        match self.analyzer {
            Some(analyzer) => analyzer.parse_phrase(text),
            None => vec![],
        }
    }
}

pub trait Feature: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    // deterministic for the same context and params
    fn to_query(&self, ctx: &LtrQueryContext<'_>, params: &Params) -> Result<SubQuery>;
}

/// Ordered, named features. Ordinals are fixed at construction.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    name: String,
    features: Vec<Arc<dyn Feature>>,
}

impl FeatureSet {
    pub fn new(name: &str, features: Vec<Arc<dyn Feature>>) -> Result<Self> {
        for (i, f) in features.iter().enumerate() {
            if features[..i].iter().any(|other| other.name() == f.name()) {
                return Err(LtrError::InvalidDefinition {
                    name: name.to_string(),
                    reason: format!("feature [{}] defined twice", f.name()),
                });
            }
        }
        Ok(FeatureSet {
            name: name.to_string(),
            features,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.features.len()
    }

    pub fn feature(&self, ordinal: usize) -> &Arc<dyn Feature> {
        &self.features[ordinal]
    }

    pub fn feature_ordinal(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name() == name)
    }

    pub fn to_queries(&self, ctx: &LtrQueryContext<'_>, params: &Params) -> Result<Vec<SubQuery>> {
        self.features.iter().map(|f| f.to_query(ctx, params)).collect()
    }
}

impl PartialEq for FeatureSet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.features.len() == other.features.len()
            && self.features.iter().zip(&other.features).all(|(a, b)| a.name() == b.name())
    }
}

impl Eq for FeatureSet {}

impl Hash for FeatureSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for f in &self.features {
            f.name().hash(state);
        }
    }
}

/// A feature whose sub-query was built ahead of time.
#[derive(Debug, Clone)]
pub struct PrebuiltFeature {
    name: String,
    query: SubQuery,
}

impl PrebuiltFeature {
    pub fn new(name: &str, query: SubQuery) -> Self {
        PrebuiltFeature {
            name: name.to_string(),
            query,
        }
    }
}

impl Feature for PrebuiltFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_query(&self, _ctx: &LtrQueryContext<'_>, _params: &Params) -> Result<SubQuery> {
        Ok(self.query.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltrcore::query::subquery::QueryFloat;

    fn constant(name: &str, score: f32) -> Arc<dyn Feature> {
        Arc::new(PrebuiltFeature::new(name, SubQuery::Constant { score: QueryFloat(score) }))
    }

    #[test]
    fn test_feature_set() {
        let set = FeatureSet::new("set", vec![constant("a", 1.0), constant("b", 2.0)]).unwrap();
        assert_eq!(set.size(), 2);
        assert_eq!(set.feature(1).name(), "b");
        assert_eq!(set.feature_ordinal("b"), Some(1));
        assert_eq!(set.feature_ordinal("c"), None);
        let queries = set.to_queries(&LtrQueryContext::empty(), &Params::new()).unwrap();
        assert_eq!(queries[1], SubQuery::Constant { score: QueryFloat(2.0) });

        let same = FeatureSet::new("set", vec![constant("a", 5.0), constant("b", 5.0)]).unwrap();
        assert_eq!(set, same);
        let other = FeatureSet::new("set", vec![constant("b", 1.0), constant("a", 2.0)]).unwrap();
        assert_ne!(set, other);

        assert!(FeatureSet::new("dup", vec![constant("a", 1.0), constant("a", 2.0)]).is_err());
    }

    #[test]
    fn test_query_context_terms() {
        let mut analyzer = Analyzer::new();
        analyzer.analyze("do you quarrel sir");
        let ctx = LtrQueryContext::new(&analyzer);
        assert_eq!(ctx.terms("Quarrel, unknown SIR"), vec![3, 4]);
        assert!(LtrQueryContext::empty().terms("quarrel").is_empty());
    }
}
