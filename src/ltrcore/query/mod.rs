//! Queries of a search request and the state they share while it runs.

pub mod cache;
pub mod context;
pub mod disjunction;
pub mod ranker_query;
pub mod searcher;
pub mod subquery;

use std::collections::BTreeSet;
use std::sync::Arc;
use crate::ltrcore::{Result, TermId};
use crate::ltrcore::scoring::{ScoreMode, Weight};
use crate::ltrcore::scoring::constant::BoostWeight;
pub use cache::{FeatureScoreCache, WeightCache};
pub use context::RequestContext;
pub use ranker_query::{RankerQuery, RankerQuerySpec};
pub use searcher::{AggregatedDfs, IndexSearcher};
pub use subquery::SubQuery;

/// A parsed query of a request: a ranking query, possibly boosted, or a
/// plain retrieval query.
#[derive(Debug, Clone)]
pub enum Query {
    Ranker(RankerQuery),
    Boost { query: Box<Query>, boost: f32 },
    Plain(SubQuery),
}

impl Query {
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Ranker(_) => "sltr",
            Query::Boost { .. } => "boost",
            Query::Plain(q) => q.kind(),
        }
    }

    // a ranking query, or a ranking query under a single boost
    pub fn as_ranker_query(&self) -> Option<&RankerQuery> {
        match self {
            Query::Ranker(q) => Some(q),
            Query::Boost { query, .. } => match query.as_ref() {
                Query::Ranker(q) => Some(q),
                _ => None,
            },
            Query::Plain(_) => None,
        }
    }

    // kind of the query found once a boost is unwrapped
    pub fn inner_kind(&self) -> &'static str {
        match self {
            Query::Boost { query, .. } => query.kind(),
            other => other.kind(),
        }
    }

    pub fn extract_terms(&self, terms: &mut BTreeSet<TermId>) {
        match self {
            Query::Ranker(q) => q.extract_terms(terms),
            Query::Boost { query, .. } => query.extract_terms(terms),
            Query::Plain(q) => q.extract_terms(terms),
        }
    }

    pub fn create_weight(
        &self,
        searcher: &IndexSearcher<'_>,
        ctx: &RequestContext,
        mode: ScoreMode,
    ) -> Result<Arc<dyn Weight>> {
        match self {
            Query::Ranker(q) => q.create_weight(searcher, ctx, mode),
            Query::Boost { query, boost } => {
                let inner = query.create_weight(searcher, ctx, mode)?;
                Ok(Arc::new(BoostWeight::new(inner, *boost)))
            },
            Query::Plain(q) => q.rewrite(searcher).create_weight(searcher),
        }
    }
}
