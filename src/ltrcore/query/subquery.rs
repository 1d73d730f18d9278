use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use crate::ltrcore::{LtrError, Result, TermId};
use crate::ltrcore::ranker::LtrRanker;
use crate::ltrcore::scoring::Weight;
use crate::ltrcore::scoring::bm25::Bm25Weight;
use crate::ltrcore::scoring::constant::{BoostWeight, ConstantWeight, MatchNoneWeight};
use crate::ltrcore::scoring::derived::DerivedWeight;
use crate::ltrcore::scoring::lmd::LmdWeight;
use crate::ltrcore::scoring::phrase::PhraseWeight;
use super::searcher::IndexSearcher;

/// A float that can take part in query equality and hashing.
///
/// Compared bit for bit, `-0.0` is normalized to `0.0` when a query is
/// rewritten.
#[derive(Debug, Clone, Copy)]
pub struct QueryFloat(pub f32);

impl QueryFloat {
    pub fn value(&self) -> f32 {
        self.0
    }

    fn normalized(&self) -> QueryFloat {
        if self.0 == 0.0 { QueryFloat(0.0) } else { *self }
    }
}

impl PartialEq for QueryFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for QueryFloat {}

impl Hash for QueryFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f32> for QueryFloat {
    fn from(v: f32) -> Self {
        QueryFloat(v)
    }
}

/// `constant + sum(weight * fv[ordinal])` over features of the same set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedExpr {
    pub inputs: Vec<(usize, QueryFloat)>,
    pub constant: QueryFloat,
    // key of the value in the extra logging map, if it is logged there
    pub extra_logging: Option<String>,
}

impl DerivedExpr {
    pub fn new(inputs: Vec<(usize, f32)>, constant: f32) -> Self {
        DerivedExpr {
            inputs: inputs.into_iter().map(|(o, w)| (o, QueryFloat(w))).collect(),
            constant: QueryFloat(constant),
            extra_logging: None,
        }
    }

    pub fn with_extra_logging(mut self, key: &str) -> Self {
        self.extra_logging = Some(key.to_string());
        self
    }

    fn normalized(&self) -> DerivedExpr {
        DerivedExpr {
            inputs: self.inputs.iter().map(|(o, w)| (*o, w.normalized())).collect(),
            constant: self.constant.normalized(),
            extra_logging: self.extra_logging.clone(),
        }
    }
}

/// The retrieval query a single feature is turned into.
///
/// Sub-queries are plain values: equal sub-queries produce equal weights on
/// the same searcher, which is what the per-request weight cache relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubQuery {
    // BM25 over any of the terms
    Match { terms: Vec<TermId> },
    // terms at consecutive positions, scored by occurrence count
    Phrase { terms: Vec<TermId> },
    // language model with Dirichlet smoothing
    Lmd { terms: Vec<TermId> },
    Constant { score: QueryFloat },
    Boost { query: Box<SubQuery>, boost: QueryFloat },
    // value computed from other features, not executable on its own
    Derived(DerivedExpr),
    // a derived feature bound to the feature vector of a ranking query
    VectorDerived(DerivedExpr),
    MatchNone,
}

/// What a ranking query exposes to its sub-queries while rewriting them.
pub struct LtrRewriteContext<'r> {
    ranker: &'r dyn LtrRanker,
}

impl<'r> LtrRewriteContext<'r> {
    pub fn new(ranker: &'r dyn LtrRanker) -> Self {
        LtrRewriteContext { ranker }
    }

    pub fn feature_count(&self) -> usize {
        self.ranker.feature_count()
    }
}

impl SubQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            SubQuery::Match { .. } => "match",
            SubQuery::Phrase { .. } => "match_phrase",
            SubQuery::Lmd { .. } => "lmd",
            SubQuery::Constant { .. } => "constant",
            SubQuery::Boost { .. } => "boost",
            SubQuery::Derived(_) => "derived",
            SubQuery::VectorDerived(_) => "vector_derived",
            SubQuery::MatchNone => "match_none",
        }
    }

    /// Canonical form of the query for one shard.
    ///
    /// Only depends on the query and on whether the shard holds documents,
    /// never on term statistics, so every phase of a request rewrites a
    /// query to the same value.
    pub fn rewrite(&self, searcher: &IndexSearcher<'_>) -> SubQuery {
        if searcher.max_doc() == 0 {
            return SubQuery::MatchNone;
        }
        match self {
            SubQuery::Match { terms } | SubQuery::Lmd { terms } if terms.is_empty() => SubQuery::MatchNone,
            SubQuery::Match { terms } => {
                let mut terms = terms.clone();
                terms.sort_unstable();
                SubQuery::Match { terms }
            },
            SubQuery::Lmd { terms } => {
                let mut terms = terms.clone();
                terms.sort_unstable();
                SubQuery::Lmd { terms }
            },
            SubQuery::Phrase { terms } if terms.is_empty() => SubQuery::MatchNone,
            SubQuery::Phrase { terms } => SubQuery::Phrase { terms: terms.clone() },
            SubQuery::Constant { score } => SubQuery::Constant { score: score.normalized() },
            SubQuery::Boost { query, boost } => {
                let inner = query.rewrite(searcher);
                if inner == SubQuery::MatchNone {
                    SubQuery::MatchNone
                } else if boost.value() == 1.0 {
                    inner
                } else {
                    SubQuery::Boost { query: Box::new(inner), boost: boost.normalized() }
                }
            },
            SubQuery::Derived(expr) => SubQuery::Derived(expr.normalized()),
            SubQuery::VectorDerived(expr) => SubQuery::VectorDerived(expr.normalized()),
            SubQuery::MatchNone => SubQuery::MatchNone,
        }
    }

    /// Binds derived features to the ranking query they are evaluated in.
    pub fn ltr_rewrite(&self, ctx: &LtrRewriteContext<'_>) -> Result<SubQuery> {
        match self {
            SubQuery::Derived(expr) => {
                if let Some((ordinal, _)) = expr.inputs.iter().find(|(o, _)| *o >= ctx.feature_count()) {
                    return Err(LtrError::InvalidDefinition {
                        name: "derived".to_string(),
                        reason: format!("feature ordinal {} out of {} features", ordinal, ctx.feature_count()),
                    });
                }
                Ok(SubQuery::VectorDerived(expr.clone()))
            },
            SubQuery::Boost { query, boost } => Ok(SubQuery::Boost {
                query: Box::new(query.ltr_rewrite(ctx)?),
                boost: *boost,
            }),
            other => Ok(other.clone()),
        }
    }

    pub fn create_weight(&self, searcher: &IndexSearcher<'_>) -> Result<Arc<dyn Weight>> {
        let weight: Arc<dyn Weight> = match self {
            SubQuery::Match { terms } => Arc::new(Bm25Weight::new(searcher, terms)),
            SubQuery::Phrase { terms } => Arc::new(PhraseWeight::new(terms)),
            SubQuery::Lmd { terms } => Arc::new(LmdWeight::new(searcher, terms)),
            SubQuery::Constant { score } => Arc::new(ConstantWeight::new(score.value())),
            SubQuery::Boost { query, boost } => {
                Arc::new(BoostWeight::new(query.create_weight(searcher)?, boost.value()))
            },
            SubQuery::Derived(_) => return Err(LtrError::DerivedOutsideRanking),
            SubQuery::VectorDerived(expr) => {
                let inputs = expr.inputs.iter().map(|(o, w)| (*o, w.value())).collect();
                Arc::new(DerivedWeight::new(inputs, expr.constant.value())
                    .with_extra_logging(expr.extra_logging.clone()))
            },
            SubQuery::MatchNone => Arc::new(MatchNoneWeight),
        };
        Ok(weight)
    }

    // terms whose statistics the query needs
    pub fn extract_terms(&self, terms: &mut BTreeSet<TermId>) {
        match self {
            SubQuery::Match { terms: t } | SubQuery::Phrase { terms: t } | SubQuery::Lmd { terms: t } => {
                terms.extend(t.iter().copied());
            },
            SubQuery::Boost { query, .. } => query.extract_terms(terms),
            _ => {},
        }
    }
}
