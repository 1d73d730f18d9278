use std::sync::Arc;
use crate::ltrcore::{Params, Result};
use crate::ltrcore::analyzer::Analyzer;
use crate::ltrcore::query::{Query, RankerQuery, SubQuery};
use crate::ltrcore::settings::LtrSettings;
use crate::ltrcore::stats::{LtrStats, StatName};
use super::{LtrModel, LtrQueryContext};

/// Request side description of a ranking query: which model, with which
/// parameters.
#[derive(Debug, Clone)]
pub struct SltrQueryBuilder {
    model: Arc<LtrModel>,
    params: Params,
    // None defers to the settings
    feature_score_cache: Option<bool>,
}

impl SltrQueryBuilder {
    pub fn new(model: Arc<LtrModel>) -> Self {
        SltrQueryBuilder {
            model,
            params: Params::new(),
            feature_score_cache: None,
        }
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn feature_score_cache(mut self, enabled: bool) -> Self {
        self.feature_score_cache = Some(enabled);
        self
    }

    pub fn model(&self) -> &Arc<LtrModel> {
        &self.model
    }

    pub fn to_query(&self, analyzer: &Analyzer, settings: &LtrSettings, stats: Arc<LtrStats>) -> Result<RankerQuery> {
        stats.increment(StatName::RequestTotalCount);
        let cache = self.feature_score_cache.unwrap_or_else(|| settings.feature_score_cache());
        let ctx = LtrQueryContext::new(analyzer);
        RankerQuery::build(&self.model, &ctx, &self.params, cache, stats.clone()).map_err(|e| {
            stats.increment(StatName::RequestErrorCount);
            e
        })
    }
}

/// Query as written in a search request.
#[derive(Debug, Clone)]
pub enum QueryBuilder {
    Sltr(SltrQueryBuilder),
    // model whose features carry their queries already
    Prebuilt(Arc<LtrModel>),
    Boost { query: Box<QueryBuilder>, boost: f32 },
    Match { text: String },
    Phrase { text: String },
}

impl QueryBuilder {
    pub fn match_text(text: &str) -> Self {
        QueryBuilder::Match { text: text.to_string() }
    }

    pub fn boost(self, boost: f32) -> Self {
        QueryBuilder::Boost { query: Box::new(self), boost }
    }

    pub fn to_query(&self, analyzer: &Analyzer, settings: &LtrSettings, stats: &Arc<LtrStats>) -> Result<Query> {
        let query = match self {
            QueryBuilder::Sltr(builder) => Query::Ranker(builder.to_query(analyzer, settings, stats.clone())?),
            QueryBuilder::Prebuilt(model) => Query::Ranker(RankerQuery::build_prebuilt(model, stats.clone())?),
            QueryBuilder::Boost { query, boost } => Query::Boost {
                query: Box::new(query.to_query(analyzer, settings, stats)?),
                boost: *boost,
            },
            QueryBuilder::Match { text } => Query::Plain(SubQuery::Match { terms: analyzer.parse(text).0 }),
            QueryBuilder::Phrase { text } => Query::Plain(SubQuery::Phrase { terms: analyzer.parse_phrase(text) }),
        };
        Ok(query)
    }
}
