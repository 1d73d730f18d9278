//! Fetch phase of feature logging.
//!
//! Logs are rendered straight from the feature score caches filled while
//! ranking when every logged query has one. Otherwise each logged query is
//! turned into a logging query and the hits are scored again, reusing the
//! weights built while ranking.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use crate::ltrcore::{DocId, LtrError, Result};
use crate::ltrcore::engine::{Rescore, SearchHit};
use crate::ltrcore::query::{IndexSearcher, Query, RankerQuery, RequestContext, WeightCache};
use crate::ltrcore::ranker::{LogConsumer, SharedLogConsumer};
use crate::ltrcore::scoring::{ScoreMode, ScoringContext, Weight};
use super::{HitLogConsumer, LogSpec, LoggingSearchExt};

struct Logger {
    query: RankerQuery,
    consumer: Arc<Mutex<HitLogConsumer>>,
}

/// Loggers of one shard, resolved against the queries parsed for it.
pub struct LoggingFetchPhase {
    loggers: Vec<Logger>,
}

impl LoggingFetchPhase {
    /// Fails when a log spec points at a query that is missing or is not a
    /// ranking query.
    pub fn new(ext: &LoggingSearchExt, named_queries: &HashMap<String, Query>, rescores: &[Rescore]) -> Result<Self> {
        let mut loggers = vec![];
        for spec in ext.log_specs() {
            let query = match (spec.get_named_query(), spec.get_rescore_index()) {
                (Some(name), _) => Self::extract_query(name, named_queries)?,
                (None, Some(index)) => Self::extract_rescore(index, rescores)?,
                (None, None) => continue,
            };
            loggers.push(Self::to_logger(spec, query));
        }
        Ok(LoggingFetchPhase { loggers })
    }

    fn extract_query(name: &str, named_queries: &HashMap<String, Query>) -> Result<RankerQuery> {
        let query = named_queries
            .get(name)
            .ok_or_else(|| LtrError::UnknownNamedQuery(name.to_string()))?;
        query.as_ranker_query().cloned().ok_or_else(|| LtrError::NotRankingQuery {
            name: name.to_string(),
            found: query.inner_kind().to_string(),
        })
    }

    fn extract_rescore(index: usize, rescores: &[Rescore]) -> Result<RankerQuery> {
        let rescore = rescores.get(index).ok_or(LtrError::RescoreIndexOutOfBounds {
            index,
            available: rescores.len(),
        })?;
        let query = match rescore {
            Rescore::Query { query, .. } => query,
            other => {
                return Err(LtrError::WrongRescoreKind {
                    index,
                    found: other.kind().to_string(),
                });
            },
        };
        query.as_ranker_query().cloned().ok_or_else(|| LtrError::RescoreNotRankingQuery {
            index,
            found: query.kind().to_string(),
        })
    }

    fn to_logger(spec: &LogSpec, query: RankerQuery) -> Logger {
        let consumer = HitLogConsumer::new(&spec.logger_name(), query.feature_set().clone(), spec.is_missing_as_zero());
        Logger {
            query,
            consumer: Arc::new(Mutex::new(consumer)),
        }
    }

    pub fn logger_count(&self) -> usize {
        self.loggers.len()
    }

    // every logged query cached feature scores while ranking
    pub fn can_render_cached(&self) -> bool {
        !self.loggers.is_empty()
            && self.loggers.iter().all(|l| l.query.feature_score_cache().map_or(false, |c| !c.is_empty()))
    }

    /// Adds the logs of every logger to the hits, all from this shard.
    ///
    /// `searcher` is the fetch phase view of the shard, it may see other
    /// statistics than the one the hits were ranked with.
    pub fn process(&self, searcher: &IndexSearcher<'_>, ctx: &RequestContext, hits: &mut [SearchHit]) -> Result<()> {
        if self.loggers.is_empty() || hits.is_empty() {
            return Ok(());
        }
        if self.can_render_cached() {
            log::debug!("rendering {} feature logs from the feature score cache", hits.len());
            self.render_cached(hits);
        } else {
            log::debug!("scoring {} hits again for feature logging", hits.len());
            self.rescore(searcher, ctx, hits)?;
        }
        for logger in &self.loggers {
            let mut consumer = logger.consumer.lock();
            for (hit, log) in consumer.take_logs() {
                hits[hit].ltr_log.insert(consumer.name().to_string(), log);
            }
        }
        Ok(())
    }

    // a doc missing from a cache is skipped for that logger only
    fn render_cached(&self, hits: &[SearchHit]) {
        for (i, hit) in hits.iter().enumerate() {
            for logger in &self.loggers {
                let scores = match logger.query.feature_score_cache().and_then(|c| c.get(hit.doc)) {
                    Some(scores) => scores,
                    None => {
                        log::debug!("doc {} of shard {} not in the feature score cache, not logged", hit.doc, hit.shard);
                        continue;
                    },
                };
                let mut consumer = logger.consumer.lock();
                consumer.next_doc(i);
                let limit = scores.len().min(consumer.feature_count());
                for (ordinal, score) in scores[..limit].iter().enumerate() {
                    if !score.is_nan() {
                        consumer.accept(ordinal, *score);
                    }
                }
            }
        }
    }

    fn rescore(&self, searcher: &IndexSearcher<'_>, ctx: &RequestContext, hits: &[SearchHit]) -> Result<()> {
        let merged = WeightCache::new();
        for logger in &self.loggers {
            merged.merge_from(logger.query.weight_cache());
        }
        let ctx = if merged.is_empty() { ctx.clone() } else { ctx.clone().with_weight_cache(merged) };
        let docs: Vec<DocId> = hits.iter().map(|h| h.doc).collect();
        for logger in &self.loggers {
            let shared: SharedLogConsumer = logger.consumer.clone();
            let query = logger.query.rewrite(searcher).to_logger_query(shared);
            let weight = query.create_weight(searcher, &ctx, ScoreMode::Complete)?;
            log_docs(searcher, weight.as_ref(), logger.consumer.as_ref(), &docs)?;
        }
        Ok(())
    }
}

/// Scores `docs` with a logging weight, opening a log for each matching doc
/// before its features reach the consumer.
pub fn log_docs<C: LogConsumer>(
    searcher: &IndexSearcher<'_>,
    weight: &dyn Weight,
    consumer: &Mutex<C>,
    docs: &[DocId],
) -> Result<()> {
    searcher.visit_docs(weight, docs, |i, scorer| {
        consumer.lock().next_doc(i);
        scorer.score(&ScoringContext::none());
    })
}
