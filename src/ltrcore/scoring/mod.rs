//! Per-partition document iteration and scoring.
//!
//! A [`Weight`] is the executable form of a query, built once per request
//! against an [`IndexSearcher`](crate::ltrcore::query::searcher::IndexSearcher)
//! and therefore carrying whatever collection statistics were visible at that
//! moment. A weight hands out one [`Scorer`] per segment. Scorers walk matching
//! documents in ascending local doc id order.

pub mod bm25;
pub mod constant;
pub mod derived;
pub mod explanation;
pub mod lmd;
pub mod phrase;

use std::collections::BTreeMap;
use std::fmt;
use crate::ltrcore::{DocId, Result, TermId, DOC_BEGIN, NO_MORE_DOCS};
use crate::ltrcore::index::SegmentReader;
use crate::ltrcore::ranker::{FeatureVector, SharedLogConsumer};
pub use explanation::Explanation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    Complete,
    CompleteNoScores,
}

impl ScoreMode {
    pub fn needs_scores(&self) -> bool {
        *self == ScoreMode::Complete
    }
}

pub trait DocIdSetIterator {
    // DOC_BEGIN before the first call to next_doc/advance, NO_MORE_DOCS once exhausted
    fn doc_id(&self) -> DocId;
    fn next_doc(&mut self) -> DocId;
    // moves to the first doc >= target
    fn advance(&mut self, target: DocId) -> DocId;
    fn cost(&self) -> u64;
}

/// State of the document being scored, handed explicitly to every scorer.
///
/// Features that derive their value from sibling features read the
/// in-progress feature vector from here. When the document is being logged
/// the log consumer is reachable too.
#[derive(Clone, Copy, Default)]
pub struct ScoringContext<'v> {
    vector: Option<&'v FeatureVector>,
    log_consumer: Option<&'v SharedLogConsumer>,
}

impl<'v> ScoringContext<'v> {
    pub fn none() -> Self {
        ScoringContext { vector: None, log_consumer: None }
    }

    pub fn with_vector(vector: &'v FeatureVector) -> Self {
        ScoringContext { vector: Some(vector), log_consumer: None }
    }

    pub fn with_log_consumer(mut self, consumer: Option<&'v SharedLogConsumer>) -> Self {
        self.log_consumer = consumer;
        self
    }

    pub fn log_consumer(&self) -> Option<&'v SharedLogConsumer> {
        self.log_consumer
    }

    pub fn feature_score(&self, ordinal: usize) -> f32 {
        match self.vector {
            Some(fv) => fv.feature_score(ordinal),
            None => 0.0,
        }
    }
}

pub trait Scorer: DocIdSetIterator {
    // only valid while positioned on a matching doc
    fn score(&mut self, ctx: &ScoringContext<'_>) -> f32;
}

pub trait Weight: Send + Sync + fmt::Debug {
    fn description(&self) -> String;

    // None when nothing in the segment can match
    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>>;

    fn explain(&self, reader: SegmentReader<'_>, doc: DocId, ctx: &ScoringContext<'_>) -> Result<Explanation> {
        if let Some(mut scorer) = self.scorer(reader)? {
            if scorer.advance(doc) == doc {
                return Ok(Explanation::matched(scorer.score(ctx), &self.description(), vec![]));
            }
        }
        Ok(Explanation::no_match(&self.description()))
    }

    fn is_cacheable(&self) -> bool {
        true
    }
}

// query term frequency, ordered by term id
pub fn query_term_freq(terms: &[TermId]) -> Vec<(TermId, u32)> {
    let mut freq: BTreeMap<TermId, u32> = BTreeMap::new();
    for &tid in terms {
        freq.entry(tid)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }
    freq.into_iter().collect()
}

// every document of a segment, 1..=max_doc
pub struct AllDocs {
    max_doc: DocId,
    doc: DocId,
}

impl AllDocs {
    pub fn new(max_doc: DocId) -> Self {
        AllDocs { max_doc, doc: DOC_BEGIN }
    }
}

impl DocIdSetIterator for AllDocs {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> DocId {
        if self.doc == NO_MORE_DOCS {
            return NO_MORE_DOCS;
        }
        self.advance(self.doc + 1)
    }

    fn advance(&mut self, target: DocId) -> DocId {
        let target = target.max(1);
        self.doc = if target > self.max_doc { NO_MORE_DOCS } else { target };
        self.doc
    }

    fn cost(&self) -> u64 {
        self.max_doc as u64
    }
}

// stands in for a feature that cannot match anything in a segment
#[derive(Default)]
pub struct EmptyScorer {
    doc: DocId,
}

impl EmptyScorer {
    pub fn new() -> Self {
        EmptyScorer { doc: DOC_BEGIN }
    }
}

impl DocIdSetIterator for EmptyScorer {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> DocId {
        self.doc = NO_MORE_DOCS;
        self.doc
    }

    fn advance(&mut self, _target: DocId) -> DocId {
        self.doc = NO_MORE_DOCS;
        self.doc
    }

    fn cost(&self) -> u64 {
        0
    }
}

impl Scorer for EmptyScorer {
    fn score(&mut self, _ctx: &ScoringContext<'_>) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_docs() {
        let mut it = AllDocs::new(3);
        assert_eq!(it.doc_id(), DOC_BEGIN);
        assert_eq!(it.next_doc(), 1);
        assert_eq!(it.next_doc(), 2);
        assert_eq!(it.advance(3), 3);
        assert_eq!(it.next_doc(), NO_MORE_DOCS);
        assert_eq!(it.next_doc(), NO_MORE_DOCS);
        assert_eq!(it.cost(), 3);

        let mut empty = AllDocs::new(0);
        assert_eq!(empty.next_doc(), NO_MORE_DOCS);
    }

    #[test]
    fn test_empty_scorer() {
        let mut s = EmptyScorer::new();
        assert_eq!(s.doc_id(), DOC_BEGIN);
        assert_eq!(s.advance(5), NO_MORE_DOCS);
    }

    #[test]
    fn test_query_term_freq() {
        assert_eq!(query_term_freq(&[4, 2, 4, 4]), vec![(2, 1), (4, 3)]);
        assert!(query_term_freq(&[]).is_empty());
    }

    #[test]
    fn test_scoring_context() {
        let mut fv = FeatureVector::new(2, 0.5);
        fv.set_feature_score(1, 3.0);
        let ctx = ScoringContext::with_vector(&fv);
        assert_eq!(ctx.feature_score(0), 0.5);
        assert_eq!(ctx.feature_score(1), 3.0);
        assert_eq!(ScoringContext::none().feature_score(1), 0.0);
    }
}
