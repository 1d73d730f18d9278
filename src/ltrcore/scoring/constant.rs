use std::sync::Arc;
use crate::ltrcore::{DocId, Result};
use crate::ltrcore::index::SegmentReader;
use super::{AllDocs, DocIdSetIterator, Explanation, Scorer, ScoringContext, Weight};

// Matches every document with the same score.
#[derive(Debug)]
pub struct ConstantWeight {
    score: f32,
    cacheable: bool,
}

impl ConstantWeight {
    pub fn new(score: f32) -> Self {
        ConstantWeight { score, cacheable: true }
    }

    pub fn not_cacheable(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

impl Weight for ConstantWeight {
    fn description(&self) -> String {
        format!("constant({})", self.score)
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        Ok(Some(Box::new(ConstantScorer {
            docs: AllDocs::new(reader.max_doc()),
            score: self.score,
        })))
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

pub struct ConstantScorer {
    docs: AllDocs,
    score: f32,
}

impl DocIdSetIterator for ConstantScorer {
    fn doc_id(&self) -> DocId {
        self.docs.doc_id()
    }

    fn next_doc(&mut self) -> DocId {
        self.docs.next_doc()
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.docs.advance(target)
    }

    fn cost(&self) -> u64 {
        self.docs.cost()
    }
}

impl Scorer for ConstantScorer {
    fn score(&mut self, _ctx: &ScoringContext<'_>) -> f32 {
        self.score
    }
}

#[derive(Debug)]
pub struct MatchNoneWeight;

impl Weight for MatchNoneWeight {
    fn description(&self) -> String {
        "match_none".to_string()
    }

    fn scorer<'a>(&self, _reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        Ok(None)
    }
}

// Multiplies the scores of a wrapped weight.
#[derive(Debug)]
pub struct BoostWeight {
    inner: Arc<dyn Weight>,
    boost: f32,
}

impl BoostWeight {
    pub fn new(inner: Arc<dyn Weight>, boost: f32) -> Self {
        BoostWeight { inner, boost }
    }
}

impl Weight for BoostWeight {
    fn description(&self) -> String {
        format!("boost({}, {})", self.inner.description(), self.boost)
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        Ok(self.inner.scorer(reader)?.map(|inner| {
            Box::new(BoostScorer { inner, boost: self.boost }) as Box<dyn Scorer + 'a>
        }))
    }

    fn explain(&self, reader: SegmentReader<'_>, doc: DocId, ctx: &ScoringContext<'_>) -> Result<Explanation> {
        let inner = self.inner.explain(reader, doc, ctx)?;
        if !inner.is_match() {
            return Ok(inner);
        }
        let description = format!("{}, product of:", self.description());
        let value = inner.value() * self.boost;
        Ok(Explanation::matched(value, &description, vec![
            inner,
            Explanation::matched(self.boost, "boost", vec![]),
        ]))
    }

    fn is_cacheable(&self) -> bool {
        self.inner.is_cacheable()
    }
}

struct BoostScorer<'a> {
    inner: Box<dyn Scorer + 'a>,
    boost: f32,
}

impl<'a> DocIdSetIterator for BoostScorer<'a> {
    fn doc_id(&self) -> DocId {
        self.inner.doc_id()
    }

    fn next_doc(&mut self) -> DocId {
        self.inner.next_doc()
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.inner.advance(target)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

impl<'a> Scorer for BoostScorer<'a> {
    fn score(&mut self, ctx: &ScoringContext<'_>) -> f32 {
        self.inner.score(ctx) * self.boost
    }
}
