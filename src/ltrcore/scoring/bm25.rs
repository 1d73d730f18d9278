use crate::ltrcore::{DocId, Result, TermId};
use crate::ltrcore::index::{Segment, SegmentReader};
use crate::ltrcore::index::postings::{PostingsCursor, TermUnion};
use crate::ltrcore::query::searcher::IndexSearcher;
use super::{query_term_freq, DocIdSetIterator, Scorer, ScoringContext, Weight};

const K1: f32 = 1.2;
const B: f32 = 0.75;

// The BM25 algorithm
// for all term t sum qt * ftd*(k1+1)/(k1*(1-b+b*(ld/lavg)) + ftd) * log(N/Nt)
//   qt: query term frequency
//   ftd: frequency of term t in document d
//   k1: weight saturation factor, default 1.2
//   b: level of normalization of document length, default 0.75
//   N: total count of documents
//   Nt: count of documents that contain term t
//
// N, Nt and lavg are captured from the searcher when the weight is built.
#[derive(Debug)]
pub struct Bm25Weight {
    // term id and qt * idf, terms no document contains are dropped
    terms: Vec<(TermId, f32)>,
    lavg: f32,
}

impl Bm25Weight {
    pub fn new(searcher: &IndexSearcher<'_>, terms: &[TermId]) -> Self {
        let collection = searcher.collection_statistics();
        let document_count = collection.doc_count as f32;
        let mut weighted = vec![];
        for (tid, qt) in query_term_freq(terms) {
            let nt = searcher.term_statistics(tid).doc_freq;
            if nt == 0 {
                continue;
            }
            let idf = (document_count / nt as f32).log2();
            weighted.push((tid, qt as f32 * idf));
        }
        Bm25Weight {
            terms: weighted,
            lavg: collection.average_document_length(),
        }
    }
}

impl Weight for Bm25Weight {
    fn description(&self) -> String {
        let terms: Vec<TermId> = self.terms.iter().map(|(t, _)| *t).collect();
        format!("bm25(terms={:?})", terms)
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        let segment = reader.segment();
        let mut cursors = vec![];
        let mut weights = vec![];
        for (tid, w) in &self.terms {
            let postings = segment.postings(*tid);
            if !postings.is_empty() {
                cursors.push(PostingsCursor::new(postings));
                weights.push(*w);
            }
        }
        if cursors.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(Bm25Scorer {
            segment,
            union: TermUnion::new(cursors),
            weights,
            lavg: self.lavg,
        })))
    }
}

struct Bm25Scorer<'a> {
    segment: &'a Segment,
    union: TermUnion<'a>,
    // qt * idf, parallel to the union's cursors
    weights: Vec<f32>,
    lavg: f32,
}

impl<'a> DocIdSetIterator for Bm25Scorer<'a> {
    fn doc_id(&self) -> DocId {
        self.union.doc_id()
    }

    fn next_doc(&mut self) -> DocId {
        self.union.next_doc()
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.union.advance(target)
    }

    fn cost(&self) -> u64 {
        self.union.cost()
    }
}

impl<'a> Scorer for Bm25Scorer<'a> {
    fn score(&mut self, _ctx: &ScoringContext<'_>) -> f32 {
        let ld = self.segment.document_length(self.union.doc_id()) as f32;
        let k1_b_ld_lavg = K1 * (1.0 - B + B * (ld / self.lavg));
        let mut score = 0f32;
        for (i, cursor) in self.union.matching() {
            let ftd = cursor.term_freq() as f32;
            score += self.weights[i] * ftd * (K1 + 1.0) / (k1_b_ld_lavg + ftd);
        }
        score
    }
}
