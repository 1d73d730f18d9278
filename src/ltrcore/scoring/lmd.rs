use crate::ltrcore::{DocId, Result, TermId};
use crate::ltrcore::index::{Segment, SegmentReader};
use crate::ltrcore::index::postings::{PostingsCursor, TermUnion};
use crate::ltrcore::query::searcher::IndexSearcher;
use super::{query_term_freq, DocIdSetIterator, Scorer, ScoringContext, Weight};

// LMD - language modeling with Dirichlet smoothing
// for all term t: sum(qt * log(1 + ftd * N / lt)) - n * log(1 + ld / lavg)
//   qt: query term frequency
//   ftd: frequency of term t in document d
//   N: total count of documents
//   lt: number of times term t occurs in the collection
//   n: number of tokens in the query
//   ld: length of the document d, measured in tokens
//   lavg: average length of all documents in the collection
#[derive(Debug)]
pub struct LmdWeight {
    // term id, qt and N / lt
    terms: Vec<(TermId, f32, f32)>,
    query_token_num: f32,
    lavg: f32,
}

impl LmdWeight {
    pub fn new(searcher: &IndexSearcher<'_>, terms: &[TermId]) -> Self {
        let collection = searcher.collection_statistics();
        let document_count = collection.doc_count as f32;
        let mut weighted = vec![];
        for (tid, qt) in query_term_freq(terms) {
            let lt = searcher.term_statistics(tid).total_term_freq;
            if lt == 0 {
                continue;
            }
            weighted.push((tid, qt as f32, document_count / lt as f32));
        }
        LmdWeight {
            terms: weighted,
            query_token_num: terms.len() as f32,
            lavg: collection.average_document_length(),
        }
    }
}

impl Weight for LmdWeight {
    fn description(&self) -> String {
        let terms: Vec<TermId> = self.terms.iter().map(|(t, _, _)| *t).collect();
        format!("lmd(terms={:?})", terms)
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        let segment = reader.segment();
        let mut cursors = vec![];
        let mut terms = vec![];
        for (tid, qt, n_lt) in &self.terms {
            let postings = segment.postings(*tid);
            if !postings.is_empty() {
                cursors.push(PostingsCursor::new(postings));
                terms.push((*qt, *n_lt));
            }
        }
        if cursors.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(LmdScorer {
            segment,
            union: TermUnion::new(cursors),
            terms,
            query_token_num: self.query_token_num,
            lavg: self.lavg,
        })))
    }
}

struct LmdScorer<'a> {
    segment: &'a Segment,
    union: TermUnion<'a>,
    // qt and N / lt, parallel to the union's cursors
    terms: Vec<(f32, f32)>,
    query_token_num: f32,
    lavg: f32,
}

impl<'a> DocIdSetIterator for LmdScorer<'a> {
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

impl<'a> Scorer for LmdScorer<'a> {
    fn score(&mut self, _ctx: &ScoringContext<'_>) -> f32 {
        let ld = self.segment.document_length(self.union.doc_id()) as f32;
        let mut score = 0f32;
        for (i, cursor) in self.union.matching() {
            let (qt, n_lt) = self.terms[i];
            let ftd = cursor.term_freq() as f32;
            score += (1f32 + ftd * n_lt).log2() * qt;
        }
        score -= (1f32 + ld / self.lavg).log2() * self.query_token_num;
        score
    }
}
