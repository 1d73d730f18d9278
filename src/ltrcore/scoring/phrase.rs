use crate::ltrcore::{DocId, Result, TermId, NO_MORE_DOCS};
use crate::ltrcore::index::SegmentReader;
use crate::ltrcore::index::postings::PostingsCursor;
use super::{DocIdSetIterator, Scorer, ScoringContext, Weight};

// Phrase match: documents containing the terms at consecutive positions,
// scored by the number of times the phrase occurs.
#[derive(Debug)]
pub struct PhraseWeight {
    terms: Vec<TermId>,
}

impl PhraseWeight {
    pub fn new(terms: &[TermId]) -> Self {
        PhraseWeight { terms: terms.to_vec() }
    }
}

impl Weight for PhraseWeight {
    fn description(&self) -> String {
        format!("phrase(terms={:?})", self.terms)
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        if self.terms.is_empty() {
            return Ok(None);
        }
        let segment = reader.segment();
        let mut cursors = vec![];
        for tid in &self.terms {
            let postings = segment.postings(*tid);
            if postings.is_empty() {
                return Ok(None);
            }
            cursors.push(PostingsCursor::new(postings));
        }
        Ok(Some(Box::new(PhraseScorer {
            cursors,
            doc: crate::ltrcore::DOC_BEGIN,
            freq: 0,
        })))
    }
}

struct PhraseScorer<'a> {
    // one cursor per phrase position
    cursors: Vec<PostingsCursor<'a>>,
    doc: DocId,
    // phrase occurrences in the current doc
    freq: u32,
}

impl<'a> PhraseScorer<'a> {
    // first doc >= target where every cursor sits on the same doc
    fn conjunction(&mut self, mut target: DocId) -> DocId {
        'outer: loop {
            for cursor in self.cursors.iter_mut() {
                let doc = if cursor.doc_id() < target {
                    cursor.advance(target)
                } else {
                    cursor.doc_id()
                };
                if doc == NO_MORE_DOCS {
                    return NO_MORE_DOCS;
                }
                if doc > target {
                    target = doc;
                    continue 'outer;
                }
            }
            return target;
        }
    }

    fn phrase_freq(&self) -> u32 {
        let mut freq = 0;
        for &start in self.cursors[0].positions() {
            let all = self.cursors[1..]
                .iter()
                .enumerate()
                .all(|(i, c)| c.positions().binary_search(&(start + i as u32 + 1)).is_ok());
            if all {
                freq += 1;
            }
        }
        freq
    }
}

impl<'a> DocIdSetIterator for PhraseScorer<'a> {
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
        let mut target = target;
        loop {
            let doc = self.conjunction(target);
            if doc == NO_MORE_DOCS {
                self.doc = NO_MORE_DOCS;
                self.freq = 0;
                return NO_MORE_DOCS;
            }
            let freq = self.phrase_freq();
            if freq > 0 {
                self.doc = doc;
                self.freq = freq;
                return doc;
            }
            target = doc + 1;
        }
    }

    fn cost(&self) -> u64 {
        self.cursors.iter().map(|c| c.cost()).min().unwrap_or(0)
    }
}

impl<'a> Scorer for PhraseScorer<'a> {
    fn score(&mut self, _ctx: &ScoringContext<'_>) -> f32 {
        self.freq as f32
    }
}
