use std::cmp::Reverse;
use std::collections::BinaryHeap;
use crate::ltrcore::{DocId, NO_MORE_DOCS};
use crate::ltrcore::scoring::{AllDocs, DocIdSetIterator, Scorer};
use super::cache::FeatureScoreCache;

/// Walks every document of a segment and keeps the feature scorers
/// positioned on or after it.
///
/// Sub scorers sit in a min-heap keyed by their current doc, only those
/// behind the driver are advanced. Nothing is advanced for a document the
/// feature score cache already holds.
pub struct DisjunctionIterator<'a> {
    main: AllDocs,
    // indexed by feature ordinal, None when the feature matches nothing here
    sub_scorers: Vec<Option<Box<dyn Scorer + 'a>>>,
    queue: BinaryHeap<Reverse<(DocId, usize)>>,
    doc_base: DocId,
    cache: Option<FeatureScoreCache>,
}

impl<'a> DisjunctionIterator<'a> {
    pub fn new(
        max_doc: DocId,
        sub_scorers: Vec<Option<Box<dyn Scorer + 'a>>>,
        doc_base: DocId,
        cache: Option<FeatureScoreCache>,
    ) -> Self {
        let queue = sub_scorers
            .iter()
            .enumerate()
            .filter_map(|(ordinal, s)| s.as_ref().map(|s| Reverse((s.doc_id(), ordinal))))
            .collect();
        DisjunctionIterator {
            main: AllDocs::new(max_doc),
            sub_scorers,
            queue,
            doc_base,
            cache,
        }
    }

    pub fn doc_base(&self) -> DocId {
        self.doc_base
    }

    pub fn sub_scorers_mut(&mut self) -> &mut [Option<Box<dyn Scorer + 'a>>] {
        &mut self.sub_scorers
    }

    fn advance_sub_scorers(&mut self, target: DocId) {
        if target == NO_MORE_DOCS {
            return;
        }
        if let Some(cache) = &self.cache {
            if cache.contains(self.doc_base + target) {
                return;
            }
        }
        while let Some(mut top) = self.queue.peek_mut() {
            let Reverse((doc, ordinal)) = *top;
            if doc >= target {
                break;
            }
            let doc = match self.sub_scorers[ordinal].as_mut() {
                Some(scorer) => scorer.advance(target),
                None => NO_MORE_DOCS,
            };
            *top = Reverse((doc, ordinal));
        }
    }
}

impl<'a> DocIdSetIterator for DisjunctionIterator<'a> {
    fn doc_id(&self) -> DocId {
        self.main.doc_id()
    }

    fn next_doc(&mut self) -> DocId {
        let target = self.main.next_doc();
        self.advance_sub_scorers(target);
        target
    }

    fn advance(&mut self, target: DocId) -> DocId {
        let doc = self.main.advance(target);
        self.advance_sub_scorers(doc);
        doc
    }

    fn cost(&self) -> u64 {
        self.main.cost()
    }
}
