use crate::ltrcore::{DocId, TermOffset, DOC_BEGIN, NO_MORE_DOCS};
use crate::ltrcore::index::Posting;
use crate::ltrcore::scoring::DocIdSetIterator;

// Walks the postings of one term in one segment.
pub struct PostingsCursor<'a> {
    postings: &'a [Posting],
    // index of the current posting, postings.len() once exhausted
    idx: usize,
    doc: DocId,
}

impl<'a> PostingsCursor<'a> {
    pub fn new(postings: &'a [Posting]) -> Self {
        PostingsCursor {
            postings,
            idx: 0,
            doc: DOC_BEGIN,
        }
    }

    pub fn term_freq(&self) -> u32 {
        self.postings[self.idx].get_term_frequency()
    }

    pub fn positions(&self) -> &'a [TermOffset] {
        self.postings[self.idx].get_positions()
    }
}

impl<'a> DocIdSetIterator for PostingsCursor<'a> {
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
        // postings are sorted by doc id, search only what is ahead of us
        let ahead = &self.postings[self.idx..];
        self.idx += ahead.partition_point(|p| p.get_doc_id() < target);
        self.doc = match self.postings.get(self.idx) {
            Some(p) => p.get_doc_id(),
            None => NO_MORE_DOCS,
        };
        self.doc
    }

    fn cost(&self) -> u64 {
        self.postings.len() as u64
    }
}

// Union of several term cursors, positioned on the smallest doc any of them is on.
pub struct TermUnion<'a> {
    cursors: Vec<PostingsCursor<'a>>,
    doc: DocId,
}

impl<'a> TermUnion<'a> {
    pub fn new(cursors: Vec<PostingsCursor<'a>>) -> Self {
        TermUnion {
            cursors,
            doc: DOC_BEGIN,
        }
    }

    // cursor index and cursor for every term present in the current doc
    pub fn matching(&self) -> impl Iterator<Item = (usize, &PostingsCursor<'a>)> + '_ {
        let doc = self.doc;
        self.cursors
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.doc_id() == doc)
    }
}

impl<'a> DocIdSetIterator for TermUnion<'a> {
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
        let mut min = NO_MORE_DOCS;
        for cursor in self.cursors.iter_mut() {
            if cursor.doc_id() < target {
                cursor.advance(target);
            }
            min = min.min(cursor.doc_id());
        }
        self.doc = min;
        self.doc
    }

    fn cost(&self) -> u64 {
        self.cursors.iter().map(|c| c.cost()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltrcore::index::Segment;

    fn setup() -> Segment {
        let mut seg = Segment::new();
        seg.add_document(&[1, 2]);
        seg.add_document(&[2, 2, 3]);
        seg.add_document(&[4]);
        seg.add_document(&[1, 3]);
        seg
    }

    #[test]
    fn test_postings_cursor() {
        let seg = setup();
        let mut cursor = PostingsCursor::new(seg.postings(2));
        assert_eq!(cursor.doc_id(), DOC_BEGIN);
        assert_eq!(cursor.next_doc(), 1);
        assert_eq!(cursor.next_doc(), 2);
        assert_eq!(cursor.term_freq(), 2);
        assert_eq!(cursor.positions(), &[1, 2]);
        assert_eq!(cursor.next_doc(), NO_MORE_DOCS);
        assert_eq!(cursor.next_doc(), NO_MORE_DOCS);

        let mut cursor = PostingsCursor::new(seg.postings(3));
        assert_eq!(cursor.advance(3), 4);
        assert_eq!(cursor.advance(4), 4);
        assert_eq!(cursor.advance(5), NO_MORE_DOCS);

        let mut missing = PostingsCursor::new(seg.postings(99));
        assert_eq!(missing.next_doc(), NO_MORE_DOCS);
    }

    #[test]
    fn test_term_union() {
        let seg = setup();
        let mut union = TermUnion::new(vec![
            PostingsCursor::new(seg.postings(1)),
            PostingsCursor::new(seg.postings(3)),
        ]);
        assert_eq!(union.next_doc(), 1);
        assert_eq!(union.matching().map(|(i, _)| i).collect::<Vec<_>>(), vec![0]);
        assert_eq!(union.next_doc(), 2);
        assert_eq!(union.next_doc(), 4);
        assert_eq!(union.matching().map(|(i, _)| i).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(union.next_doc(), NO_MORE_DOCS);
        assert_eq!(union.cost(), 4);
    }
}
