pub mod postings;
pub mod segment;

use serde::{Serialize, Deserialize};
use crate::ltrcore::{DocId, TermId};
pub use segment::{Posting, Segment};

// A shard is an ordered list of segments. Within a shard a document is
// addressed by its absolute id: the segment's doc base plus its local id.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Shard {
    segments: Vec<Segment>,
    // external ids, absolute doc id - 1 is used as vector index
    doc_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentReader<'a> {
    segment: &'a Segment,
    ord: usize,
    doc_base: DocId,
}

impl<'a> SegmentReader<'a> {
    pub fn segment(&self) -> &'a Segment {
        self.segment
    }
    pub fn ord(&self) -> usize {
        self.ord
    }
    pub fn doc_base(&self) -> DocId {
        self.doc_base
    }
    pub fn max_doc(&self) -> DocId {
        self.segment.max_doc()
    }
}

impl Shard {
    pub fn new() -> Self {
        Shard {
            segments: vec![],
            doc_keys: vec![],
        }
    }

    // returns the absolute doc id
    pub fn add_document(&mut self, key: &str, term_ids: &[TermId], segment_size: usize) -> DocId {
        let full = match self.segments.last() {
            Some(seg) => seg.max_doc() as usize >= segment_size,
            None => true,
        };
        if full {
            self.segments.push(Segment::new());
        }
        let doc_base = self.doc_count() as DocId - self.segments.last().map_or(0, |s| s.max_doc());
        let seg = self.segments.last_mut().expect("segment was just created");
        let local = seg.add_document(term_ids);
        self.doc_keys.push(key.to_string());
        doc_base + local
    }

    pub fn doc_count(&self) -> usize {
        self.doc_keys.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn readers(&self) -> Vec<SegmentReader<'_>> {
        let mut doc_base = 0;
        let mut readers = vec![];
        for (ord, segment) in self.segments.iter().enumerate() {
            readers.push(SegmentReader { segment, ord, doc_base });
            doc_base += segment.max_doc();
        }
        readers
    }

    // segment reader holding an absolute doc id, and the local id inside it
    pub fn locate(&self, doc: DocId) -> Option<(SegmentReader<'_>, DocId)> {
        self.readers()
            .into_iter()
            .find(|r| doc > r.doc_base && doc <= r.doc_base + r.max_doc())
            .map(|r| (r, doc - r.doc_base))
    }

    pub fn doc_key(&self, doc: DocId) -> Option<&str> {
        if doc == 0 {
            return None;
        }
        self.doc_keys.get(doc as usize - 1).map(|k| k.as_str())
    }

    // absolute doc id of the first document indexed under key
    pub fn doc_by_key(&self, key: &str) -> Option<DocId> {
        self.doc_keys.iter().position(|k| k == key).map(|i| i as DocId + 1)
    }

    pub fn doc_freq(&self, term: TermId) -> u64 {
        self.segments.iter().map(|s| s.doc_freq(term)).sum()
    }

    pub fn total_term_freq(&self, term: TermId) -> u64 {
        self.segments.iter().map(|s| s.total_term_freq(term)).sum()
    }

    pub fn total_document_length(&self) -> u64 {
        self.segments.iter().map(|s| s.total_document_length()).sum()
    }
}
