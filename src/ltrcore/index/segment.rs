use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::ltrcore::{DocId, TermId, TermOffset};

type Positions = Vec<TermOffset>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Posting {
    doc_id: DocId,
    term_frequency: u32,
    positions: Positions,
}

impl Posting {
    pub fn get_doc_id(&self) -> DocId {
        self.doc_id
    }
    pub fn get_term_frequency(&self) -> u32 {
        self.term_frequency
    }
    pub fn get_positions(&self) -> &Positions {
        &self.positions
    }
}

// One data partition. Documents get local ids 1..=max_doc in insertion order.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Segment {
    // termid -> postings, sorted by doc id
    postings_lists: HashMap<TermId, Vec<Posting>>,
    // number of tokens of a document, doc_id - 1 is used as vector index
    document_length: Vec<u32>,
    total_document_length: u64,
}

impl Segment {
    pub fn new() -> Self {
        Segment {
            postings_lists: HashMap::new(),
            document_length: vec![],
            total_document_length: 0,
        }
    }

    pub fn add_document(&mut self, term_ids: &[TermId]) -> DocId {
        let document_length = term_ids.len() as u32;
        self.document_length.push(document_length);
        self.total_document_length += document_length as u64;
        let doc_id = self.document_length.len() as DocId;
        for (seq, tid) in term_ids.iter().enumerate() {
            let term_offset = seq as TermOffset + 1;
            let postings = self.postings_lists.entry(*tid).or_insert_with(Vec::new);
            match postings.last_mut() {
                Some(post) if post.doc_id == doc_id => {
                    post.term_frequency += 1;
                    post.positions.push(term_offset);
                },
                _ => postings.push(Posting {
                    doc_id,
                    term_frequency: 1,
                    positions: vec![term_offset],
                }),
            }
        }
        doc_id
    }

    // number of documents, also the largest local doc id
    pub fn max_doc(&self) -> DocId {
        self.document_length.len() as DocId
    }

    pub fn is_valid_doc_id(&self, doc_id: DocId) -> bool {
        doc_id >= 1 && doc_id <= self.max_doc()
    }

    pub fn postings(&self, term: TermId) -> &[Posting] {
        match self.postings_lists.get(&term) {
            Some(postings) => postings,
            None => &[],
        }
    }

    // the number of documents in this segment containing the term
    pub fn doc_freq(&self, term: TermId) -> u64 {
        self.postings(term).len() as u64
    }

    // number of term occurences in this segment
    pub fn total_term_freq(&self, term: TermId) -> u64 {
        self.postings(term)
            .iter()
            .fold(0u64, |sum, posting| sum + posting.term_frequency as u64)
    }

    pub fn document_length(&self, doc: DocId) -> u32 {
        assert!(self.is_valid_doc_id(doc));
        self.document_length[doc as usize - 1]
    }

    pub fn total_document_length(&self) -> u64 {
        self.total_document_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltrcore::analyzer::Analyzer;

    #[test]
    fn test_add_documents() {
        let mut seg = Segment::new();
        let mut analyzer = Analyzer::new();
        let doc_id = seg.add_document(&analyzer.analyze("do you quarrel sir"));
        assert_eq!(doc_id, 1);
        let doc_id = seg.add_document(&analyzer.analyze("quarrel sir no sir"));
        assert_eq!(doc_id, 2);
        assert_eq!(seg.max_doc(), 2);
        assert!(!seg.is_valid_doc_id(0));
        assert!(!seg.is_valid_doc_id(3));
        assert_eq!(seg.total_document_length(), 8);
        assert_eq!(seg.document_length(2), 4);

        let sir = analyzer.parse("sir").0[0];
        assert_eq!(seg.doc_freq(sir), 2);
        assert_eq!(seg.total_term_freq(sir), 3);
        let postings = seg.postings(sir);
        assert_eq!(postings[1].get_doc_id(), 2);
        assert_eq!(postings[1].get_term_frequency(), 2);
        assert_eq!(postings[1].get_positions(), &vec![2, 4]);
        assert!(seg.postings(1000).is_empty());
        assert_eq!(seg.doc_freq(1000), 0);
    }
}
