use unicode_segmentation::UnicodeSegmentation;
use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use crate::ltrcore::TermId;

// One analyzer (and one term dictionary) is shared by every shard of an
// engine, so the same word maps to the same term id in every partition.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Analyzer {
    term_ids: HashMap<String, TermId>,
    // terms[id - 1] is the word for term id
    terms: Vec<String>,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer {
            term_ids: HashMap::new(),
            terms: vec![],
        }
    }

    pub fn tokens(text: &str) -> Vec<String> {
        text.to_lowercase()
            .unicode_words()
            .map(|w| w.to_string())
            .collect()
    }

    // index time: unknown words get new ids
    pub fn analyze(&mut self, text: &str) -> Vec<TermId> {
        let mut ids = vec![];
        for token in Self::tokens(text) {
            let id = match self.term_ids.get(&token) {
                Some(id) => *id,
                None => {
                    self.terms.push(token.clone());
                    let id = self.terms.len() as TermId;
                    self.term_ids.insert(token, id);
                    id
                }
            };
            ids.push(id);
        }
        ids
    }

    // query time: returns known term ids and the words that are not in the dictionary
    pub fn parse(&self, text: &str) -> (Vec<TermId>, Vec<String>) {
        let mut known = vec![];
        let mut unknown = vec![];
        for token in Self::tokens(text) {
            match self.term_ids.get(&token) {
                Some(id) => known.push(*id),
                None => unknown.push(token),
            }
        }
        (known, unknown)
    }

    // a phrase with any word missing from the dictionary cannot match
    pub fn parse_phrase(&self, text: &str) -> Vec<TermId> {
        let (known, unknown) = self.parse(text);
        if !unknown.is_empty() {
            log::debug!("phrase [{}] holds unknown words {:?}", text, unknown);
            return vec![];
        }
        known
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.terms.get(id as usize - 1).map(|t| t.as_str())
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer() {
        let mut analyzer = Analyzer::new();
        let mut term_ids = analyzer.analyze("Do you quarrel, sir?");
        assert_eq!(term_ids, vec![1, 2, 3, 4]);
        term_ids = analyzer.analyze("Quarrel sir! no, sir!");
        assert_eq!(term_ids, vec![3, 4, 5, 4]);
        assert_eq!(analyzer.term_count(), 5);
        assert_eq!(analyzer.term(3), Some("quarrel"));
        assert_eq!(analyzer.term(0), None);
        assert_eq!(analyzer.term(42), None);

        let (known, unknown) = analyzer.parse("quarrel sir");
        assert_eq!(known, vec![3, 4]);
        assert!(unknown.is_empty());

        let (known, unknown) = analyzer.parse("quarrel sir Cool");
        assert_eq!(known, vec![3, 4]);
        assert_eq!(unknown, vec!["cool"]);

        assert_eq!(analyzer.parse_phrase("Quarrel, sir"), vec![3, 4]);
        assert!(analyzer.parse_phrase("quarrel cool sir").is_empty());
    }
}
