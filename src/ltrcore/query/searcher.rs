use std::collections::{BTreeSet, HashMap};
use crate::ltrcore::{DocId, Result, TermId};
use crate::ltrcore::index::{SegmentReader, Shard};
use crate::ltrcore::scoring::{Scorer, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollectionStatistics {
    pub doc_count: u64,
    // sum of all document lengths, in tokens
    pub sum_total_term_freq: u64,
}

impl CollectionStatistics {
    pub fn average_document_length(&self) -> f32 {
        if self.doc_count == 0 {
            return 0.0;
        }
        self.sum_total_term_freq as f32 / self.doc_count as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TermStatistics {
    // the number of documents containing the term
    pub doc_freq: u64,
    // number of term occurences
    pub total_term_freq: u64,
}

/// Term and collection statistics merged across every shard of a request,
/// computed up front so scores are comparable between shards.
#[derive(Debug, Clone, Default)]
pub struct AggregatedDfs {
    collection: CollectionStatistics,
    terms: HashMap<TermId, TermStatistics>,
}

impl AggregatedDfs {
    pub fn collect(shards: &[Shard], terms: &BTreeSet<TermId>) -> Self {
        let mut dfs = AggregatedDfs::default();
        for shard in shards {
            dfs.collection.doc_count += shard.doc_count() as u64;
            dfs.collection.sum_total_term_freq += shard.total_document_length();
            for term in terms {
                let stats = dfs.terms.entry(*term).or_default();
                stats.doc_freq += shard.doc_freq(*term);
                stats.total_term_freq += shard.total_term_freq(*term);
            }
        }
        log::debug!("dfs over {} shards, {} terms, {} docs", shards.len(), dfs.terms.len(), dfs.collection.doc_count);
        dfs
    }

    pub fn term_statistics(&self, term: TermId) -> Option<TermStatistics> {
        self.terms.get(&term).copied()
    }

    pub fn collection_statistics(&self) -> CollectionStatistics {
        self.collection
    }
}

// Searches one shard. Statistics come from the shard itself unless global
// (dfs) statistics were handed in.
#[derive(Clone, Copy)]
pub struct IndexSearcher<'s> {
    shard: &'s Shard,
    dfs: Option<&'s AggregatedDfs>,
}

impl<'s> IndexSearcher<'s> {
    pub fn new(shard: &'s Shard) -> Self {
        IndexSearcher { shard, dfs: None }
    }

    pub fn with_dfs(mut self, dfs: Option<&'s AggregatedDfs>) -> Self {
        self.dfs = dfs;
        self
    }

    pub fn shard(&self) -> &'s Shard {
        self.shard
    }

    pub fn has_dfs(&self) -> bool {
        self.dfs.is_some()
    }

    pub fn max_doc(&self) -> DocId {
        self.shard.doc_count() as DocId
    }

    pub fn readers(&self) -> Vec<SegmentReader<'s>> {
        self.shard.readers()
    }

    pub fn collection_statistics(&self) -> CollectionStatistics {
        match self.dfs {
            Some(dfs) => dfs.collection_statistics(),
            None => CollectionStatistics {
                doc_count: self.shard.doc_count() as u64,
                sum_total_term_freq: self.shard.total_document_length(),
            },
        }
    }

    pub fn term_statistics(&self, term: TermId) -> TermStatistics {
        if let Some(stats) = self.dfs.and_then(|dfs| dfs.term_statistics(term)) {
            return stats;
        }
        TermStatistics {
            doc_freq: self.shard.doc_freq(term),
            total_term_freq: self.shard.total_term_freq(term),
        }
    }

    /// Positions a scorer of `weight` on each of the absolute `docs` and
    /// calls `visit` with the doc's index when the weight matches it.
    ///
    /// Docs are visited in ascending order, one scorer per segment.
    pub fn visit_docs<F>(&self, weight: &dyn Weight, docs: &[DocId], mut visit: F) -> Result<()>
    where
        F: FnMut(usize, &mut (dyn Scorer + 's)),
    {
        let mut order: Vec<usize> = (0..docs.len()).collect();
        order.sort_by_key(|&i| docs[i]);
        let mut current: Option<(usize, Option<Box<dyn Scorer + 's>>)> = None;
        for i in order {
            let (reader, local) = match self.shard.locate(docs[i]) {
                Some(found) => found,
                None => continue,
            };
            if current.as_ref().map(|(ord, _)| *ord) != Some(reader.ord()) {
                current = Some((reader.ord(), weight.scorer(reader)?));
            }
            if let Some((_, Some(scorer))) = current.as_mut() {
                let at = if scorer.doc_id() >= local { scorer.doc_id() } else { scorer.advance(local) };
                if at == local {
                    visit(i, scorer.as_mut());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_global_statistics() {
        let mut shards = vec![Shard::new(), Shard::new()];
        shards[0].add_document("a", &[1, 2], 10);
        shards[0].add_document("b", &[2], 10);
        shards[1].add_document("c", &[1, 1, 3, 4], 10);

        let local = IndexSearcher::new(&shards[0]);
        assert_eq!(local.term_statistics(1), TermStatistics { doc_freq: 1, total_term_freq: 1 });
        assert_eq!(local.collection_statistics().doc_count, 2);
        assert_eq!(local.collection_statistics().average_document_length(), 1.5);

        let terms: BTreeSet<TermId> = [1, 2].into_iter().collect();
        let dfs = AggregatedDfs::collect(&shards, &terms);
        let global = IndexSearcher::new(&shards[0]).with_dfs(Some(&dfs));
        assert!(global.has_dfs());
        assert_eq!(global.term_statistics(1), TermStatistics { doc_freq: 2, total_term_freq: 3 });
        assert_eq!(global.collection_statistics().doc_count, 3);
        assert_eq!(global.collection_statistics().sum_total_term_freq, 7);
        // terms not collected fall back to the shard
        assert_eq!(global.term_statistics(3), TermStatistics { doc_freq: 0, total_term_freq: 0 });
        assert_eq!(global.max_doc(), 2);
    }

    #[test]
    fn test_visit_docs_across_segments() {
        use crate::ltrcore::scoring::ScoringContext;
        use crate::ltrcore::scoring::bm25::Bm25Weight;

        let mut shard = Shard::new();
        for terms in [&[1, 2][..], &[2], &[1], &[3], &[1, 1]] {
            shard.add_document("d", terms, 2);
        }
        let searcher = IndexSearcher::new(&shard);
        let weight = Bm25Weight::new(&searcher, &[1]);
        let docs = [5, 4, 1, 3, 9];
        let mut visited = vec![];
        searcher.visit_docs(&weight, &docs, |i, scorer| {
            assert!(scorer.score(&ScoringContext::none()) > 0.0);
            visited.push(docs[i]);
        }).unwrap();
        assert_eq!(visited, vec![1, 3, 5]);
    }
}
