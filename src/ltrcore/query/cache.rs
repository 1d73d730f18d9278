//! Caches shared by every phase and every partition of one request.

use std::sync::Arc;
use dashmap::DashMap;
use crate::ltrcore::{DocId, Result};
use crate::ltrcore::ranker::FeatureVector;
use crate::ltrcore::scoring::Weight;
use super::subquery::SubQuery;

/// Feature scores of every document scored so far, keyed by absolute doc id.
///
/// A slot holding NaN means the feature did not match the document. An
/// entry is written once and never replaced.
#[derive(Debug, Clone, Default)]
pub struct FeatureScoreCache {
    scores: Arc<DashMap<DocId, Box<[f32]>>>,
}

impl FeatureScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.scores.contains_key(&doc)
    }

    pub fn get(&self, doc: DocId) -> Option<Box<[f32]>> {
        self.scores.get(&doc).map(|entry| entry.value().clone())
    }

    // copies the cached scores of doc into the vector, returns false on a miss
    pub fn replay(&self, doc: DocId, vector: &mut FeatureVector) -> bool {
        match self.scores.get(&doc) {
            Some(entry) => {
                for (ordinal, score) in entry.value().iter().enumerate() {
                    if !score.is_nan() {
                        vector.set_feature_score(ordinal, *score);
                    }
                }
                true
            },
            None => false,
        }
    }

    // first writer wins
    pub fn insert_once(&self, doc: DocId, scores: Box<[f32]>) {
        self.scores.entry(doc).or_insert(scores);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn ptr_eq(&self, other: &FeatureScoreCache) -> bool {
        Arc::ptr_eq(&self.scores, &other.scores)
    }
}

/// Weights of canonical sub-queries, built once per request and reused by
/// every later phase so they all score with the same statistics.
#[derive(Debug, Clone, Default)]
pub struct WeightCache {
    weights: Arc<DashMap<SubQuery, Arc<dyn Weight>>>,
}

impl WeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &SubQuery) -> Option<Arc<dyn Weight>> {
        self.weights.get(query).map(|entry| entry.value().clone())
    }

    /// Returns the cached weight of `query`, building it on a miss.
    ///
    /// Racing builders may both run `create`, the first insert is kept and
    /// returned to both.
    pub fn get_or_create<F>(&self, query: SubQuery, create: F) -> Result<Arc<dyn Weight>>
    where
        F: FnOnce(&SubQuery) -> Result<Arc<dyn Weight>>,
    {
        if let Some(weight) = self.get(&query) {
            log::debug!("weight cache hit for {}", query.kind());
            return Ok(weight);
        }
        let created = create(&query)?;
        if !created.is_cacheable() {
            return Ok(created);
        }
        log::debug!("weight cache miss for {}", query.kind());
        let weight = self.weights.entry(query).or_insert(created).value().clone();
        Ok(weight)
    }

    // adds the weights of other, existing entries are kept
    pub fn merge_from(&self, other: &WeightCache) {
        if self.ptr_eq(other) {
            return;
        }
        for entry in other.weights.iter() {
            self.weights
                .entry(entry.key().clone())
                .or_insert_with(|| entry.value().clone());
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn ptr_eq(&self, other: &WeightCache) -> bool {
        Arc::ptr_eq(&self.weights, &other.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::ltrcore::scoring::constant::ConstantWeight;
    use crate::ltrcore::query::subquery::QueryFloat;

    #[test]
    fn test_feature_score_cache() {
        let cache = FeatureScoreCache::new();
        assert!(cache.is_empty());
        cache.insert_once(7, vec![1.0, f32::NAN, 3.0].into_boxed_slice());
        cache.insert_once(7, vec![9.0, 9.0, 9.0].into_boxed_slice());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(7));
        assert_eq!(cache.get(7).unwrap()[0], 1.0);

        let mut fv = FeatureVector::new(3, -1.0);
        assert!(cache.replay(7, &mut fv));
        assert_eq!(fv.feature_score(0), 1.0);
        assert_eq!(fv.feature_score(1), -1.0);
        assert!(!fv.is_set(1));
        assert_eq!(fv.feature_score(2), 3.0);
        assert!(!cache.replay(8, &mut fv));

        let shared = cache.clone();
        assert!(shared.ptr_eq(&cache));
        assert!(!FeatureScoreCache::new().ptr_eq(&cache));
    }

    #[test]
    fn test_weight_cache_builds_once() {
        let cache = WeightCache::new();
        let built = AtomicUsize::new(0);
        let create = |q: &SubQuery| -> Result<Arc<dyn Weight>> {
            built.fetch_add(1, Ordering::SeqCst);
            match q {
                SubQuery::Constant { score } => Ok(Arc::new(ConstantWeight::new(score.value()))),
                _ => unreachable!(),
            }
        };
        let q = SubQuery::Constant { score: QueryFloat(2.0) };
        let first = cache.get_or_create(q.clone(), create).unwrap();
        let second = cache.get_or_create(q.clone(), create).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);

        let merged = WeightCache::new();
        merged.merge_from(&cache);
        assert!(Arc::ptr_eq(&merged.get(&q).unwrap(), &first));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_weight_cache_concurrent_builders_share_first_insert() {
        use std::sync::Barrier;
        use std::thread;

        let cache = WeightCache::new();
        let barrier = Barrier::new(2);
        let q = SubQuery::Constant { score: QueryFloat(3.0) };
        let weights: Vec<Arc<dyn Weight>> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let (cache, barrier, q) = (&cache, &barrier, q.clone());
                    s.spawn(move || {
                        barrier.wait();
                        cache
                            .get_or_create(q, |q| match q {
                                SubQuery::Constant { score } => Ok(Arc::new(ConstantWeight::new(score.value())) as Arc<dyn Weight>),
                                _ => unreachable!(),
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(Arc::ptr_eq(&weights[0], &weights[1]));
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get(&q).unwrap(), &weights[0]));
    }

    #[test]
    fn test_weight_cache_skips_not_cacheable() {
        let cache = WeightCache::new();
        let q = SubQuery::Constant { score: QueryFloat(1.0) };
        let weight = cache
            .get_or_create(q, |_| Ok(Arc::new(ConstantWeight::new(1.0).not_cacheable())))
            .unwrap();
        assert!(!weight.is_cacheable());
        assert!(cache.is_empty());
    }
}
