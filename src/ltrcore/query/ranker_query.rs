//! Scores documents with a learned model over the values of many features.
//!
//! A [`RankerQuery`] turns every feature of a set into a sub-query. Its
//! weight keeps one sub-scorer per feature and, for every document of a
//! segment, assembles a [`FeatureVector`] from the sub-scorers positioned on
//! that document before handing it to the model.
//!
//! Two caches live as long as the query handle. Weights of canonical
//! sub-queries are built once per request, and the per-document feature
//! scores computed while ranking are kept so a later logging phase can
//! replay them instead of scoring again.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use crate::ltrcore::{DocId, LtrError, Params, Result, TermId};
use crate::ltrcore::feature::{FeatureSet, LtrModel, LtrQueryContext};
use crate::ltrcore::index::SegmentReader;
use crate::ltrcore::ranker::{FeatureVector, LogLtrRanker, LtrRanker, NullRanker, SharedLogConsumer};
use crate::ltrcore::scoring::{DocIdSetIterator, Explanation, ScoreMode, Scorer, ScoringContext, Weight};
use crate::ltrcore::scoring::constant::ConstantWeight;
use crate::ltrcore::stats::{LtrStats, StatName};
use super::cache::{FeatureScoreCache, WeightCache};
use super::context::RequestContext;
use super::disjunction::DisjunctionIterator;
use super::searcher::IndexSearcher;
use super::subquery::{LtrRewriteContext, SubQuery};

/// Identity of a ranking query: its sub-queries, features and model.
///
/// Caches are not part of it, two handles built from the same model and
/// parameters compare equal whatever their caches hold.
#[derive(Debug, Clone)]
pub struct RankerQuerySpec {
    queries: Vec<SubQuery>,
    features: Arc<FeatureSet>,
    ranker: Arc<dyn LtrRanker>,
}

impl RankerQuerySpec {
    pub fn queries(&self) -> &[SubQuery] {
        &self.queries
    }

    pub fn features(&self) -> &Arc<FeatureSet> {
        &self.features
    }

    pub fn ranker(&self) -> &Arc<dyn LtrRanker> {
        &self.ranker
    }
}

impl PartialEq for RankerQuerySpec {
    fn eq(&self, other: &Self) -> bool {
        self.queries == other.queries
            && self.features == other.features
            && Arc::as_ptr(&self.ranker) as *const () == Arc::as_ptr(&other.ranker) as *const ()
    }
}

impl Eq for RankerQuerySpec {}

impl Hash for RankerQuerySpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.features.hash(state);
        self.queries.hash(state);
        self.ranker.name().hash(state);
    }
}

/// Execution handle of a ranking query, owns the request scoped caches.
#[derive(Debug, Clone)]
pub struct RankerQuery {
    spec: RankerQuerySpec,
    // None when feature scores are not cached
    feature_score_cache: Option<FeatureScoreCache>,
    weight_cache: WeightCache,
    stats: Arc<LtrStats>,
}

impl RankerQuery {
    fn new(
        spec: RankerQuerySpec,
        feature_score_cache: Option<FeatureScoreCache>,
        weight_cache: WeightCache,
        stats: Arc<LtrStats>,
    ) -> Self {
        RankerQuery { spec, feature_score_cache, weight_cache, stats }
    }

    pub fn build(
        model: &LtrModel,
        ctx: &LtrQueryContext<'_>,
        params: &Params,
        feature_score_cache: bool,
        stats: Arc<LtrStats>,
    ) -> Result<Self> {
        Self::build_with(model.ranker().clone(), model.feature_set().clone(), ctx, params, feature_score_cache, stats)
    }

    // prebuilt models take no parameters and never cache feature scores
    pub fn build_prebuilt(model: &LtrModel, stats: Arc<LtrStats>) -> Result<Self> {
        Self::build_with(
            model.ranker().clone(),
            model.feature_set().clone(),
            &LtrQueryContext::empty(),
            &Params::new(),
            false,
            stats,
        )
    }

    fn build_with(
        ranker: Arc<dyn LtrRanker>,
        features: Arc<FeatureSet>,
        ctx: &LtrQueryContext<'_>,
        params: &Params,
        feature_score_cache: bool,
        stats: Arc<LtrStats>,
    ) -> Result<Self> {
        let queries = features.to_queries(ctx, params)?;
        let spec = RankerQuerySpec { queries, features, ranker };
        let cache = if feature_score_cache { Some(FeatureScoreCache::new()) } else { None };
        Ok(Self::new(spec, cache, WeightCache::new(), stats))
    }

    /// Query that only logs feature values, the model score is always 0.
    pub fn build_log_query(
        consumer: SharedLogConsumer,
        features: Arc<FeatureSet>,
        ctx: &LtrQueryContext<'_>,
        params: &Params,
        stats: Arc<LtrStats>,
    ) -> Result<Self> {
        let queries = features.to_queries(ctx, params)?;
        let ranker = Arc::new(LogLtrRanker::new(Arc::new(NullRanker::new(features.size())), consumer));
        let spec = RankerQuerySpec { queries, features, ranker };
        Ok(Self::new(spec, None, WeightCache::new(), stats))
    }

    /// Same features, logged instead of ranked.
    ///
    /// Shares the weight cache, and the feature score cache when there is
    /// one, so logging sees the values computed while ranking.
    pub fn to_logger_query(&self, consumer: SharedLogConsumer) -> RankerQuery {
        let null = Arc::new(NullRanker::new(self.spec.features.size()));
        let spec = RankerQuerySpec {
            queries: self.spec.queries.clone(),
            features: self.spec.features.clone(),
            ranker: Arc::new(LogLtrRanker::new(null, consumer)),
        };
        let cache = self.feature_score_cache.clone().unwrap_or_default();
        Self::new(spec, Some(cache), self.weight_cache.clone(), self.stats.clone())
    }

    // rewrites every sub-query, the caches are kept
    pub fn rewrite(&self, searcher: &IndexSearcher<'_>) -> RankerQuery {
        let queries: Vec<SubQuery> = self.spec.queries.iter().map(|q| q.rewrite(searcher)).collect();
        if queries == self.spec.queries {
            return self.clone();
        }
        let spec = RankerQuerySpec { queries, ..self.spec.clone() };
        Self::new(spec, self.feature_score_cache.clone(), self.weight_cache.clone(), self.stats.clone())
    }

    pub fn spec(&self) -> &RankerQuerySpec {
        &self.spec
    }

    pub fn feature_set(&self) -> &Arc<FeatureSet> {
        &self.spec.features
    }

    pub fn ranker(&self) -> &Arc<dyn LtrRanker> {
        &self.spec.ranker
    }

    pub fn feature_score_cache(&self) -> Option<&FeatureScoreCache> {
        self.feature_score_cache.as_ref()
    }

    pub fn weight_cache(&self) -> &WeightCache {
        &self.weight_cache
    }

    pub fn extract_terms(&self, terms: &mut BTreeSet<TermId>) {
        for q in &self.spec.queries {
            q.extract_terms(terms);
        }
    }

    /// Builds the executable form of the query for one shard.
    ///
    /// Fails right away when the plugin is disabled. Any other failure is
    /// counted as a request error and returned unchanged.
    pub fn create_weight(
        &self,
        searcher: &IndexSearcher<'_>,
        ctx: &RequestContext,
        mode: ScoreMode,
    ) -> Result<Arc<dyn Weight>> {
        if !ctx.settings().is_plugin_enabled() {
            return Err(LtrError::PluginDisabled);
        }
        self.create_weight_internal(searcher, ctx, mode).map_err(|e| {
            self.stats.increment(StatName::RequestErrorCount);
            e
        })
    }

    fn create_weight_internal(
        &self,
        searcher: &IndexSearcher<'_>,
        ctx: &RequestContext,
        mode: ScoreMode,
    ) -> Result<Arc<dyn Weight>> {
        if !mode.needs_scores() {
            return Ok(Arc::new(ConstantWeight::new(1.0).not_cacheable()));
        }
        let rewrite_ctx = LtrRewriteContext::new(self.spec.ranker.as_ref());
        // a cache handed in by the request wins over the one of this handle
        let cache = ctx.weight_cache().unwrap_or(&self.weight_cache);
        let mut weights = Vec::with_capacity(self.spec.queries.len());
        for query in &self.spec.queries {
            let query = query.ltr_rewrite(&rewrite_ctx)?;
            let canonical = query.rewrite(searcher);
            weights.push(cache.get_or_create(canonical, |q| q.create_weight(searcher))?);
        }
        Ok(Arc::new(RankerWeight {
            weights,
            ranker: self.spec.ranker.clone(),
            features: self.spec.features.clone(),
            feature_score_cache: self.feature_score_cache.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct RankerWeight {
    // one per feature, in ordinal order
    weights: Vec<Arc<dyn Weight>>,
    ranker: Arc<dyn LtrRanker>,
    features: Arc<FeatureSet>,
    feature_score_cache: Option<FeatureScoreCache>,
}

impl Weight for RankerWeight {
    fn description(&self) -> String {
        format!("rankerquery({})", self.ranker.name())
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        let mut scorers = Vec::with_capacity(self.weights.len());
        for weight in &self.weights {
            scorers.push(weight.scorer(reader)?);
        }
        let iterator = DisjunctionIterator::new(
            reader.max_doc(),
            scorers,
            reader.doc_base(),
            self.feature_score_cache.clone(),
        );
        Ok(Some(Box::new(RankerScorer {
            iterator,
            ranker: self.ranker.clone(),
            fv: None,
            feature_score_cache: self.feature_score_cache.clone(),
        })))
    }

    // walks every feature, the feature score cache is not consulted
    fn explain(&self, reader: SegmentReader<'_>, doc: DocId, _ctx: &ScoringContext<'_>) -> Result<Explanation> {
        let mut fv = self.ranker.new_feature_vector(None);
        let mut subs = Vec::with_capacity(self.weights.len());
        for (ordinal, weight) in self.weights.iter().enumerate() {
            let explain = weight.explain(reader, doc, &ScoringContext::with_vector(&fv))?;
            let feature = format!("Feature {}({}):", ordinal, self.features.feature(ordinal).name());
            if !explain.is_match() {
                subs.push(Explanation::no_match(&format!(
                    "{} [no match, default value of {:.2} used]",
                    feature,
                    fv.default_score()
                )));
            } else {
                let value = explain.value();
                subs.push(Explanation::matched(value, &feature, vec![explain]));
                fv.set_feature_score(ordinal, value);
            }
        }
        let score = self.ranker.score(&fv);
        let description = format!("LtrModel: {} using features:", self.ranker.name());
        Ok(Explanation::matched(score, &description, subs))
    }

    fn is_cacheable(&self) -> bool {
        false
    }
}

pub struct RankerScorer<'a> {
    iterator: DisjunctionIterator<'a>,
    ranker: Arc<dyn LtrRanker>,
    // reused between documents
    fv: Option<FeatureVector>,
    feature_score_cache: Option<FeatureScoreCache>,
}

impl<'a> RankerScorer<'a> {
    // sets the score of every sub-scorer positioned on doc, returns them
    // with NaN for features that did not match
    fn collect_features(&mut self, doc: DocId, fv: &mut FeatureVector) -> Vec<f32> {
        let consumer = self.ranker.log_consumer();
        let scorers = self.iterator.sub_scorers_mut();
        let mut scores = vec![f32::NAN; scorers.len()];
        for (ordinal, scorer) in scorers.iter_mut().enumerate() {
            if let Some(scorer) = scorer {
                if scorer.doc_id() == doc {
                    let ctx = ScoringContext::with_vector(fv).with_log_consumer(consumer);
                    let score = scorer.score(&ctx);
                    fv.set_feature_score(ordinal, score);
                    scores[ordinal] = score;
                }
            }
        }
        scores
    }
}

impl<'a> DocIdSetIterator for RankerScorer<'a> {
    fn doc_id(&self) -> DocId {
        self.iterator.doc_id()
    }

    fn next_doc(&mut self) -> DocId {
        self.iterator.next_doc()
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.iterator.advance(target)
    }

    fn cost(&self) -> u64 {
        self.iterator.cost()
    }
}

impl<'a> Scorer for RankerScorer<'a> {
    fn score(&mut self, _ctx: &ScoringContext<'_>) -> f32 {
        let mut fv = self.ranker.new_feature_vector(self.fv.take());
        let doc = self.doc_id();
        match self.feature_score_cache.clone() {
            None => {
                self.collect_features(doc, &mut fv);
            },
            Some(cache) => {
                let abs = self.iterator.doc_base() + doc;
                if !cache.replay(abs, &mut fv) {
                    let scores = self.collect_features(doc, &mut fv);
                    cache.insert_once(abs, scores.into_boxed_slice());
                }
            },
        }
        let score = self.ranker.score(&fv);
        self.fv = Some(fv);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::ltrcore::NO_MORE_DOCS;
    use crate::ltrcore::analyzer::Analyzer;
    use crate::ltrcore::feature::{Feature, PrebuiltFeature};
    use crate::ltrcore::index::Shard;
    use crate::ltrcore::ranker::LinearRanker;
    use crate::ltrcore::settings::LtrSettings;
    use crate::ltrcore::query::subquery::{DerivedExpr, QueryFloat};

    fn shard(analyzer: &mut Analyzer) -> Shard {
        let mut shard = Shard::new();
        for text in [
            "do you quarrel sir",
            "quarrel sir no sir",
            "if you do sir i am for you",
            "no better",
        ] {
            shard.add_document(text, &analyzer.analyze(text), 2);
        }
        shard
    }

    fn model(analyzer: &Analyzer, weights: Vec<f32>, default_score: f32) -> LtrModel {
        let terms = |text: &str| analyzer.parse(text).0;
        let queries = vec![
            ("quarrel", SubQuery::Match { terms: terms("quarrel") }),
            ("better", SubQuery::Phrase { terms: terms("no better") }),
            ("you", SubQuery::Lmd { terms: terms("you") }),
        ];
        let ranker = Arc::new(LinearRanker::new("lin", weights, default_score));
        LtrModel::prebuilt("model", queries, ranker).unwrap()
    }

    fn scores_of(weight: &Arc<dyn Weight>, reader: SegmentReader<'_>) -> Vec<(DocId, f32)> {
        let mut scorer = weight.scorer(reader).unwrap().unwrap();
        let mut scores = vec![];
        while scorer.next_doc() != NO_MORE_DOCS {
            scores.push((scorer.doc_id(), scorer.score(&ScoringContext::none())));
        }
        scores
    }

    #[test]
    fn test_vector_holds_default_for_unmatched_features() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let ltr_model = model(&analyzer, vec![1.0, 10.0, 100.0], 0.25);
        let stats = Arc::new(LtrStats::new());
        let query = RankerQuery::build(&ltr_model, &LtrQueryContext::new(&analyzer), &Params::new(), true, stats).unwrap();
        let weight = query.create_weight(&searcher, &RequestContext::default(), ScoreMode::Complete).unwrap();

        // doc 1 matches features 0 and 2 only
        let reader = searcher.readers()[0];
        let scores = scores_of(&weight, reader);
        assert_eq!(scores.len(), 2);
        let cached = query.feature_score_cache().unwrap().get(1).unwrap();
        assert!(cached[0] > 0.0);
        assert!(cached[1].is_nan());
        assert!(!cached[2].is_nan());
        let expected = cached[0] + 10.0 * 0.25 + 100.0 * cached[2];
        assert!((scores[0].1 - expected).abs() < 1e-4);

        // second segment holds absolute docs 3 and 4
        let scores = scores_of(&weight, searcher.readers()[1]);
        assert_eq!(scores.iter().map(|s| s.0).collect::<Vec<_>>(), vec![1, 2]);
        let cache = query.feature_score_cache().unwrap();
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(4).unwrap()[1], 1.0);
    }

    #[test]
    fn test_cache_disabled_matches_enabled() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let ltr_model = model(&analyzer, vec![1.0, 2.0, 3.0], 0.0);
        let ctx = LtrQueryContext::new(&analyzer);
        let stats = Arc::new(LtrStats::new());
        let request = RequestContext::default();
        let cached = RankerQuery::build(&ltr_model, &ctx, &Params::new(), true, stats.clone()).unwrap();
        let plain = RankerQuery::build(&ltr_model, &ctx, &Params::new(), false, stats).unwrap();
        assert!(plain.feature_score_cache().is_none());
        assert_eq!(cached.spec(), plain.spec());

        for reader in searcher.readers() {
            let a = scores_of(&cached.create_weight(&searcher, &request, ScoreMode::Complete).unwrap(), reader);
            let b = scores_of(&plain.create_weight(&searcher, &request, ScoreMode::Complete).unwrap(), reader);
            assert_eq!(a, b);
        }
    }

    // phrase weight that counts how often its scorers are advanced
    #[derive(Debug)]
    struct CountingWeight {
        inner: Arc<dyn Weight>,
        advances: Arc<AtomicUsize>,
    }

    struct CountingScorer<'a> {
        inner: Box<dyn Scorer + 'a>,
        advances: Arc<AtomicUsize>,
    }

    impl Weight for CountingWeight {
        fn description(&self) -> String {
            "counting".to_string()
        }
        fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
            let advances = self.advances.clone();
            Ok(self.inner.scorer(reader)?.map(|inner| {
                Box::new(CountingScorer { inner, advances }) as Box<dyn Scorer + 'a>
            }))
        }
    }

    impl<'a> DocIdSetIterator for CountingScorer<'a> {
        fn doc_id(&self) -> DocId {
            self.inner.doc_id()
        }
        fn next_doc(&mut self) -> DocId {
            self.advances.fetch_add(1, Ordering::SeqCst);
            self.inner.next_doc()
        }
        fn advance(&mut self, target: DocId) -> DocId {
            self.advances.fetch_add(1, Ordering::SeqCst);
            self.inner.advance(target)
        }
        fn cost(&self) -> u64 {
            self.inner.cost()
        }
    }

    impl<'a> Scorer for CountingScorer<'a> {
        fn score(&mut self, ctx: &ScoringContext<'_>) -> f32 {
            self.inner.score(ctx)
        }
    }

    #[test]
    fn test_second_pass_replays_cache() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let ltr_model = model(&analyzer, vec![1.0, 1.0, 1.0], 0.0);
        let query = RankerQuery::build(
            &ltr_model, &LtrQueryContext::new(&analyzer), &Params::new(), true, Arc::new(LtrStats::new())).unwrap();
        let advances = Arc::new(AtomicUsize::new(0));
        let weight: Arc<dyn Weight> = Arc::new(RankerWeight {
            weights: query.spec().queries().iter().map(|q| {
                let inner = q.rewrite(&searcher).create_weight(&searcher).unwrap();
                Arc::new(CountingWeight { inner, advances: advances.clone() }) as Arc<dyn Weight>
            }).collect(),
            ranker: query.ranker().clone(),
            features: query.feature_set().clone(),
            feature_score_cache: query.feature_score_cache().cloned(),
        });
        let reader = searcher.readers()[0];

        let first = scores_of(&weight, reader);
        let first_vectors: Vec<Box<[f32]>> = (1..=2).map(|d| query.feature_score_cache().unwrap().get(d).unwrap()).collect();
        assert!(advances.load(Ordering::SeqCst) > 0);

        advances.store(0, Ordering::SeqCst);
        let second = scores_of(&weight, reader);
        assert_eq!(advances.load(Ordering::SeqCst), 0);
        assert_eq!(first, second);
        for d in 1..=2 {
            let again = query.feature_score_cache().unwrap().get(d).unwrap();
            let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
            assert_eq!(bits(&again[..]), bits(&first_vectors[d as usize - 1][..]));
        }
    }

    #[test]
    fn test_derived_feature_reads_siblings() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let queries = vec![
            ("base", SubQuery::Constant { score: QueryFloat(2.0) }),
            ("twice", SubQuery::Derived(DerivedExpr::new(vec![(0, 2.0)], 1.0))),
        ];
        let ranker = Arc::new(LinearRanker::new("lin", vec![0.0, 1.0], 0.0));
        let ltr_model = LtrModel::prebuilt("derived", queries, ranker).unwrap();
        let query = RankerQuery::build_prebuilt(&ltr_model, Arc::new(LtrStats::new())).unwrap();
        assert!(query.feature_score_cache().is_none());
        let weight = query.create_weight(&searcher, &RequestContext::default(), ScoreMode::Complete).unwrap();
        let scores = scores_of(&weight, searcher.readers()[0]);
        assert_eq!(scores, vec![(1, 5.0), (2, 5.0)]);

        let explanation = weight.explain(searcher.readers()[0], 1, &ScoringContext::none()).unwrap();
        assert_eq!(explanation.value(), 5.0);
        assert_eq!(explanation.description(), "LtrModel: lin using features:");
        assert_eq!(explanation.details()[1].description(), "Feature 1(twice):");
    }

    #[test]
    fn test_explain_matches_score() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let ltr_model = model(&analyzer, vec![1.0, 2.0, 3.0], 0.5);
        let query = RankerQuery::build(
            &ltr_model, &LtrQueryContext::new(&analyzer), &Params::new(), true, Arc::new(LtrStats::new())).unwrap();
        let weight = query.create_weight(&searcher, &RequestContext::default(), ScoreMode::Complete).unwrap();
        let reader = searcher.readers()[0];
        let scores = scores_of(&weight, reader);
        let explanation = weight.explain(reader, 1, &ScoringContext::none()).unwrap();
        assert!((explanation.value() - scores[0].1).abs() < 1e-6);
        assert_eq!(
            explanation.details()[1].description(),
            "Feature 1(better): [no match, default value of 0.50 used]"
        );
        assert!(!explanation.details()[1].is_match());
    }

    #[test]
    fn test_weight_cache_shared_with_logger_query() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let ltr_model = model(&analyzer, vec![1.0, 1.0, 1.0], 0.0);
        let query = RankerQuery::build(
            &ltr_model, &LtrQueryContext::new(&analyzer), &Params::new(), true, Arc::new(LtrStats::new())).unwrap();
        query.create_weight(&searcher, &RequestContext::default(), ScoreMode::Complete).unwrap();
        assert_eq!(query.weight_cache().len(), 3);
        let canonical = query.spec().queries()[0].rewrite(&searcher);
        let cached = query.weight_cache().get(&canonical).unwrap();

        let recorder: SharedLogConsumer = Arc::new(parking_lot::Mutex::new(NoopConsumer::default()));
        let logger = query.rewrite(&searcher).to_logger_query(recorder);
        assert!(logger.weight_cache().ptr_eq(query.weight_cache()));
        assert!(logger.feature_score_cache().unwrap().ptr_eq(query.feature_score_cache().unwrap()));
        assert_eq!(logger.spec().queries()[0], canonical);
        logger.create_weight(&searcher, &RequestContext::default(), ScoreMode::Complete).unwrap();
        assert_eq!(query.weight_cache().len(), 3);
        assert!(Arc::ptr_eq(&logger.weight_cache().get(&canonical).unwrap(), &cached));
    }

    #[derive(Default)]
    struct NoopConsumer {
        extra: serde_json::Map<String, serde_json::Value>,
    }

    impl crate::ltrcore::ranker::LogConsumer for NoopConsumer {
        fn next_doc(&mut self, _hit: usize) {}
        fn accept(&mut self, _ordinal: usize, _score: f32) {}
        fn extra_logging_map(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
            &mut self.extra
        }
    }

    #[test]
    fn test_create_weight_errors() {
        let mut analyzer = Analyzer::new();
        let shard = shard(&mut analyzer);
        let searcher = IndexSearcher::new(&shard);
        let stats = Arc::new(LtrStats::new());

        let ltr_model = model(&analyzer, vec![1.0, 1.0, 1.0], 0.0);
        let query = RankerQuery::build(
            &ltr_model, &LtrQueryContext::new(&analyzer), &Params::new(), true, stats.clone()).unwrap();
        let mut settings = LtrSettings::default();
        settings.set_plugin_enabled(false);
        match query.create_weight(&searcher, &RequestContext::new(settings), ScoreMode::Complete) {
            Err(LtrError::PluginDisabled) => {},
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(stats.get(StatName::RequestErrorCount), 0);

        // derived feature pointing past the end of the set
        let features: Vec<Arc<dyn Feature>> = vec![
            Arc::new(PrebuiltFeature::new("bad", SubQuery::Derived(DerivedExpr::new(vec![(3, 1.0)], 0.0)))),
        ];
        let set = Arc::new(FeatureSet::new("set", features).unwrap());
        let bad = LtrModel::new("bad", set, Arc::new(LinearRanker::new("lin", vec![1.0], 0.0))).unwrap();
        let query = RankerQuery::build_prebuilt(&bad, stats.clone()).unwrap();
        assert!(query.create_weight(&searcher, &RequestContext::default(), ScoreMode::Complete).is_err());
        assert_eq!(stats.get(StatName::RequestErrorCount), 1);

        // no scores needed, every doc matches with a constant score
        let weight = query.create_weight(&searcher, &RequestContext::default(), ScoreMode::CompleteNoScores).unwrap();
        assert!(!weight.is_cacheable());
        assert_eq!(scores_of(&weight, searcher.readers()[0]), vec![(1, 1.0), (2, 1.0)]);
    }
}
