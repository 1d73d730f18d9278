use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};
use crate::ltrcore::{DocId, Params, Result, TermId, NO_MORE_DOCS};
use crate::ltrcore::analyzer::Analyzer;
use crate::ltrcore::corpus::{self, Document, DEFAULT_FIELDS};
use crate::ltrcore::feature::{FeatureSet, LtrQueryContext, QueryBuilder};
use crate::ltrcore::index::{SegmentReader, Shard};
use crate::ltrcore::logging::{HitLogConsumer, LogEntry, LoggingFetchPhase, LoggingSearchExt};
use crate::ltrcore::logging::fetch::log_docs;
use crate::ltrcore::query::{AggregatedDfs, IndexSearcher, Query, RankerQuery, RequestContext};
use crate::ltrcore::ranker::SharedLogConsumer;
use crate::ltrcore::scoring::{Explanation, ScoreMode, ScoringContext, Weight};
use crate::ltrcore::settings::LtrSettings;
use crate::ltrcore::stats::LtrStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    QueryThenFetch,
    // term statistics are merged across shards before the query phase
    DfsQueryThenFetch,
}

#[derive(Debug, Clone)]
pub enum RescoreBuilder {
    Query {
        query: QueryBuilder,
        query_weight: f32,
        rescore_query_weight: f32,
        window_size: usize,
    },
    Scale {
        factor: f32,
        window_size: usize,
    },
}

impl RescoreBuilder {
    pub fn query(query: QueryBuilder, window_size: usize) -> Self {
        RescoreBuilder::Query {
            query,
            query_weight: 1.0,
            rescore_query_weight: 1.0,
            window_size,
        }
    }

    fn to_rescore(&self, analyzer: &Analyzer, settings: &LtrSettings, stats: &Arc<LtrStats>) -> Result<Rescore> {
        let rescore = match self {
            RescoreBuilder::Query { query, query_weight, rescore_query_weight, window_size } => Rescore::Query {
                query: query.to_query(analyzer, settings, stats)?,
                query_weight: *query_weight,
                rescore_query_weight: *rescore_query_weight,
                window_size: *window_size,
            },
            RescoreBuilder::Scale { factor, window_size } => Rescore::Scale {
                factor: *factor,
                window_size: *window_size,
            },
        };
        Ok(rescore)
    }
}

/// A rescore stage parsed for one shard. Rescoring only touches the top
/// `window_size` hits of the shard.
#[derive(Debug, Clone)]
pub enum Rescore {
    // original * query_weight + rescored * rescore_query_weight
    Query {
        query: Query,
        query_weight: f32,
        rescore_query_weight: f32,
        window_size: usize,
    },
    Scale {
        factor: f32,
        window_size: usize,
    },
}

impl Rescore {
    pub fn kind(&self) -> &'static str {
        match self {
            Rescore::Query { .. } => "query",
            Rescore::Scale { .. } => "scale",
        }
    }

    pub fn window_size(&self) -> usize {
        match self {
            Rescore::Query { window_size, .. } | Rescore::Scale { window_size, .. } => *window_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    filter: Option<QueryBuilder>,
    // scored queries, a hit scores the sum of the ones it matches
    queries: Vec<(Option<String>, QueryBuilder)>,
    rescores: Vec<RescoreBuilder>,
    size: usize,
    search_type: SearchType,
    logging: Option<LoggingSearchExt>,
    explain: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            filter: None,
            queries: vec![],
            rescores: vec![],
            size: 10,
            search_type: SearchType::default(),
            logging: None,
            explain: false,
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: QueryBuilder) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn query(mut self, query: QueryBuilder) -> Self {
        self.queries.push((None, query));
        self
    }

    pub fn named_query(mut self, name: &str, query: QueryBuilder) -> Self {
        self.queries.push((Some(name.to_string()), query));
        self
    }

    pub fn rescore(mut self, rescore: RescoreBuilder) -> Self {
        self.rescores.push(rescore);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn logging(mut self, logging: LoggingSearchExt) -> Self {
        self.logging = Some(logging);
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub shard: usize,
    // absolute doc id inside the shard
    pub doc: DocId,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    #[serde(rename = "_ltrlog", skip_serializing_if = "BTreeMap::is_empty")]
    pub ltr_log: BTreeMap<String, Vec<LogEntry>>,
}

impl SearchHit {
    pub fn new(id: &str, shard: usize, doc: DocId, score: f32) -> Self {
        SearchHit {
            id: id.to_string(),
            shard,
            doc,
            score,
            explanation: None,
            ltr_log: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub total_hits: usize,
    pub hits: Vec<SearchHit>,
}

// The request as parsed for one shard. Ranking queries own their caches, so
// every shard gets its own.
struct ShardRequest {
    filter: Option<Query>,
    queries: Vec<Query>,
    rescores: Vec<Rescore>,
    logging: Option<LoggingFetchPhase>,
}

impl ShardRequest {
    fn extract_terms(&self, terms: &mut BTreeSet<TermId>) {
        self.filter.iter().chain(&self.queries).for_each(|q| q.extract_terms(terms));
        for rescore in &self.rescores {
            if let Rescore::Query { query, .. } = rescore {
                query.extract_terms(terms);
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Engine {
    analyzer: Analyzer,
    shards: Vec<Shard>,
    #[serde(skip)]
    settings: LtrSettings,
    #[serde(skip)]
    stats: Arc<LtrStats>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Engine {
    pub fn new(shard_count: usize) -> Self {
        Engine {
            analyzer: Analyzer::new(),
            shards: (0..shard_count.max(1)).map(|_| Shard::new()).collect(),
            settings: LtrSettings::default(),
            stats: Arc::new(LtrStats::new()),
        }
    }

    pub fn with_settings(mut self, settings: LtrSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &LtrSettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<LtrStats> {
        &self.stats
    }

    pub fn doc_count(&self) -> usize {
        self.shards.iter().map(|s| s.doc_count()).sum()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard(&self, shard: usize) -> Option<&Shard> {
        self.shards.get(shard)
    }

    // documents without a shard are spread round robin
    pub fn add_document(&mut self, doc: &Document) -> DocId {
        let shard = doc.get_shard().unwrap_or_else(|| self.doc_count()) % self.shards.len();
        let term_ids = self.analyzer.analyze(doc.get_content());
        self.shards[shard].add_document(doc.get_id(), &term_ids, self.settings.segment_size())
    }

    pub fn build_index_from(&mut self, path: &Path) -> Result<usize> {
        for doc in corpus::load(path, &DEFAULT_FIELDS)? {
            self.add_document(&doc);
            if self.doc_count() % 1000 == 0 {
                log::debug!("{} documents indexed", self.doc_count());
            }
        }
        log::info!(
            "indexed {} documents into {} shards, {} terms",
            self.doc_count(),
            self.shards.len(),
            self.analyzer.term_count()
        );
        Ok(self.doc_count())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let encoded: Vec<u8> = bincode::serialize(self)?;
        let mut writer = File::create(path)?;
        writer.write_all(&encoded)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut reader = File::open(path)?;
        let mut encoded: Vec<u8> = vec![];
        reader.read_to_end(&mut encoded)?;
        let engine: Engine = bincode::deserialize(&encoded[..])?;
        log::info!("index of {} documents in {} shards loaded", engine.doc_count(), engine.shards.len());
        Ok(engine)
    }

    /// Runs a request over every shard.
    ///
    /// The query phase scores and rescores each shard, the best `size` hits
    /// of all shards are then fetched. Fetching sees shard local statistics
    /// even for DFS requests.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut shard_requests = Vec::with_capacity(self.shards.len());
        for _ in &self.shards {
            shard_requests.push(self.parse_request(request)?);
        }
        let dfs = match request.search_type {
            SearchType::DfsQueryThenFetch => {
                let mut terms = BTreeSet::new();
                shard_requests.iter().for_each(|r| r.extract_terms(&mut terms));
                Some(AggregatedDfs::collect(&self.shards, &terms))
            },
            SearchType::QueryThenFetch => None,
        };
        let ctx = RequestContext::new(self.settings.clone());

        let mut candidates = vec![];
        for (index, (shard, shard_request)) in self.shards.iter().zip(&shard_requests).enumerate() {
            let searcher = IndexSearcher::new(shard).with_dfs(dfs.as_ref());
            let mut hits = self.query_phase(&searcher, &ctx, shard_request)?;
            for rescore in &shard_request.rescores {
                self.rescore(&searcher, &ctx, rescore, &mut hits)?;
            }
            log::debug!("shard {}: {} hits", index, hits.len());
            candidates.extend(
                hits.into_iter()
                    .map(|(doc, score)| SearchHit::new(shard.doc_key(doc).unwrap_or_default(), index, doc, score)),
            );
        }
        let total_hits = candidates.len();
        sort_hits(&mut candidates);
        candidates.truncate(request.size);

        let mut fetched = Vec::with_capacity(candidates.len());
        for (index, (shard, shard_request)) in self.shards.iter().zip(&shard_requests).enumerate() {
            let (mut hits, rest): (Vec<SearchHit>, Vec<SearchHit>) =
                candidates.into_iter().partition(|h| h.shard == index);
            candidates = rest;
            if hits.is_empty() {
                continue;
            }
            if request.explain {
                let searcher = IndexSearcher::new(shard).with_dfs(dfs.as_ref());
                for hit in hits.iter_mut() {
                    hit.explanation = Some(self.explain(&searcher, &ctx, shard_request, hit.doc)?);
                }
            }
            if let Some(logging) = &shard_request.logging {
                let searcher = IndexSearcher::new(shard);
                logging.process(&searcher, &RequestContext::new(self.settings.clone()), &mut hits)?;
            }
            fetched.extend(hits);
        }
        sort_hits(&mut fetched);
        Ok(SearchResponse { total_hits, hits: fetched })
    }

    fn parse_request(&self, request: &SearchRequest) -> Result<ShardRequest> {
        let parse = |builder: &QueryBuilder| builder.to_query(&self.analyzer, &self.settings, &self.stats);
        let filter = request.filter.as_ref().map(parse).transpose()?;
        let mut queries = Vec::with_capacity(request.queries.len());
        let mut named = HashMap::new();
        for (name, builder) in &request.queries {
            let query = parse(builder)?;
            if let Some(name) = name {
                named.insert(name.clone(), query.clone());
            }
            queries.push(query);
        }
        let rescores = request.rescores
            .iter()
            .map(|r| r.to_rescore(&self.analyzer, &self.settings, &self.stats))
            .collect::<Result<Vec<_>>>()?;
        let logging = match &request.logging {
            Some(ext) if !ext.is_empty() => Some(LoggingFetchPhase::new(ext, &named, &rescores)?),
            _ => None,
        };
        Ok(ShardRequest { filter, queries, rescores, logging })
    }

    // segments of the shard are searched concurrently, sharing the caches
    // of the request's ranking queries
    fn query_phase(
        &self,
        searcher: &IndexSearcher<'_>,
        ctx: &RequestContext,
        request: &ShardRequest,
    ) -> Result<Vec<(DocId, f32)>> {
        let filter = match &request.filter {
            Some(query) => Some(query.create_weight(searcher, ctx, ScoreMode::CompleteNoScores)?),
            None => None,
        };
        let weights = request.queries
            .iter()
            .map(|q| q.create_weight(searcher, ctx, ScoreMode::Complete))
            .collect::<Result<Vec<_>>>()?;
        let readers = searcher.readers();
        let per_segment: Vec<Result<Vec<(DocId, f32)>>> = thread::scope(|s| {
            let handles: Vec<_> = readers
                .iter()
                .map(|reader| {
                    let (reader, filter, weights) = (*reader, filter.as_ref(), &weights);
                    s.spawn(move || search_segment(reader, filter, weights))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });
        let mut hits = vec![];
        for segment in per_segment {
            hits.extend(segment?);
        }
        Ok(hits)
    }

    fn rescore(
        &self,
        searcher: &IndexSearcher<'_>,
        ctx: &RequestContext,
        rescore: &Rescore,
        hits: &mut Vec<(DocId, f32)>,
    ) -> Result<()> {
        sort_scored(hits);
        let window = rescore.window_size().min(hits.len());
        match rescore {
            Rescore::Scale { factor, .. } => {
                for hit in hits[..window].iter_mut() {
                    hit.1 *= factor;
                }
            },
            Rescore::Query { query, query_weight, rescore_query_weight, .. } => {
                let weight = query.create_weight(searcher, ctx, ScoreMode::Complete)?;
                let docs: Vec<DocId> = hits[..window].iter().map(|h| h.0).collect();
                let mut rescored = vec![None; window];
                searcher.visit_docs(weight.as_ref(), &docs, |i, scorer| {
                    rescored[i] = Some(scorer.score(&ScoringContext::none()));
                })?;
                for (hit, score) in hits[..window].iter_mut().zip(rescored) {
                    hit.1 = hit.1 * query_weight + score.map_or(0.0, |s| s * rescore_query_weight);
                }
            },
        }
        sort_scored(hits);
        Ok(())
    }

    // covers the scored queries, rescoring is not part of it
    fn explain(&self, searcher: &IndexSearcher<'_>, ctx: &RequestContext, request: &ShardRequest, doc: DocId) -> Result<Explanation> {
        let (reader, local) = match searcher.shard().locate(doc) {
            Some(found) => found,
            None => return Ok(Explanation::no_match("unknown document")),
        };
        let mut details = vec![];
        for query in &request.queries {
            let weight = query.create_weight(searcher, ctx, ScoreMode::Complete)?;
            let explanation = weight.explain(reader, local, &ScoringContext::none())?;
            if explanation.is_match() {
                details.push(explanation);
            }
        }
        let value = details.iter().map(|d| d.value()).sum();
        Ok(Explanation::matched(value, "sum of:", details))
    }

    /// Feature values of the documents with the given keys, logged without
    /// any model. Hits come back grouped by shard.
    pub fn log_features(
        &self,
        features: &Arc<FeatureSet>,
        params: &Params,
        keys: &[&str],
        missing_as_zero: bool,
    ) -> Result<Vec<SearchHit>> {
        let ctx = RequestContext::new(self.settings.clone());
        let query_ctx = LtrQueryContext::new(&self.analyzer);
        let mut hits = vec![];
        for (index, shard) in self.shards.iter().enumerate() {
            let mut shard_hits: Vec<SearchHit> = keys
                .iter()
                .filter_map(|key| shard.doc_by_key(key).map(|doc| SearchHit::new(key, index, doc, 0.0)))
                .collect();
            if shard_hits.is_empty() {
                continue;
            }
            let consumer = Arc::new(Mutex::new(HitLogConsumer::new(features.name(), features.clone(), missing_as_zero)));
            let shared: SharedLogConsumer = consumer.clone();
            let query = RankerQuery::build_log_query(shared, features.clone(), &query_ctx, params, self.stats.clone())?;
            let searcher = IndexSearcher::new(shard);
            let weight = query.create_weight(&searcher, &ctx, ScoreMode::Complete)?;
            let docs: Vec<DocId> = shard_hits.iter().map(|h| h.doc).collect();
            log_docs(&searcher, weight.as_ref(), consumer.as_ref(), &docs)?;
            for (hit, log) in consumer.lock().take_logs() {
                shard_hits[hit].ltr_log.insert(features.name().to_string(), log);
            }
            hits.extend(shard_hits);
        }
        Ok(hits)
    }
}

fn search_segment(
    reader: SegmentReader<'_>,
    filter: Option<&Arc<dyn Weight>>,
    weights: &[Arc<dyn Weight>],
) -> Result<Vec<(DocId, f32)>> {
    let allowed = match filter {
        Some(weight) => Some(matching_docs(weight.as_ref(), reader)?),
        None => None,
    };
    let mut scores: BTreeMap<DocId, f32> = BTreeMap::new();
    for weight in weights {
        if let Some(mut scorer) = weight.scorer(reader)? {
            while scorer.next_doc() != NO_MORE_DOCS {
                let doc = scorer.doc_id();
                if allowed.as_ref().map_or(true, |a| a.contains(&doc)) {
                    *scores.entry(doc).or_insert(0.0) += scorer.score(&ScoringContext::none());
                }
            }
        }
    }
    Ok(scores.into_iter().map(|(doc, score)| (reader.doc_base() + doc, score)).collect())
}

fn matching_docs(weight: &dyn Weight, reader: SegmentReader<'_>) -> Result<BTreeSet<DocId>> {
    let mut docs = BTreeSet::new();
    if let Some(mut scorer) = weight.scorer(reader)? {
        while scorer.next_doc() != NO_MORE_DOCS {
            docs.insert(scorer.doc_id());
        }
    }
    Ok(docs)
}

// best first, ties by doc id
fn sort_scored(hits: &mut [(DocId, f32)]) {
    hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.shard.cmp(&b.shard))
            .then(a.doc.cmp(&b.doc))
    });
}
