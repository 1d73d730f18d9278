pub mod ltrcore;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use ltrcore::engine::{Engine, SearchRequest, SearchType};
use ltrcore::feature::{ModelFile, QueryBuilder, SltrQueryBuilder};
use ltrcore::logging::{LogSpec, LoggingSearchExt};
use ltrcore::settings::LtrSettings;
use ltrcore::{Params, Result, CFG_NAME};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[derive(Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// Learning to rank over a sharded index, with feature logging
struct Cli {
    #[clap(short, long, value_parser, default_value_t = String::from(".rir/rirltr.idx"))]
    /// Index file
    index_dir: String,
    #[clap(short, long, value_parser)]
    /// Settings file, .rirltr.yaml is used when present
    config: Option<String>,
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
#[derive(Debug)]
enum Commands {
    /// Build index
    Build {
        #[clap(short, long, value_parser)]
        /// Corpus file, one json document per line
        corpus: String,
        #[clap(short, long, value_parser, default_value_t = 1)]
        /// Number of shards
        shards: usize,
    },
    /// Rank documents with a model
    Search {
        #[clap(short, long, value_parser)]
        /// Model file
        model: String,
        #[clap(short = 'p', long = "param", value_parser = parse_param, multiple_occurrences(true))]
        /// Model parameter, as key=value
        params: Vec<(String, String)>,
        #[clap(short, long, value_parser)]
        /// Only documents matching this text are ranked
        filter: Option<String>,
        #[clap(long, value_parser, default_value_t = 10)]
        /// Number of hits
        size: usize,
        #[clap(long)]
        /// Merge term statistics across shards before ranking
        dfs: bool,
        #[clap(long, value_parser)]
        /// Log feature values of every hit under this name
        log: Option<String>,
        #[clap(long)]
        /// Log 0 for features that did not match
        missing_as_zero: bool,
        #[clap(long)]
        /// Do not cache feature scores while ranking
        no_feature_cache: bool,
        #[clap(long)]
        /// Explain hit scores
        explain: bool,
    },
    /// Log the feature values of documents
    Features {
        #[clap(short, long, value_parser)]
        /// Model file
        model: String,
        #[clap(short = 'p', long = "param", value_parser = parse_param, multiple_occurrences(true))]
        /// Model parameter, as key=value
        params: Vec<(String, String)>,
        #[clap(long)]
        /// Log 0 for features that did not match
        missing_as_zero: bool,
        #[clap(value_parser)]
        /// Document ids
        docs: Vec<String>,
    },
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid key=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match &cli.command {
        Some(Commands::Build { corpus, shards }) =>
            command_build_index(corpus, *shards, &cli.index_dir, settings),
        Some(Commands::Search {
            model, params, filter, size, dfs, log, missing_as_zero, no_feature_cache, explain,
        }) => {
            let mut builder = SltrQueryBuilder::new(Arc::new(ModelFile::load(Path::new(model))?.compile()?))
                .params(params.iter().cloned().collect());
            if *no_feature_cache {
                builder = builder.feature_score_cache(false);
            }
            let mut request = SearchRequest::new()
                .named_query("sltr", QueryBuilder::Sltr(builder))
                .size(*size)
                .explain(*explain);
            if let Some(text) = filter {
                request = request.filter(QueryBuilder::match_text(text));
            }
            if *dfs {
                request = request.search_type(SearchType::DfsQueryThenFetch);
            }
            if let Some(name) = log {
                let spec = LogSpec::named_query("sltr").with_name(name).with_missing_as_zero(*missing_as_zero);
                request = request.logging(LoggingSearchExt::new(vec![spec])?);
            }
            command_search(&cli.index_dir, settings, &request)
        },
        Some(Commands::Features { model, params, missing_as_zero, docs }) => {
            let params: Params = params.iter().cloned().collect();
            command_features(&cli.index_dir, settings, model, &params, docs, *missing_as_zero)
        },
        None => command_load_index(&cli.index_dir),
    });
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(config: Option<&str>) -> Result<LtrSettings> {
    match config {
        Some(path) => LtrSettings::from_path(Path::new(path)),
        None => match fs::read_to_string(CFG_NAME) {
            Ok(content) => Ok(LtrSettings::from_str(&content)),
            Err(_) => Ok(LtrSettings::default()),
        },
    }
}

fn command_build_index(corpus: &str, shards: usize, index_dir: &str, settings: LtrSettings) -> Result<()> {
    let mut engine = Engine::new(shards).with_settings(settings);
    let count = engine.build_index_from(Path::new(corpus))?;
    engine.save_to(Path::new(index_dir))?;
    println!("{} documents indexed", count);
    Ok(())
}

fn command_search(index_dir: &str, settings: LtrSettings, request: &SearchRequest) -> Result<()> {
    let engine = Engine::load_from(Path::new(index_dir))?.with_settings(settings);
    let response = engine.search(request)?;
    println!("{} results", response.total_hits);
    for (i, hit) in response.hits.iter().enumerate() {
        println!("{}:{}", i + 1, serde_json::to_string_pretty(hit)?);
    }
    for (name, value) in engine.stats().snapshot() {
        log::info!("{}: {}", name, value);
    }
    Ok(())
}

fn command_features(
    index_dir: &str,
    settings: LtrSettings,
    model: &str,
    params: &Params,
    docs: &[String],
    missing_as_zero: bool,
) -> Result<()> {
    let engine = Engine::load_from(Path::new(index_dir))?.with_settings(settings);
    let model = ModelFile::load(Path::new(model))?.compile()?;
    let keys: Vec<&str> = docs.iter().map(|d| d.as_str()).collect();
    for hit in engine.log_features(model.feature_set(), params, &keys, missing_as_zero)? {
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}

fn command_load_index(index_dir: &str) -> Result<()> {
    let engine = Engine::load_from(Path::new(index_dir))?;
    println!("index of {} documents in {} shards loaded", engine.doc_count(), engine.shard_count());
    Ok(())
}
