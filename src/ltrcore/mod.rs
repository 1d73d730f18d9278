pub mod analyzer;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod feature;
pub mod index;
pub mod logging;
pub mod query;
pub mod ranker;
pub mod scoring;
pub mod settings;
pub mod stats;

use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;
pub type TermOffset = u32;

/// Query-time parameters handed to features, e.g. `keywords -> "rambo"`.
pub type Params = HashMap<String, String>;

// doc ids inside a segment start from 1, DOC_BEGIN means "not positioned yet"
pub const DOC_BEGIN: DocId = DocId::MIN;
pub const NO_MORE_DOCS: DocId = DocId::MAX;

pub const CFG_NAME: &str = ".rirltr.yaml";

pub use error::{LtrError, Result};
