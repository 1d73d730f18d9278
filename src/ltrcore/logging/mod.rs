//! Feature value logging of search hits.
//!
//! A request may ask for the feature values of its ranking queries to be
//! returned with every hit, under the `_ltrlog` field. Each [`LogSpec`]
//! names the ranking query to log, either a named query of the request or
//! one of its rescore stages.

pub mod consumer;
pub mod fetch;

use serde::{Serialize, Deserialize};
use crate::ltrcore::{LtrError, Result};
pub use consumer::{HitLogConsumer, LogEntry, LogValue};
pub use fetch::LoggingFetchPhase;

pub const LOG_FIELD: &str = "_ltrlog";
pub const EXTRA_LOGGING_NAME: &str = "extra_logging";

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct LogSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    named_query: Option<String>,
    #[serde(default)]
    rescore_index: Option<usize>,
    // report 0.0 for features that did not match instead of omitting them
    #[serde(default)]
    missing_as_zero: bool,
}

impl LogSpec {
    pub fn named_query(query: &str) -> Self {
        LogSpec {
            named_query: Some(query.to_string()),
            ..Default::default()
        }
    }

    pub fn rescore(index: usize) -> Self {
        LogSpec {
            rescore_index: Some(index),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_missing_as_zero(mut self, missing_as_zero: bool) -> Self {
        self.missing_as_zero = missing_as_zero;
        self
    }

    pub fn get_named_query(&self) -> Option<&str> {
        self.named_query.as_deref()
    }

    pub fn get_rescore_index(&self) -> Option<usize> {
        self.rescore_index
    }

    pub fn is_missing_as_zero(&self) -> bool {
        self.missing_as_zero
    }

    // explicit name, else the named query, else rescore[i]
    pub fn logger_name(&self) -> String {
        match (&self.name, &self.named_query, self.rescore_index) {
            (Some(name), _, _) => name.clone(),
            (None, Some(query), _) => query.clone(),
            (None, None, Some(index)) => format!("rescore[{}]", index),
            (None, None, None) => String::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.named_query.is_some() == self.rescore_index.is_some() {
            return Err(LtrError::InvalidDefinition {
                name: self.logger_name(),
                reason: "a log spec needs exactly one of [named_query] or [rescore_index]".to_string(),
            });
        }
        Ok(())
    }
}

/// The logging section of a search request.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct LoggingSearchExt {
    log_specs: Vec<LogSpec>,
}

impl LoggingSearchExt {
    pub fn new(log_specs: Vec<LogSpec>) -> Result<Self> {
        for spec in &log_specs {
            spec.validate()?;
        }
        Ok(LoggingSearchExt { log_specs })
    }

    pub fn log_specs(&self) -> &[LogSpec] {
        &self.log_specs
    }

    pub fn is_empty(&self) -> bool {
        self.log_specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_names() {
        assert_eq!(LogSpec::named_query("sltr_main").logger_name(), "sltr_main");
        assert_eq!(LogSpec::rescore(1).logger_name(), "rescore[1]");
        assert_eq!(LogSpec::rescore(0).with_name("first").logger_name(), "first");
    }

    #[test]
    fn test_spec_needs_one_target() {
        assert!(LoggingSearchExt::new(vec![LogSpec::default()]).is_err());
        let both = LogSpec { rescore_index: Some(0), ..LogSpec::named_query("q") };
        assert!(LoggingSearchExt::new(vec![both]).is_err());
        let ext = LoggingSearchExt::new(vec![LogSpec::named_query("q"), LogSpec::rescore(0)]).unwrap();
        assert_eq!(ext.log_specs().len(), 2);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"log_specs": [{"name": "log1", "named_query": "sltr", "missing_as_zero": true}]}"#;
        let ext: LoggingSearchExt = serde_json::from_str(json).unwrap();
        let spec = &ext.log_specs()[0];
        assert_eq!(spec.get_named_query(), Some("sltr"));
        assert!(spec.is_missing_as_zero());
        assert_eq!(spec.logger_name(), "log1");
    }
}
