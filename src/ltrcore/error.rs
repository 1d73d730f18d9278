//! Error types for ranking-model evaluation and feature logging

use thiserror::Error;

/// Errors raised while building or executing ranking queries.
///
/// Configuration errors (plugin disabled, feature count mismatch) fail fast
/// at construction. Request errors reject the request that referenced a
/// missing or mistyped stage. None of them are retried.
#[derive(Debug, Error)]
pub enum LtrError {
    /// The plugin level switch is off
    #[error("LTR plugin is disabled. To enable, update ltr.plugin.enabled to true")]
    PluginDisabled,

    /// Model and feature set disagree on the number of features
    #[error("Feature count mismatch: model [{model}] expects {expected} features, got {got}")]
    FeatureCountMismatch {
        /// Model name
        model: String,
        /// Features the model was trained with
        expected: usize,
        /// Features provided by the feature set
        got: usize,
    },

    /// A model or feature set definition is not usable
    #[error("Invalid definition [{name}]: {reason}")]
    InvalidDefinition {
        /// Model, feature set or feature name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A stored feature needs a query parameter that was not provided
    #[error("Missing required parameter(s) [{params}] for feature [{feature}]")]
    MissingParameter {
        /// Feature name
        feature: String,
        /// Comma separated missing parameter names
        params: String,
    },

    /// A derived feature references a feature that does not exist before it
    #[error("Feature [{feature}] references unknown feature [{reference}]")]
    UnknownFeature {
        /// Referencing feature
        feature: String,
        /// Missing referenced feature
        reference: String,
    },

    /// A derived feature was evaluated without a ranking context
    #[error("Derived feature must be evaluated inside a ranking query")]
    DerivedOutsideRanking,

    /// Logging references a named query that is not part of the request
    #[error("No query named [{0}] found")]
    UnknownNamedQuery(String),

    /// Logging references a named query that is not a ranking query
    #[error("Query named [{name}] must be a [sltr] query [{found}] found")]
    NotRankingQuery {
        /// Query name
        name: String,
        /// Kind of query that was found instead
        found: String,
    },

    /// Logging references a rescore stage that does not exist
    #[error("rescore index [{index}] is out of bounds, only [{available}] rescore context(s) are available")]
    RescoreIndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of rescore stages
        available: usize,
    },

    /// Logging references a rescore stage that is not a query rescorer
    #[error("Expected a [query] rescorer but found a [{found}] at index [{index}]")]
    WrongRescoreKind {
        /// Rescore index
        index: usize,
        /// Kind of rescorer that was found instead
        found: String,
    },

    /// Logging references a query rescorer that does not wrap a ranking query
    #[error("Expected a [sltr] query but found a [{found}] at index [{index}]")]
    RescoreNotRankingQuery {
        /// Rescore index
        index: usize,
        /// Kind of query that was found instead
        found: String,
    },

    /// Shard index outside the engine
    #[error("Unknown shard [{0}]")]
    UnknownShard(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for ranking operations
pub type Result<T> = std::result::Result<T, LtrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            LtrError::UnknownNamedQuery("test".to_string()).to_string(),
            "No query named [test] found"
        );
        let e = LtrError::RescoreIndexOutOfBounds { index: 2, available: 1 };
        assert_eq!(
            e.to_string(),
            "rescore index [2] is out of bounds, only [1] rescore context(s) are available"
        );
        let e = LtrError::FeatureCountMismatch { model: "m".to_string(), expected: 3, got: 2 };
        assert!(e.to_string().contains("expects 3 features, got 2"));
    }
}
