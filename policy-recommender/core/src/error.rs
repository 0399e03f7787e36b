use crate::Kind;

/// Failures surfaced by a recommendation lookup.
///
/// Nothing in the engine retries; every error aborts the lookup that produced
/// it and is reported to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no policies for {0} found")]
    NotRegistered(String),

    #[error("not a supported query kind: {0}")]
    UnsupportedKind(String),

    #[error("invalid match parameters: {0}")]
    InvalidMatch(&'static str),

    #[error("duplicate policy {0}")]
    DuplicatePolicy(String),

    #[error("failed to resolve {kind} objects")]
    Resolve {
        kind: Kind,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to build query input")]
    Input(#[source] serde_json::Error),

    #[error("failed to evaluate query")]
    Eval(#[source] anyhow::Error),

    #[error("failed to decode query result: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("query result set has no expressions")]
    EmptyResultSet,
}
