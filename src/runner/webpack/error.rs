use thiserror::Error;

use crate::runner::ds::error::JErrorType;
use crate::runner::webpack::registry::ModuleId;

#[derive(Debug, Error)]
pub enum WebpackError {
    #[error("webpack registry is not available yet")]
    RegistryUnavailable,

    #[error("webpack registry was already initialised")]
    AlreadyInitialized,

    #[error("webpack.{method} found no module (filter: {filter})")]
    LookupExhausted { method: String, filter: String },

    #[error("got {total} filters, but only found {found} modules")]
    BulkIncomplete { found: usize, total: usize },

    #[error("invalid bulk lookup: {0}")]
    InvalidBulk(String),

    #[error("no module or factory with id {0}")]
    ModuleNotFound(ModuleId),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("could not read '{path}': {error}")]
    Io {
        path: String,
        error: std::io::Error,
    },

    #[error(transparent)]
    Js(#[from] JErrorType),
}

impl WebpackError {
    /// Whether this is a "nothing matched" failure rather than misuse.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WebpackError::LookupExhausted { .. } | WebpackError::BulkIncomplete { .. }
        )
    }
}

/// Lazy factories speak `JErrorType`; webpack failures inside them become generic errors.
impl From<WebpackError> for JErrorType {
    fn from(e: WebpackError) -> Self {
        match e {
            WebpackError::Js(e) => e,
            other => JErrorType::Error(other.to_string()),
        }
    }
}
