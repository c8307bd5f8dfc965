//! Error types for `prov-core`.
//!
//! Data problems in records (bad JSON, bad ids, schema violations) are never
//! errors here; they are reported as findings or skips. These variants cover
//! the conditions that abort an operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field} code {value:?}: expected 2-4 uppercase letters or digits")]
  InvalidCode { field: &'static str, value: String },

  #[error("invalid validation mode {0:?}: expected \"warn\" or \"fail\"")]
  InvalidMode(String),

  #[error("record not found: {0}")]
  RecordNotFound(String),

  #[error("record {0} already exists")]
  AlreadyExists(String),

  #[error("no sequence numbers left in scope {0}")]
  SequenceExhausted(String),

  #[error("the ledger is not initialised (no config found)")]
  NotInitialised,

  #[error("failed to compile bundled {name} schema: {message}")]
  SchemaCompile { name: &'static str, message: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
