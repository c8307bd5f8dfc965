//! Error type for `prov-store-fs`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] prov_core::Error),

  #[error("failed to {action} {}: {source}", path.display())]
  Io {
    action: &'static str,
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The config file exists but is not valid JSON.
  #[error("config {path} is not valid JSON: {reason}")]
  MalformedConfig { path: String, reason: String },
}

impl Error {
  pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { action, path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
