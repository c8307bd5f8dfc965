//! Where everything lives on disk, relative to the repository root.

use std::path::{Path, PathBuf};

use prov_core::{config::Paths, record::RecordKind};

/// The config is always read from here, whatever its `paths` say.
pub const CONFIG_PATH: &str = "provenance/provenance.config.json";

pub const CODES_FILE: &str = "codes.json";
pub const SEQUENCES_FILE: &str = "sequences.json";
pub const README_FILE: &str = "README.md";
/// Placeholder record in each kind's directory; never enumerated.
pub const TEMPLATE_FILE: &str = "TEMPLATE.json";

pub const CODES_SCHEMA: &str = "provenancecode.codes@1.0";
pub const SEQUENCES_SCHEMA: &str = "provenancecode.sequences@1.0";
pub const REGISTRY_VERSION: &str = "1.0";

pub const README: &str = "\
# Provenance

This directory holds the project's decision and risk ledger.

- `decisions/` one JSON file per decision, named `DEC-{PROJECT}-{AREA}-{SEQ6}.json`
- `risks/` one JSON file per risk, named `RA-{PROJECT}-{AREA}-{SEQ6}.json`
- `schemas/` the JSON schemas records are validated against
- `codes.json` registered project and area codes
- `sequences.json` highest sequence handed out per scope

Copy `TEMPLATE.json` to start a record by hand, or use `prvc add`.
Run `prvc validate` before committing.
";

/// Resolves ledger-relative paths against a repository root.
#[derive(Debug, Clone)]
pub struct Layout {
  root:  PathBuf,
  paths: Paths,
}

impl Layout {
  pub fn new(root: PathBuf, paths: Paths) -> Self { Self { root, paths } }

  pub fn root(&self) -> &Path { &self.root }

  pub fn kind_dir(&self, kind: RecordKind) -> &str {
    match kind {
      RecordKind::Decision => &self.paths.decisions,
      RecordKind::Risk => &self.paths.risks,
    }
  }

  /// Repository-relative path of a record file.
  pub fn record(&self, kind: RecordKind, name: &str) -> String {
    join(self.kind_dir(kind), name)
  }

  pub fn in_root(&self, name: &str) -> String { join(&self.paths.root, name) }

  pub fn in_schemas(&self, name: &str) -> String { join(&self.paths.schemas, name) }

  /// Every directory the scaffold creates.
  pub fn directories(&self) -> [&str; 4] {
    [&self.paths.root, &self.paths.decisions, &self.paths.risks, &self.paths.schemas]
  }

  /// Absolute path of a repository-relative one.
  pub fn absolute(&self, relative: &str) -> PathBuf { self.root.join(relative) }
}

fn join(dir: &str, name: &str) -> String {
  format!("{}/{name}", dir.trim_end_matches('/'))
}
