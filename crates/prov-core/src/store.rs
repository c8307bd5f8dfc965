//! The `RecordStore` trait and the raw document types it trades in.
//!
//! The trait is implemented by storage backends (e.g. `prov-store-fs`).
//! Migration, validation and allocation depend on this abstraction, not on
//! any concrete backend. All methods are synchronous: a ledger is used by one
//! process at a time and every operation is a short sequence of reads and
//! writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::ProvenanceConfig, record::RecordKind};

// ─── Documents ───────────────────────────────────────────────────────────────

/// The contents of one record file as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
  /// Well-formed JSON. It may still fail to match the record model.
  Parsed(Value),
  /// The file could not be read as JSON; carries the parser's message.
  Malformed(String),
}

/// One enumerated record file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
  /// File name within the kind's directory, e.g. `DEC-ACME-WEB-000001.json`.
  pub name: String,
  /// Path relative to the repository root, for reporting.
  pub path: String,
  pub body: Document,
}

impl StoredDocument {
  /// The value of the kind's id field, if the document is parsed and has one.
  pub fn id(&self, kind: RecordKind) -> Option<&str> {
    match &self.body {
      Document::Parsed(v) => v.get(kind.id_field()).and_then(Value::as_str),
      Document::Malformed(_) => None,
    }
  }
}

// ─── Sequence registry ───────────────────────────────────────────────────────

/// Highest sequence ever observed or allocated, per scope prefix
/// (e.g. `"DEC-ACME-WEB"`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceMarks(pub BTreeMap<String, u32>);

impl SequenceMarks {
  pub fn get(&self, scope: &str) -> u32 { self.0.get(scope).copied().unwrap_or(0) }

  /// Raise the mark for `scope` to `sequence`. Returns `true` if it moved.
  pub fn raise(&mut self, scope: &str, sequence: u32) -> bool {
    let mark = self.0.entry(scope.to_owned()).or_insert(0);
    if sequence > *mark {
      *mark = sequence;
      true
    } else {
      false
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over where a ledger's files live.
///
/// Reads that hit missing directories return empty results rather than
/// errors. Only genuine I/O failures are reported through `Self::Error`.
pub trait RecordStore {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Enumerate every record file of `kind`, sorted by name. `TEMPLATE.json`
  /// and non-JSON files are excluded.
  fn list(&self, kind: RecordKind) -> Result<Vec<StoredDocument>, Self::Error>;

  /// Write `document` as `name` in the kind's directory, replacing any
  /// existing file. Returns the path relative to the repository root.
  fn put(&self, kind: RecordKind, name: &str, document: &Value) -> Result<String, Self::Error>;

  /// Remove `name` from the kind's directory. Removing a missing file is not
  /// an error.
  fn remove(&self, kind: RecordKind, name: &str) -> Result<(), Self::Error>;

  // ── Config ────────────────────────────────────────────────────────────

  /// Read the raw config document. `None` if absent.
  fn read_config(&self) -> Result<Option<Document>, Self::Error>;

  /// Persist the config. Returns the path relative to the repository root.
  fn write_config(&self, config: &ProvenanceConfig) -> Result<String, Self::Error>;

  // ── Scaffold & registries ─────────────────────────────────────────────

  /// Create any missing directories, templates, registries and bundled
  /// schema files. Returns the relative paths of files created. Existing
  /// files are never overwritten.
  fn ensure_scaffold(&self) -> Result<Vec<String>, Self::Error>;

  /// Read the sequence registry; empty if absent or unreadable.
  fn read_sequences(&self) -> Result<SequenceMarks, Self::Error>;

  fn write_sequences(&self, marks: &SequenceMarks) -> Result<(), Self::Error>;
}
