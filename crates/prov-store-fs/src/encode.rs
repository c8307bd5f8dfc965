//! On-disk encodings: pretty JSON documents and the two registry files.
//!
//! Every file is written as two-space-indented JSON with a trailing newline.
//! Reads are lenient where the core expects them to be: a record that is not
//! JSON becomes [`Document::Malformed`] and an unreadable sequence registry
//! reads as empty.

use std::collections::BTreeMap;

use prov_core::store::{Document, SequenceMarks};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Result,
  layout::{CODES_SCHEMA, REGISTRY_VERSION, SEQUENCES_SCHEMA},
};

// ─── Documents ───────────────────────────────────────────────────────────────

pub fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  let mut out = serde_json::to_string_pretty(value)?;
  out.push('\n');
  Ok(out)
}

pub fn decode_document(text: &str) -> Document {
  match serde_json::from_str(text) {
    Ok(value) => Document::Parsed(value),
    Err(err) => Document::Malformed(err.to_string()),
  }
}

// ─── Sequence registry ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct SequenceRegistry {
  schema:    String,
  version:   String,
  #[serde(default)]
  sequences: SequenceMarks,
}

pub fn encode_sequences(marks: &SequenceMarks) -> Result<String> {
  encode_pretty(&SequenceRegistry {
    schema:    SEQUENCES_SCHEMA.to_owned(),
    version:   REGISTRY_VERSION.to_owned(),
    sequences: marks.clone(),
  })
}

pub fn decode_sequences(text: &str) -> SequenceMarks {
  serde_json::from_str::<SequenceRegistry>(text)
    .map(|r| r.sequences)
    .unwrap_or_default()
}

// ─── Code registry ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRegistry {
  pub schema:   String,
  pub version:  String,
  #[serde(default)]
  pub monorepo: bool,
  #[serde(default)]
  pub projects: BTreeMap<String, ProjectEntry>,
  #[serde(flatten)]
  pub extra:    Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
  #[serde(default)]
  pub name:        String,
  #[serde(default)]
  pub subprojects: BTreeMap<String, AreaEntry>,
  #[serde(flatten)]
  pub extra:       Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEntry {
  pub name:      String,
  pub workspace: String,
}

impl Default for CodeRegistry {
  fn default() -> Self {
    Self {
      schema:   CODES_SCHEMA.to_owned(),
      version:  REGISTRY_VERSION.to_owned(),
      monorepo: false,
      projects: BTreeMap::new(),
      extra:    Map::new(),
    }
  }
}

impl CodeRegistry {
  /// Add the `project`/`area` pair. Returns `true` if anything was added.
  pub fn register(&mut self, project: &str, area: &str) -> bool {
    let entry = self.projects.entry(project.to_owned()).or_insert_with(|| ProjectEntry {
      name:        project.to_owned(),
      subprojects: BTreeMap::new(),
      extra:       Map::new(),
    });
    if entry.subprojects.contains_key(area) {
      return false;
    }
    entry.subprojects.insert(area.to_owned(), AreaEntry {
      name:      area.to_owned(),
      workspace: ".".to_owned(),
    });
    true
  }
}

pub fn encode_codes(registry: &CodeRegistry) -> Result<String> { encode_pretty(registry) }

pub fn decode_codes(text: &str) -> Result<CodeRegistry> { Ok(serde_json::from_str(text)?) }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pretty_output_ends_with_newline() {
    let out = encode_pretty(&serde_json::json!({ "a": 1 })).unwrap();
    assert_eq!(out, "{\n  \"a\": 1\n}\n");
  }

  #[test]
  fn garbage_sequence_registry_reads_empty() {
    assert_eq!(decode_sequences("not json"), SequenceMarks::default());
  }

  #[test]
  fn registering_twice_is_a_noop() {
    let mut registry = CodeRegistry::default();
    assert!(registry.register("ACME", "WEB"));
    assert!(!registry.register("ACME", "WEB"));
    assert!(registry.register("ACME", "API"));
    assert_eq!(registry.projects["ACME"].subprojects.len(), 2);
  }
}
