//! In-place upgrade of a ledger from the legacy id scheme to the current one.
//!
//! Migration is idempotent: running it on an already-migrated ledger writes
//! nothing and reports zero counts. It is also best-effort. A file that
//! cannot be migrated is recorded in [`MigrationReport::skipped`] and the
//! run carries on, leaving the Validator to report what is wrong with it.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  config::ProvenanceConfig,
  id::normalize_id,
  record::{RecordKind, TagStatus},
  store::{Document, RecordStore},
};

/// Old decision id → new decision id, built while migrating decisions.
pub type TranslationTable = BTreeMap<String, String>;

// ─── Report ──────────────────────────────────────────────────────────────────

/// Why a file was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
  /// Not valid JSON.
  Malformed(String),
  /// Valid JSON that cannot be read as a record.
  NotARecord(String),
  /// The renamed file would overwrite another record.
  TargetExists(String),
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Malformed(msg) => write!(f, "malformed JSON: {msg}"),
      Self::NotARecord(msg) => write!(f, "not a record: {msg}"),
      Self::TargetExists(name) => write!(f, "target file {name} already exists"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
  pub path:   String,
  pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
  /// Decisions actually rewritten.
  pub decision_count: usize,
  /// Risks actually rewritten.
  pub risk_count:     usize,
  pub created_files:  Vec<String>,
  pub updated_files:  Vec<String>,
  pub skipped:        Vec<Skipped>,
}

impl MigrationReport {
  /// `true` if the run changed nothing on disk.
  pub fn is_noop(&self) -> bool {
    self.decision_count == 0
      && self.risk_count == 0
      && self.created_files.is_empty()
      && self.updated_files.is_empty()
  }

  fn skip(&mut self, path: &str, reason: SkipReason) {
    warn!(path, %reason, "migration skipped file");
    self.skipped.push(Skipped { path: path.to_owned(), reason });
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Upgrade every record in `store` to the current scheme.
///
/// `fallback_project` and `fallback_area` fill in the scope of sequence-only
/// legacy ids when the existing config does not provide valid codes.
pub fn migrate<S: RecordStore>(
  store: &S,
  fallback_project: &str,
  fallback_area: &str,
) -> Result<MigrationReport> {
  let mut report = MigrationReport {
    created_files: store.ensure_scaffold().map_err(Error::store)?,
    ..MigrationReport::default()
  };

  let config = migrate_config(store, fallback_project, fallback_area, &mut report)?;
  let (project, area) = (config.default_project.as_str(), config.default_area.as_str());

  let decisions = plan(store, RecordKind::Decision, project, area, &mut report)?;
  let table = translation(&decisions);
  let decision_count = rewrite(store, RecordKind::Decision, decisions, &table, &mut report)?;
  report.decision_count = decision_count;

  let risks = plan(store, RecordKind::Risk, project, area, &mut report)?;
  let risk_count = rewrite(store, RecordKind::Risk, risks, &table, &mut report)?;
  report.risk_count = risk_count;

  info!(
    decisions = report.decision_count,
    risks = report.risk_count,
    created = report.created_files.len(),
    updated = report.updated_files.len(),
    skipped = report.skipped.len(),
    "migration finished"
  );
  Ok(report)
}

fn migrate_config<S: RecordStore>(
  store: &S,
  fallback_project: &str,
  fallback_area: &str,
  report: &mut MigrationReport,
) -> Result<ProvenanceConfig> {
  let existing = store.read_config().map_err(Error::store)?;
  let previous = match &existing {
    Some(Document::Parsed(value)) => Some(value),
    Some(Document::Malformed(reason)) => {
      warn!(%reason, "config is not valid JSON; replacing it with defaults");
      None
    }
    None => None,
  };

  let config = ProvenanceConfig::normalized(previous, fallback_project, fallback_area)?;
  let normalized = serde_json::to_value(&config)?;

  if previous == Some(&normalized) {
    return Ok(config);
  }
  let path = store.write_config(&config).map_err(Error::store)?;
  if existing.is_some() {
    report.updated_files.push(path);
  } else {
    report.created_files.push(path);
  }
  Ok(config)
}

// ─── Per-kind migration ──────────────────────────────────────────────────────
//
// Records are rewritten as raw JSON. Only the id, the schema tag and decision
// references change; every other field is written back byte-for-byte as
// parsed, whether or not it fits the record model.

/// A record document and the id it will carry after migration.
struct Planned {
  name:   String,
  path:   String,
  id:     String,
  body:   Value,
  new_id: Option<String>,
}

/// Load every record of `kind` and decide its new id.
///
/// Only documents without a string id field are skipped as not being
/// records. A rename is refused when the target file name is already taken
/// by another file or by an earlier rename in the same pass.
fn plan<S: RecordStore>(
  store: &S,
  kind: RecordKind,
  project: &str,
  area: &str,
  report: &mut MigrationReport,
) -> Result<Vec<Planned>> {
  let documents = store.list(kind).map_err(Error::store)?;
  let mut claimed: BTreeSet<String> = documents.iter().map(|d| d.name.clone()).collect();
  let mut planned = Vec::with_capacity(documents.len());

  for doc in documents {
    let body = match doc.body {
      Document::Parsed(value) => value,
      Document::Malformed(reason) => {
        report.skip(&doc.path, SkipReason::Malformed(reason));
        continue;
      }
    };
    let Some(id) = body.get(kind.id_field()).and_then(Value::as_str).map(str::to_owned) else {
      let reason = format!("no string {} field", kind.id_field());
      report.skip(&doc.path, SkipReason::NotARecord(reason));
      continue;
    };

    let normalized = normalize_id(kind, &id, project, area);
    let new_id = if normalized == id {
      None
    } else {
      let target = format!("{normalized}.json");
      if target != doc.name && !claimed.insert(target.clone()) {
        report.skip(&doc.path, SkipReason::TargetExists(target));
        continue;
      }
      Some(normalized)
    };

    planned.push(Planned { name: doc.name, path: doc.path, id, body, new_id });
  }

  Ok(planned)
}

fn translation(planned: &[Planned]) -> TranslationTable {
  planned
    .iter()
    .filter_map(|p| p.new_id.as_ref().map(|new| (p.id.clone(), new.clone())))
    .collect()
}

/// Rewrite decision references in `body` through `table`. Decisions refer
/// to each other through `links` of type `decision`; risks through
/// `linked_decisions`. Returns `true` if any changed.
fn remap_references(kind: RecordKind, body: &mut Value, table: &TranslationTable) -> bool {
  let mut changed = false;
  let mut remap = |slot: &mut Value| {
    if let Some(new_id) = slot.as_str().and_then(|old| table.get(old)) {
      *slot = Value::String(new_id.clone());
      changed = true;
    }
  };

  match kind {
    RecordKind::Decision => {
      let links = body.get_mut("links").and_then(Value::as_array_mut);
      for link in links.into_iter().flatten() {
        if link.get("type").and_then(Value::as_str) != Some("decision") {
          continue;
        }
        if let Some(url) = link.get_mut("url") {
          remap(url);
        }
      }
    }
    RecordKind::Risk => {
      let linked = body.get_mut("linked_decisions").and_then(Value::as_array_mut);
      for entry in linked.into_iter().flatten() {
        remap(entry);
      }
    }
  }
  changed
}

/// Apply planned ids, schema tag upgrades and reference remapping; write
/// each changed record under its (possibly new) file name. Returns the
/// number of records written.
fn rewrite<S: RecordStore>(
  store: &S,
  kind: RecordKind,
  planned: Vec<Planned>,
  references: &TranslationTable,
  report: &mut MigrationReport,
) -> Result<usize> {
  let mut written = 0;

  for Planned { name, path, mut id, mut body, new_id } in planned {
    let mut changed = false;

    if let Some(new_id) = new_id {
      body[kind.id_field()] = Value::String(new_id.clone());
      id = new_id;
      changed = true;
    }
    let legacy_tag = body
      .get("schema")
      .and_then(Value::as_str)
      .is_some_and(|tag| kind.classify_tag(tag) == TagStatus::Legacy);
    if legacy_tag {
      body["schema"] = Value::String(kind.schema_tag().to_owned());
      changed = true;
    }
    changed |= remap_references(kind, &mut body, references);

    if !changed {
      continue;
    }

    let target = format!("{id}.json");
    let written_path = store.put(kind, &target, &body).map_err(Error::store)?;
    if target != name {
      store.remove(kind, &name).map_err(Error::store)?;
      debug!(from = %path, to = %written_path, "renamed record");
    } else {
      debug!(path = %written_path, "rewrote record");
    }
    report.updated_files.push(written_path);
    written += 1;
  }

  Ok(written)
}
