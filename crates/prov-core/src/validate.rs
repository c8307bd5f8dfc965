//! Ledger validation: schema shape, id grammar, schema tags and
//! cross-record references.
//!
//! The Validator never applies a severity policy. It returns every finding,
//! classified as an error or a warning, and leaves the caller to decide what
//! an error means (see [`crate::config::ValidationMode::passes`]).

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use strum::Display;
use tracing::{debug, info};

use crate::{
  Error, Result,
  config::ProvenanceConfig,
  id::{is_current_decision_id, is_current_id},
  record::{DecisionRecord, Record, RecordKind, RiskRecord, TagStatus},
  schema::{JsonSchemaChecker, ShapeChecker},
  store::{Document, RecordStore, StoredDocument},
};

// ─── Findings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  /// The file is not valid JSON.
  Parse,
  /// The document violates the record schema.
  Shape,
  /// An id or an id reference is not in the current grammar.
  Identity,
  /// A reference does not resolve, or an id is used twice.
  Reference,
  /// Informational only.
  Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
  /// Path of the offending file, relative to the repository root.
  pub file:     String,
  pub category: Category,
  pub message:  String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details:  Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
  /// `false` as soon as any error is recorded. Warnings never affect it.
  pub valid:             bool,
  pub errors:            Vec<Finding>,
  pub warnings:          Vec<Finding>,
  pub decisions_checked: usize,
  pub risks_checked:     usize,
}

impl Default for ValidationReport {
  fn default() -> Self {
    Self {
      valid:             true,
      errors:            Vec::new(),
      warnings:          Vec::new(),
      decisions_checked: 0,
      risks_checked:     0,
    }
  }
}

impl ValidationReport {
  /// Errors recorded against `file`.
  pub fn errors_for<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
    self.errors.iter().filter(move |f| f.file == file)
  }

  fn error(&mut self, file: &str, category: Category, message: String, details: Option<Value>) {
    debug!(file, %category, %message, "validation error");
    self.valid = false;
    self.errors.push(Finding { file: file.to_owned(), category, message, details });
  }

  fn warning(&mut self, file: &str, message: String) {
    self.warnings.push(Finding {
      file: file.to_owned(),
      category: Category::Advisory,
      message,
      details: None,
    });
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Optional rules layered on top of the always-on checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
  /// Every decision reference must name an existing decision.
  pub resolve_references: bool,
}

impl From<&ProvenanceConfig> for Rules {
  fn from(config: &ProvenanceConfig) -> Self {
    Self { resolve_references: config.validation.resolve_references }
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Validate every record in `store` with the bundled schemas and the rules
/// enabled in `config`.
pub fn validate<S: RecordStore>(store: &S, config: &ProvenanceConfig) -> Result<ValidationReport> {
  let checker = JsonSchemaChecker::new()?;
  validate_with(store, &checker, Rules::from(config))
}

pub fn validate_with<S, C>(store: &S, checker: &C, rules: Rules) -> Result<ValidationReport>
where
  S: RecordStore,
  C: ShapeChecker,
{
  let decision_docs = store.list(RecordKind::Decision).map_err(Error::store)?;
  let risk_docs = store.list(RecordKind::Risk).map_err(Error::store)?;

  let mut report = ValidationReport {
    decisions_checked: decision_docs.len(),
    risks_checked: risk_docs.len(),
    ..ValidationReport::default()
  };

  let mut decisions: Vec<(String, DecisionRecord)> = Vec::new();
  for doc in decision_docs {
    if let Some((path, Record::Decision(decision))) =
      check_document(checker, RecordKind::Decision, doc, &mut report)
    {
      decisions.push((path, decision));
    }
  }

  let mut risks: Vec<(String, RiskRecord)> = Vec::new();
  for doc in risk_docs {
    if let Some((path, Record::Risk(risk))) =
      check_document(checker, RecordKind::Risk, doc, &mut report)
    {
      risks.push((path, risk));
    }
  }

  check_duplicates(
    RecordKind::Decision,
    decisions.iter().map(|(p, d)| (p.as_str(), d.decision_id.as_str())),
    &mut report,
  );
  check_duplicates(
    RecordKind::Risk,
    risks.iter().map(|(p, r)| (p.as_str(), r.risk_id.as_str())),
    &mut report,
  );

  if rules.resolve_references {
    resolve_references(&decisions, &risks, &mut report);
  }

  info!(
    decisions = report.decisions_checked,
    risks = report.risks_checked,
    errors = report.errors.len(),
    warnings = report.warnings.len(),
    "validation finished"
  );
  Ok(report)
}

// ─── Per-document checks ─────────────────────────────────────────────────────

/// Parse, shape-check and identity-check one document.
///
/// Id, tag, file name and reference checks read the raw JSON, so a document
/// that fails the record model still gets every finding that applies to it.
/// The typed record is returned only when it could be built, for the
/// cross-record checks.
fn check_document<C: ShapeChecker>(
  checker: &C,
  kind: RecordKind,
  doc: StoredDocument,
  report: &mut ValidationReport,
) -> Option<(String, Record)> {
  let StoredDocument { name, path, body } = doc;

  let value = match body {
    Document::Parsed(value) => value,
    Document::Malformed(reason) => {
      report.error(&path, Category::Parse, format!("failed to parse JSON: {reason}"), None);
      return None;
    }
  };

  let violations = checker.check(kind, &value);
  let shape_failed = !violations.is_empty();
  for violation in violations {
    report.error(
      &path,
      Category::Shape,
      format!("schema validation failed: {}", violation.message),
      Some(violation.details),
    );
  }

  if let Some(id) = value.get(kind.id_field()).and_then(Value::as_str) {
    check_id(kind, &name, &path, id, report);
  }
  if let Some(tag) = value.get("schema").and_then(Value::as_str) {
    check_tag(kind, &path, tag, report);
  }
  match kind {
    RecordKind::Decision => {
      let consequences = value.get("consequences").and_then(Value::as_str);
      if consequences.is_none_or(|c| c.trim().is_empty()) {
        report.warning(&path, "recommended field \"consequences\" is missing".to_owned());
      }
    }
    RecordKind::Risk => {
      for linked in raw_linked_decisions(&value) {
        if !is_current_decision_id(linked) {
          report.error(
            &path,
            Category::Identity,
            format!("invalid linked decision id format: {linked}"),
            None,
          );
        }
      }
    }
  }

  match Record::from_value(kind, value) {
    Ok(record) => Some((path, record)),
    Err(err) => {
      // Already explained by the shape errors above when there are any.
      if !shape_failed {
        report.error(
          &path,
          Category::Shape,
          format!("record does not match the {kind} model: {err}"),
          None,
        );
      }
      None
    }
  }
}

fn check_id(kind: RecordKind, name: &str, path: &str, id: &str, report: &mut ValidationReport) {
  if !is_current_id(kind, id) {
    report.error(
      path,
      Category::Identity,
      format!("invalid {} format: {id}", kind.id_field()),
      None,
    );
  }

  let expected = format!("{id}.json");
  if name != expected {
    report.warning(path, format!("file name does not match its id; expected {expected}"));
  }
}

fn check_tag(kind: RecordKind, path: &str, tag: &str, report: &mut ValidationReport) {
  match kind.classify_tag(tag) {
    TagStatus::Current => {}
    TagStatus::Legacy => report.warning(
      path,
      format!(
        "legacy schema identifier {tag:?}; should be {:?} (v2.0 standard)",
        kind.schema_tag()
      ),
    ),
    TagStatus::Unknown => report.error(
      path,
      Category::Shape,
      format!("unrecognised schema identifier {tag:?}; expected {:?}", kind.schema_tag()),
      None,
    ),
  }
}

/// String entries of a risk's `linked_decisions`, whatever else the array
/// holds.
fn raw_linked_decisions(value: &Value) -> impl Iterator<Item = &str> {
  value
    .get("linked_decisions")
    .and_then(Value::as_array)
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
}

// ─── Cross-record checks ─────────────────────────────────────────────────────

fn check_duplicates<'a>(
  kind: RecordKind,
  records: impl Iterator<Item = (&'a str, &'a str)>,
  report: &mut ValidationReport,
) {
  let mut seen: HashMap<&str, &str> = HashMap::new();
  let mut duplicates = Vec::new();
  for (path, id) in records {
    if let Some(first) = seen.get(id) {
      duplicates.push((path, format!("duplicate {} {id} (also in {first})", kind.id_field())));
    } else {
      seen.insert(id, path);
    }
  }
  for (path, message) in duplicates {
    report.error(path, Category::Reference, message, None);
  }
}

fn resolve_references(
  decisions: &[(String, DecisionRecord)],
  risks: &[(String, RiskRecord)],
  report: &mut ValidationReport,
) {
  let known: HashSet<&str> = decisions.iter().map(|(_, d)| d.decision_id.as_str()).collect();

  for (path, decision) in decisions {
    for target in decision.linked_decision_ids() {
      if !is_current_decision_id(target) {
        report.error(
          path,
          Category::Identity,
          format!("invalid decision link format: {target}"),
          None,
        );
      } else if !known.contains(target) {
        report.error(
          path,
          Category::Reference,
          format!("decision link {target} does not resolve to a decision"),
          None,
        );
      }
    }
  }

  for (path, risk) in risks {
    // Malformed ids were already reported as identity errors.
    for linked in risk.linked_decision_ids().filter(|id| is_current_decision_id(id)) {
      if !known.contains(linked) {
        report.error(
          path,
          Category::Reference,
          format!("linked decision {linked} does not resolve to a decision"),
          None,
        );
      }
    }
  }
}
