//! Shape checking of raw record documents against the bundled JSON schemas.

use jsonschema::{Draft, Validator};
use serde_json::{Value, json};

use crate::{Error, Result, record::RecordKind};

/// Bundled decision schema, also copied into the ledger's schemas directory.
pub const DECISION_SCHEMA: &str = include_str!("../schemas/decision.g2.schema.json");
pub const RISK_SCHEMA: &str = include_str!("../schemas/risk.g2.schema.json");

/// `(file name, contents)` of every bundled schema.
pub const BUNDLED_SCHEMAS: [(&str, &str); 2] = [
  ("decision.g2.schema.json", DECISION_SCHEMA),
  ("risk.g2.schema.json", RISK_SCHEMA),
];

/// One constraint a document failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeViolation {
  pub message: String,
  /// Raw diagnostic detail for display.
  pub details: Value,
}

/// Anything that can check a document's shape for a record kind.
pub trait ShapeChecker {
  fn check(&self, kind: RecordKind, document: &Value) -> Vec<ShapeViolation>;
}

/// [`ShapeChecker`] backed by the bundled Draft 2020-12 schemas.
pub struct JsonSchemaChecker {
  decision: Validator,
  risk:     Validator,
}

impl JsonSchemaChecker {
  pub fn new() -> Result<Self> {
    Ok(Self {
      decision: compile("decision", DECISION_SCHEMA)?,
      risk:     compile("risk", RISK_SCHEMA)?,
    })
  }
}

impl ShapeChecker for JsonSchemaChecker {
  fn check(&self, kind: RecordKind, document: &Value) -> Vec<ShapeViolation> {
    let validator = match kind {
      RecordKind::Decision => &self.decision,
      RecordKind::Risk => &self.risk,
    };
    validator
      .iter_errors(document)
      .map(|err| {
        let message = err.to_string();
        ShapeViolation {
          details: json!({ "schema": kind.to_string(), "error": message }),
          message,
        }
      })
      .collect()
  }
}

fn compile(name: &'static str, source: &str) -> Result<Validator> {
  let schema: Value = serde_json::from_str(source)?;
  jsonschema::options()
    .with_draft(Draft::Draft202012)
    .build(&schema)
    .map_err(|err| Error::SchemaCompile { name, message: err.to_string() })
}
