//! The ledger configuration document.
//!
//! Loaded once by the caller and passed by reference into every operation;
//! nothing here caches it. The on-disk field names follow the existing
//! `provenance.config.json` format, with the descriptive names accepted as
//! aliases.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::{Error, Result, id::is_valid_code, validate::ValidationReport};

pub const STANDARD: &str = "v2.0";
pub const STANDARD_VERSION: &str = "2.0";
pub const ID_TEMPLATE: &str = "DEC-{PROJECT}-{SUBPROJECT}-{SEQ6}";
pub const RISK_ID_TEMPLATE: &str = "RA-{PROJECT}-{SUBPROJECT}-{SEQ6}";
pub const DEFAULT_PROJECT: &str = "PROJ";
pub const DEFAULT_AREA: &str = "CORE";

/// Top-level keys owned by [`ProvenanceConfig`], aliases included.
const MODEL_KEYS: &[&str] = &[
  "standard",
  "schemaVersionTag",
  "version",
  "idScheme",
  "idTemplate",
  "riskIdScheme",
  "riskIdTemplate",
  "defaultAppCode",
  "defaultProject",
  "defaultArea",
  "paths",
  "validation",
];

// ─── Validation settings ─────────────────────────────────────────────────────

/// How the caller turns a validation report into an exit status.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValidationMode {
  /// Report findings, always succeed.
  #[default]
  Warn,
  /// Fail when the report contains any error.
  Fail,
}

impl ValidationMode {
  /// Whether `report` counts as a success under this mode. Warnings never
  /// matter.
  pub fn passes(self, report: &ValidationReport) -> bool {
    match self {
      Self::Warn => true,
      Self::Fail => report.valid,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSettings {
  /// Unknown or missing values read as [`ValidationMode::Warn`].
  #[serde(default, deserialize_with = "lenient_mode")]
  pub mode:               ValidationMode,
  /// Require every decision reference to resolve to an existing record.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub resolve_references: bool,
}

fn lenient_mode<'de, D>(deserializer: D) -> std::result::Result<ValidationMode, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<Value>::deserialize(deserializer)?;
  Ok(
    raw
      .as_ref()
      .and_then(Value::as_str)
      .and_then(|s| s.parse().ok())
      .unwrap_or_default(),
  )
}

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Store locations, relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
  pub root:      String,
  pub decisions: String,
  pub risks:     String,
  pub schemas:   String,
}

impl Default for Paths {
  fn default() -> Self {
    Self {
      root:      "provenance".to_owned(),
      decisions: "provenance/decisions".to_owned(),
      risks:     "provenance/risks".to_owned(),
      schemas:   "provenance/schemas".to_owned(),
    }
  }
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvenanceConfig {
  #[serde(alias = "schemaVersionTag")]
  pub standard:         String,
  pub version:          String,
  #[serde(rename = "idScheme", alias = "idTemplate")]
  pub id_template:      String,
  #[serde(rename = "riskIdScheme", alias = "riskIdTemplate")]
  pub risk_id_template: String,
  #[serde(rename = "defaultAppCode", alias = "defaultProject")]
  pub default_project:  String,
  pub default_area:     String,
  pub paths:            Paths,
  pub validation:       ValidationSettings,
  /// Keys this model does not know about (e.g. monorepo settings).
  #[serde(flatten)]
  pub extra:            Map<String, Value>,
}

impl Default for ProvenanceConfig {
  fn default() -> Self {
    Self {
      standard:         STANDARD.to_owned(),
      version:          STANDARD_VERSION.to_owned(),
      id_template:      ID_TEMPLATE.to_owned(),
      risk_id_template: RISK_ID_TEMPLATE.to_owned(),
      default_project:  DEFAULT_PROJECT.to_owned(),
      default_area:     DEFAULT_AREA.to_owned(),
      paths:            Paths::default(),
      validation:       ValidationSettings::default(),
      extra:            Map::new(),
    }
  }
}

impl ProvenanceConfig {
  /// A fresh config for the given scope codes.
  pub fn new(project: &str, area: &str) -> Result<Self> {
    let mut config = Self::default();
    config.set_project(project)?;
    config.set_area(area)?;
    Ok(config)
  }

  pub fn from_value(value: Value) -> Result<Self> { Ok(serde_json::from_value(value)?) }

  /// Bring an existing config document (or none) up to the current standard.
  ///
  /// Works field by field on the raw document, so one bad value never
  /// discards the rest. Schema tags, id templates and paths are forced to
  /// their current values. Existing project and area codes are uppercased
  /// and kept when valid; otherwise the fallbacks are used. The fallbacks
  /// themselves must be valid codes. Unknown keys are carried over.
  pub fn normalized(
    existing: Option<&Value>,
    fallback_project: &str,
    fallback_area: &str,
  ) -> Result<Self> {
    let fallback_project = checked_code("project", fallback_project)?;
    let fallback_area = checked_code("area", fallback_area)?;

    let mut raw = existing.and_then(Value::as_object).cloned().unwrap_or_default();
    let default_project =
      keep_or_fallback(first_str(&raw, &["defaultAppCode", "defaultProject"]), &fallback_project);
    let default_area = keep_or_fallback(first_str(&raw, &["defaultArea"]), &fallback_area);

    let validation = raw.get("validation");
    let setting = |key: &str| validation.and_then(|v| v.get(key));
    let validation = ValidationSettings {
      mode:               setting("mode")
        .and_then(Value::as_str)
        .and_then(|m| m.parse().ok())
        .unwrap_or_default(),
      resolve_references: setting("resolveReferences")
        .and_then(Value::as_bool)
        .unwrap_or(false),
    };

    for key in MODEL_KEYS {
      raw.remove(*key);
    }

    Ok(Self { default_project, default_area, validation, extra: raw, ..Self::default() })
  }

  pub fn set_project(&mut self, code: &str) -> Result<()> {
    self.default_project = checked_code("project", code)?;
    Ok(())
  }

  pub fn set_area(&mut self, code: &str) -> Result<()> {
    self.default_area = checked_code("area", code)?;
    Ok(())
  }

  pub fn set_mode(&mut self, mode: &str) -> Result<()> {
    self.validation.mode = mode
      .parse()
      .map_err(|_| Error::InvalidMode(mode.to_owned()))?;
    Ok(())
  }

  /// Look up a single top-level or dotted key (e.g. `validation.mode`) in the
  /// serialized form.
  pub fn get(&self, key: &str) -> Result<Option<Value>> {
    let value = serde_json::to_value(self)?;
    let pointer = format!("/{}", key.replace('.', "/"));
    Ok(value.pointer(&pointer).cloned())
  }
}

/// Uppercase `code` and check it against the code grammar.
pub fn checked_code(field: &'static str, code: &str) -> Result<String> {
  let upper = code.trim().to_uppercase();
  if is_valid_code(&upper) {
    Ok(upper)
  } else {
    Err(Error::InvalidCode { field, value: code.to_owned() })
  }
}

fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
  keys.iter().find_map(|k| map.get(*k).and_then(Value::as_str))
}

fn keep_or_fallback(existing: Option<&str>, fallback: &str) -> String {
  existing
    .map(|c| c.trim().to_uppercase())
    .filter(|c| is_valid_code(c))
    .unwrap_or_else(|| fallback.to_owned())
}
