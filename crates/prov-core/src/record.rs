//! Record types: the two document kinds held in a provenance ledger.
//!
//! Records are parsed from JSON at the store boundary into
//! [`DecisionRecord`] or [`RiskRecord`]. Fields the model does not know about
//! are kept in `extra` so that rewriting a record never drops data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::Result;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Which of the two record families a document belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
  Decision,
  Risk,
}

/// Current short schema tag for decisions.
pub const DECISION_SCHEMA_TAG: &str = "provenancecode.decision.v2";
/// Legacy URL-form schema tag for decisions; tolerated with a warning.
pub const LEGACY_DECISION_SCHEMA_TAG: &str =
  "https://provenancecode.org/schemas/decision.g2.schema.json";
/// Current short schema tag for risks.
pub const RISK_SCHEMA_TAG: &str = "provenancecode.risk.v2";
/// Legacy URL-form schema tag for risks; tolerated with a warning.
pub const LEGACY_RISK_SCHEMA_TAG: &str =
  "https://provenancecode.org/schemas/risk.g2.schema.json";

/// How a record's `schema` field relates to the current standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStatus {
  Current,
  Legacy,
  Unknown,
}

impl RecordKind {
  /// The id prefix used by the current scheme (`DEC` or `RA`).
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Decision => "DEC",
      Self::Risk => "RA",
    }
  }

  /// The JSON field that carries the record id.
  pub fn id_field(self) -> &'static str {
    match self {
      Self::Decision => "decision_id",
      Self::Risk => "risk_id",
    }
  }

  pub fn schema_tag(self) -> &'static str {
    match self {
      Self::Decision => DECISION_SCHEMA_TAG,
      Self::Risk => RISK_SCHEMA_TAG,
    }
  }

  pub fn legacy_schema_tag(self) -> &'static str {
    match self {
      Self::Decision => LEGACY_DECISION_SCHEMA_TAG,
      Self::Risk => LEGACY_RISK_SCHEMA_TAG,
    }
  }

  pub fn classify_tag(self, tag: &str) -> TagStatus {
    if tag == self.schema_tag() {
      TagStatus::Current
    } else if tag == self.legacy_schema_tag() {
      TagStatus::Legacy
    } else {
      TagStatus::Unknown
    }
  }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DecisionStatus {
  #[default]
  Draft,
  Proposed,
  Accepted,
  Rejected,
  Deprecated,
  Superseded,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskStatus {
  #[default]
  Open,
  Monitoring,
  Mitigated,
  Accepted,
  Closed,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Probability {
  Low,
  Medium,
  High,
}

/// What a decision link points at.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkKind {
  Pr,
  Issue,
  Doc,
  /// `url` holds another decision's id.
  Decision,
  Risk,
  Other,
}

/// An outbound reference from a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
  #[serde(rename = "type")]
  pub kind:  LinkKind,
  pub url:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// A recorded architectural or product decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
  pub schema:       String,
  pub decision_id:  String,
  pub title:        String,
  pub status:       DecisionStatus,
  pub context:      String,
  pub decision:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub consequences: Option<String>,
  /// Free-text risk note attached to the decision.
  #[serde(default, rename = "risk", skip_serializing_if = "Option::is_none")]
  pub risk_note:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub links:        Option<Vec<Link>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_created: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_updated: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authors:      Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags:         Option<Vec<String>>,
  /// Fields not covered by the model, preserved across rewrites.
  #[serde(flatten)]
  pub extra:        Map<String, Value>,
}

impl DecisionRecord {
  /// Ids of other decisions referenced through `links` of type `decision`.
  pub fn linked_decision_ids(&self) -> impl Iterator<Item = &str> {
    self
      .links
      .iter()
      .flatten()
      .filter(|l| l.kind == LinkKind::Decision)
      .map(|l| l.url.as_str())
  }

  /// The placeholder written to `TEMPLATE.json`.
  pub fn template() -> Self {
    Self {
      schema:       DECISION_SCHEMA_TAG.to_owned(),
      decision_id:  "DEC-PROJ-CORE-000000".to_owned(),
      title:        "Short title of the decision".to_owned(),
      status:       DecisionStatus::Draft,
      context:      "What is the issue motivating this decision?".to_owned(),
      decision:     "What is the change being made?".to_owned(),
      consequences: Some("What becomes easier or harder because of it?".to_owned()),
      risk_note:    None,
      links:        Some(Vec::new()),
      date_created: None,
      date_updated: None,
      authors:      None,
      tags:         Some(Vec::new()),
      extra:        Map::new(),
    }
  }
}

// ─── Risk ────────────────────────────────────────────────────────────────────

/// A tracked risk, optionally tied to the decisions that introduced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
  pub schema:           String,
  pub risk_id:          String,
  pub title:            String,
  pub description:      String,
  pub severity:         Severity,
  pub status:           RiskStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub linked_decisions: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mitigation:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub impact:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub probability:      Option<Probability>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub owner:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_created:     Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_updated:     Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags:             Option<Vec<String>>,
  #[serde(flatten)]
  pub extra:            Map<String, Value>,
}

impl RiskRecord {
  pub fn linked_decision_ids(&self) -> impl Iterator<Item = &str> {
    self.linked_decisions.iter().flatten().map(String::as_str)
  }

  pub fn template() -> Self {
    Self {
      schema:           RISK_SCHEMA_TAG.to_owned(),
      risk_id:          "RA-PROJ-CORE-000000".to_owned(),
      title:            "Short title of the risk".to_owned(),
      description:      "What could go wrong?".to_owned(),
      severity:         Severity::Medium,
      status:           RiskStatus::Open,
      linked_decisions: Some(Vec::new()),
      mitigation:       Some("How is the risk being reduced?".to_owned()),
      impact:           None,
      probability:      None,
      owner:            None,
      date_created:     None,
      date_updated:     None,
      tags:             Some(Vec::new()),
      extra:            Map::new(),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Either kind of record, for code that handles both uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
  Decision(DecisionRecord),
  Risk(RiskRecord),
}

impl Record {
  /// Parse a JSON document as a record of `kind`.
  pub fn from_value(kind: RecordKind, value: Value) -> Result<Self> {
    Ok(match kind {
      RecordKind::Decision => Self::Decision(serde_json::from_value(value)?),
      RecordKind::Risk => Self::Risk(serde_json::from_value(value)?),
    })
  }

  pub fn to_value(&self) -> Result<Value> {
    Ok(match self {
      Self::Decision(d) => serde_json::to_value(d)?,
      Self::Risk(r) => serde_json::to_value(r)?,
    })
  }

  pub fn kind(&self) -> RecordKind {
    match self {
      Self::Decision(_) => RecordKind::Decision,
      Self::Risk(_) => RecordKind::Risk,
    }
  }

  pub fn id(&self) -> &str {
    match self {
      Self::Decision(d) => &d.decision_id,
      Self::Risk(r) => &r.risk_id,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      Self::Decision(d) => &d.title,
      Self::Risk(r) => &r.title,
    }
  }

  /// The status rendered as its on-disk string.
  pub fn status(&self) -> String {
    match self {
      Self::Decision(d) => d.status.to_string(),
      Self::Risk(r) => r.status.to_string(),
    }
  }

  pub fn tags(&self) -> &[String] {
    let tags = match self {
      Self::Decision(d) => &d.tags,
      Self::Risk(r) => &r.tags,
    };
    tags.as_deref().unwrap_or_default()
  }

  /// The file name this record must be stored under.
  pub fn file_name(&self) -> String { format!("{}.json", self.id()) }
}

/// Deduplicate `tags` by value, keeping first-seen order.
pub fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for tag in tags {
    let tag = tag.trim().to_owned();
    if !tag.is_empty() && !out.contains(&tag) {
      out.push(tag);
    }
  }
  out
}
