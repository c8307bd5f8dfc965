//! Identifier grammars.
//!
//! Every notion of "valid id" in the crate comes from this module. Two
//! generations exist:
//!
//! | kind     | legacy                                   | current                      |
//! |----------|------------------------------------------|------------------------------|
//! | decision | `DEC-000042`                             | `DEC-ACME-WEB-000042`        |
//! | risk     | `RSK-000042`, `RA-000042`, `RSK-ACME-WEB-000042` | `RA-ACME-WEB-000042` |
//!
//! Project and area codes are 2-4 uppercase letters or digits; sequences are
//! six zero-padded digits.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::record::RecordKind;

/// Number of digits in a formatted sequence.
pub const SEQUENCE_WIDTH: usize = 6;

static CODE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Z0-9]{2,4}$").expect("static regex"));

static CURRENT_DECISION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^DEC-([A-Z0-9]{2,4})-([A-Z0-9]{2,4})-([0-9]{6})$").expect("static regex")
});

static CURRENT_RISK: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^RA-([A-Z0-9]{2,4})-([A-Z0-9]{2,4})-([0-9]{6})$").expect("static regex")
});

static LEGACY_DECISION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^DEC-([0-9]{6})$").expect("static regex"));

static LEGACY_RISK_QUALIFIED: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^RSK-([A-Z0-9]{2,4})-([A-Z0-9]{2,4})-([0-9]{6})$").expect("static regex")
});

static LEGACY_RISK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(?:RSK|RA)-([0-9]{6})$").expect("static regex"));

// ─── Predicates ──────────────────────────────────────────────────────────────

/// `true` if `code` is usable as a project or area code.
pub fn is_valid_code(code: &str) -> bool { CODE.is_match(code) }

pub fn is_current_decision_id(id: &str) -> bool { CURRENT_DECISION.is_match(id) }

pub fn is_current_risk_id(id: &str) -> bool { CURRENT_RISK.is_match(id) }

/// Current-grammar check for either kind.
pub fn is_current_id(kind: RecordKind, id: &str) -> bool {
  match kind {
    RecordKind::Decision => is_current_decision_id(id),
    RecordKind::Risk => is_current_risk_id(id),
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Upgrade a decision id to the current grammar.
///
/// Current ids are returned unchanged and sequence-only ids take the fallback
/// project and area. Any other form passes through untouched so that it can
/// be reviewed by hand.
pub fn normalize_decision_id(id: &str, fallback_project: &str, fallback_area: &str) -> String {
  if is_current_decision_id(id) {
    return id.to_owned();
  }
  if let Some(caps) = LEGACY_DECISION.captures(id) {
    return format!("DEC-{fallback_project}-{fallback_area}-{}", &caps[1]);
  }
  id.to_owned()
}

/// Upgrade a risk id to the current grammar.
///
/// `RSK-{P}-{A}-{SEQ}` keeps its codes and takes the `RA` prefix;
/// `RSK-{SEQ}` and `RA-{SEQ}` take the fallback codes. Unrecognised forms
/// pass through.
pub fn normalize_risk_id(id: &str, fallback_project: &str, fallback_area: &str) -> String {
  if is_current_risk_id(id) {
    return id.to_owned();
  }
  if let Some(caps) = LEGACY_RISK_QUALIFIED.captures(id) {
    return format!("RA-{}-{}-{}", &caps[1], &caps[2], &caps[3]);
  }
  if let Some(caps) = LEGACY_RISK.captures(id) {
    return format!("RA-{fallback_project}-{fallback_area}-{}", &caps[1]);
  }
  id.to_owned()
}

pub fn normalize_id(
  kind: RecordKind,
  id: &str,
  fallback_project: &str,
  fallback_area: &str,
) -> String {
  match kind {
    RecordKind::Decision => normalize_decision_id(id, fallback_project, fallback_area),
    RecordKind::Risk => normalize_risk_id(id, fallback_project, fallback_area),
  }
}

// ─── Formatting ──────────────────────────────────────────────────────────────

/// Zero-pad a sequence number to [`SEQUENCE_WIDTH`] digits.
pub fn format_sequence(sequence: u32) -> String {
  format!("{sequence:0width$}", width = SEQUENCE_WIDTH)
}

/// Build a current-grammar id.
pub fn format_id(kind: RecordKind, project: &str, area: &str, sequence: u32) -> String {
  format!("{}-{project}-{area}-{}", kind.prefix(), format_sequence(sequence))
}

/// The id prefix shared by every record in a scope, e.g. `DEC-ACME-WEB-`.
pub fn scope_prefix(kind: RecordKind, project: &str, area: &str) -> String {
  format!("{}-{project}-{area}-", kind.prefix())
}

// ─── RecordId ────────────────────────────────────────────────────────────────

/// A parsed current-grammar id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
  pub kind:     RecordKind,
  pub project:  String,
  pub area:     String,
  pub sequence: u32,
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&format_id(self.kind, &self.project, &self.area, self.sequence))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a current-scheme record id: {0:?}")]
pub struct ParseIdError(pub String);

impl FromStr for RecordId {
  type Err = ParseIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (kind, caps) = if let Some(caps) = CURRENT_DECISION.captures(s) {
      (RecordKind::Decision, caps)
    } else if let Some(caps) = CURRENT_RISK.captures(s) {
      (RecordKind::Risk, caps)
    } else {
      return Err(ParseIdError(s.to_owned()));
    };

    let sequence = caps[3].parse().map_err(|_| ParseIdError(s.to_owned()))?;
    Ok(Self {
      kind,
      project: caps[1].to_owned(),
      area: caps[2].to_owned(),
      sequence,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn current_grammars() {
    assert!(is_current_decision_id("DEC-ACME-WEB-000042"));
    assert!(is_current_decision_id("DEC-A1-B2-000001"));
    assert!(!is_current_decision_id("DEC-1-1-1"));
    assert!(!is_current_decision_id("DEC-acme-WEB-000042"));
    assert!(!is_current_decision_id("DEC-ACMEX-WEB-000042"));
    assert!(!is_current_decision_id("DEC-000042"));
    assert!(is_current_risk_id("RA-ACME-WEB-000005"));
    assert!(!is_current_risk_id("RSK-ACME-WEB-000005"));
  }

  #[test]
  fn legacy_decision_takes_fallback_scope() {
    let id = normalize_decision_id("DEC-000042", "ACME", "WEB");
    assert_eq!(id, "DEC-ACME-WEB-000042");
    assert_eq!(normalize_decision_id(&id, "OTHR", "X1"), id);
  }

  #[test]
  fn unrecognised_ids_pass_through() {
    assert_eq!(normalize_decision_id("DEC-1-1-1", "ACME", "WEB"), "DEC-1-1-1");
    assert_eq!(normalize_decision_id("ADR-0001", "ACME", "WEB"), "ADR-0001");
    assert_eq!(normalize_risk_id("RISK-7", "ACME", "WEB"), "RISK-7");
  }

  #[test]
  fn legacy_risk_forms() {
    assert_eq!(normalize_risk_id("RSK-ACME-WEB-000005", "X", "Y"), "RA-ACME-WEB-000005");
    assert_eq!(normalize_risk_id("RSK-000005", "ACME", "WEB"), "RA-ACME-WEB-000005");
    assert_eq!(normalize_risk_id("RA-000005", "ACME", "WEB"), "RA-ACME-WEB-000005");
    assert_eq!(normalize_risk_id("RA-ACME-WEB-000005", "X", "Y"), "RA-ACME-WEB-000005");
  }

  #[test]
  fn format_pads_sequence() {
    assert_eq!(format_id(RecordKind::Decision, "ACME", "WEB", 8), "DEC-ACME-WEB-000008");
    assert_eq!(format_id(RecordKind::Risk, "ACME", "WEB", 123456), "RA-ACME-WEB-123456");
    assert_eq!(scope_prefix(RecordKind::Risk, "ACME", "WEB"), "RA-ACME-WEB-");
  }

  #[test]
  fn record_id_parses_and_displays() {
    let id: RecordId = "RA-ACME-WEB-000017".parse().unwrap();
    assert_eq!(id.kind, RecordKind::Risk);
    assert_eq!(id.project, "ACME");
    assert_eq!(id.area, "WEB");
    assert_eq!(id.sequence, 17);
    assert_eq!(id.to_string(), "RA-ACME-WEB-000017");
    assert!("DEC-000017".parse::<RecordId>().is_err());
  }

  #[test]
  fn codes() {
    assert!(is_valid_code("AB"));
    assert!(is_valid_code("AB12"));
    assert!(!is_valid_code("A"));
    assert!(!is_valid_code("ABCDE"));
    assert!(!is_valid_code("ab"));
  }
}
