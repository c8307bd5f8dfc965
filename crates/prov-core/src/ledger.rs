//! Typed, in-memory view of a ledger and the operations that add records.

use chrono::Utc;
use serde::Serialize;
use serde_json::Map;
use tracing::{debug, info};

use crate::{
  Error, Result,
  config::{ProvenanceConfig, checked_code},
  id::RecordId,
  migrate::{SkipReason, Skipped},
  record::{
    DecisionRecord, DecisionStatus, Link, Probability, Record, RecordKind, RiskRecord,
    RiskStatus, Severity, dedup_tags,
  },
  sequence::{allocate, commit},
  store::{Document, RecordStore},
};

/// Most decisions returned as sharing a tag with the subject of
/// [`Ledger::related`].
pub const SHARED_TAG_LIMIT: usize = 5;

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Every record in a store that parses into the typed model.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
  pub decisions: Vec<DecisionRecord>,
  pub risks:     Vec<RiskRecord>,
  /// Files that could not be loaded.
  pub skipped:   Vec<Skipped>,
}

/// What surrounds one decision.
#[derive(Debug, Serialize)]
pub struct Related<'a> {
  pub decision:    &'a DecisionRecord,
  /// Decisions this one links to through `decision` links.
  pub linked:      Vec<&'a DecisionRecord>,
  /// Risks listing this decision in `linked_decisions`.
  pub risks:       Vec<&'a RiskRecord>,
  pub shared_tags: Vec<&'a DecisionRecord>,
}

impl Ledger {
  pub fn load<S: RecordStore>(store: &S) -> Result<Self> {
    let mut ledger = Self::default();

    for kind in [RecordKind::Decision, RecordKind::Risk] {
      for doc in store.list(kind).map_err(Error::store)? {
        let value = match doc.body {
          Document::Parsed(value) => value,
          Document::Malformed(reason) => {
            ledger.skip(doc.path, SkipReason::Malformed(reason));
            continue;
          }
        };
        match Record::from_value(kind, value) {
          Ok(Record::Decision(d)) => ledger.decisions.push(d),
          Ok(Record::Risk(r)) => ledger.risks.push(r),
          Err(err) => ledger.skip(doc.path, SkipReason::NotARecord(err.to_string())),
        }
      }
    }

    debug!(
      decisions = ledger.decisions.len(),
      risks = ledger.risks.len(),
      skipped = ledger.skipped.len(),
      "loaded ledger"
    );
    Ok(ledger)
  }

  fn skip(&mut self, path: String, reason: SkipReason) {
    debug!(%path, %reason, "skipping unloadable record");
    self.skipped.push(Skipped { path, reason });
  }

  /// Every record, decisions first, as owned [`Record`]s.
  pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
    self
      .decisions
      .iter()
      .cloned()
      .map(Record::Decision)
      .chain(self.risks.iter().cloned().map(Record::Risk))
  }

  pub fn decision(&self, id: &str) -> Option<&DecisionRecord> {
    self.decisions.iter().find(|d| d.decision_id == id)
  }

  pub fn risk(&self, id: &str) -> Option<&RiskRecord> {
    self.risks.iter().find(|r| r.risk_id == id)
  }

  /// Look up a record of either kind by id.
  pub fn find(&self, id: &str) -> Option<Record> {
    self
      .decision(id)
      .cloned()
      .map(Record::Decision)
      .or_else(|| self.risk(id).cloned().map(Record::Risk))
  }

  pub fn related(&self, decision_id: &str) -> Result<Related<'_>> {
    let decision = self
      .decision(decision_id)
      .ok_or_else(|| Error::RecordNotFound(decision_id.to_owned()))?;

    let linked = decision
      .linked_decision_ids()
      .filter_map(|id| self.decision(id))
      .collect();

    let risks = self
      .risks
      .iter()
      .filter(|r| r.linked_decision_ids().any(|id| id == decision_id))
      .collect();

    let tags = decision.tags.as_deref().unwrap_or_default();
    let shared_tags = self
      .decisions
      .iter()
      .filter(|d| d.decision_id != decision_id)
      .filter(|d| d.tags.iter().flatten().any(|t| tags.contains(t)))
      .take(SHARED_TAG_LIMIT)
      .collect();

    Ok(Related { decision, linked, risks, shared_tags })
  }
}

// ─── Adding records ──────────────────────────────────────────────────────────

/// Input for [`add_decision`]. Unset scope codes use the config defaults.
#[derive(Debug, Clone, Default)]
pub struct NewDecision {
  pub title:        String,
  pub context:      String,
  pub decision:     String,
  pub consequences: Option<String>,
  pub status:       DecisionStatus,
  pub project:      Option<String>,
  pub area:         Option<String>,
  pub links:        Vec<Link>,
  pub authors:      Vec<String>,
  pub tags:         Vec<String>,
}

/// Input for [`add_risk`].
#[derive(Debug, Clone)]
pub struct NewRisk {
  pub title:            String,
  pub description:      String,
  pub severity:         Severity,
  pub status:           RiskStatus,
  pub probability:      Option<Probability>,
  pub impact:           Option<String>,
  pub mitigation:       Option<String>,
  pub owner:            Option<String>,
  pub linked_decisions: Vec<String>,
  pub project:          Option<String>,
  pub area:             Option<String>,
  pub tags:             Vec<String>,
}

impl Default for NewRisk {
  fn default() -> Self {
    Self {
      title:            String::new(),
      description:      String::new(),
      severity:         Severity::Medium,
      status:           RiskStatus::Open,
      probability:      None,
      impact:           None,
      mitigation:       None,
      owner:            None,
      linked_decisions: Vec::new(),
      project:          None,
      area:             None,
      tags:             Vec::new(),
    }
  }
}

/// Allocate the next decision id in scope and write the new record.
pub fn add_decision<S: RecordStore>(
  store: &S,
  config: &ProvenanceConfig,
  new: NewDecision,
) -> Result<DecisionRecord> {
  let id = reserve(store, config, RecordKind::Decision, new.project, new.area)?;

  let record = DecisionRecord {
    schema:       RecordKind::Decision.schema_tag().to_owned(),
    decision_id:  id.to_string(),
    title:        new.title,
    status:       new.status,
    context:      new.context,
    decision:     new.decision,
    consequences: new.consequences,
    risk_note:    None,
    links:        (!new.links.is_empty()).then_some(new.links),
    date_created: Some(Utc::now()),
    date_updated: None,
    authors:      (!new.authors.is_empty()).then_some(new.authors),
    tags:         Some(dedup_tags(new.tags)),
    extra:        Map::new(),
  };

  write(store, &id, &Record::Decision(record.clone()))?;
  Ok(record)
}

/// Allocate the next risk id in scope and write the new record.
pub fn add_risk<S: RecordStore>(
  store: &S,
  config: &ProvenanceConfig,
  new: NewRisk,
) -> Result<RiskRecord> {
  let id = reserve(store, config, RecordKind::Risk, new.project, new.area)?;

  let record = RiskRecord {
    schema:           RecordKind::Risk.schema_tag().to_owned(),
    risk_id:          id.to_string(),
    title:            new.title,
    description:      new.description,
    severity:         new.severity,
    status:           new.status,
    linked_decisions: Some(dedup_tags(new.linked_decisions)),
    mitigation:       new.mitigation,
    impact:           new.impact,
    probability:      new.probability,
    owner:            new.owner,
    date_created:     Some(Utc::now()),
    date_updated:     None,
    tags:             Some(dedup_tags(new.tags)),
    extra:            Map::new(),
  };

  write(store, &id, &Record::Risk(record.clone()))?;
  Ok(record)
}

fn reserve<S: RecordStore>(
  store: &S,
  config: &ProvenanceConfig,
  kind: RecordKind,
  project: Option<String>,
  area: Option<String>,
) -> Result<RecordId> {
  let project = checked_code("project", project.as_deref().unwrap_or(&config.default_project))?;
  let area = checked_code("area", area.as_deref().unwrap_or(&config.default_area))?;
  allocate(store, kind, &project, &area)
}

fn write<S: RecordStore>(store: &S, id: &RecordId, record: &Record) -> Result<()> {
  let name = record.file_name();
  let taken = store
    .list(id.kind)
    .map_err(Error::store)?
    .iter()
    .any(|doc| doc.name == name);
  if taken {
    return Err(Error::AlreadyExists(id.to_string()));
  }

  let path = store.put(id.kind, &name, &record.to_value()?).map_err(Error::store)?;
  commit(store, id)?;
  info!(id = %id, %path, "added record");
  Ok(())
}
