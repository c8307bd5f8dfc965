//! Integration tests for `FsStore` against a temporary directory.

use std::fs;

use prov_core::{
  config::ProvenanceConfig,
  ledger::{NewDecision, add_decision},
  migrate::migrate,
  record::RecordKind,
  sequence::next_sequence,
  store::{Document, RecordStore, SequenceMarks},
  validate::validate,
};
use serde_json::json;
use tempfile::TempDir;

use crate::{CONFIG_PATH, Error, FsStore};

fn store() -> (TempDir, FsStore) {
  let dir = tempfile::tempdir().expect("temp dir");
  let store = FsStore::new(dir.path());
  (dir, store)
}

fn write(dir: &TempDir, relative: &str, contents: &str) {
  let path = dir.path().join(relative);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, contents).unwrap();
}

fn read(dir: &TempDir, relative: &str) -> serde_json::Value {
  serde_json::from_str(&fs::read_to_string(dir.path().join(relative)).unwrap()).unwrap()
}

// ─── Scaffold ────────────────────────────────────────────────────────────────

#[test]
fn scaffold_creates_layout_once() {
  let (dir, s) = store();

  let created = s.ensure_scaffold().unwrap();
  for expected in [
    "provenance/decisions/TEMPLATE.json",
    "provenance/risks/TEMPLATE.json",
    "provenance/codes.json",
    "provenance/sequences.json",
    "provenance/README.md",
    "provenance/schemas/decision.g2.schema.json",
    "provenance/schemas/risk.g2.schema.json",
  ] {
    assert!(created.contains(&expected.to_owned()), "missing {expected}");
    assert!(dir.path().join(expected).is_file());
  }
  assert_eq!(read(&dir, "provenance/codes.json")["schema"], json!("provenancecode.codes@1.0"));

  assert!(s.ensure_scaffold().unwrap().is_empty());
}

#[test]
fn scaffold_never_overwrites() {
  let (dir, s) = store();
  write(&dir, "provenance/README.md", "ours\n");

  let created = s.ensure_scaffold().unwrap();
  assert!(!created.contains(&"provenance/README.md".to_owned()));
  assert_eq!(fs::read_to_string(dir.path().join("provenance/README.md")).unwrap(), "ours\n");
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[test]
fn missing_directory_lists_empty() {
  let (_dir, s) = store();
  assert!(s.list(RecordKind::Decision).unwrap().is_empty());
}

#[test]
fn list_is_sorted_and_filtered() {
  let (dir, s) = store();
  write(&dir, "provenance/decisions/DEC-ACME-WEB-000002.json", "{}");
  write(&dir, "provenance/decisions/DEC-ACME-WEB-000001.json", "{}");
  write(&dir, "provenance/decisions/TEMPLATE.json", "{}");
  write(&dir, "provenance/decisions/notes.md", "hi");
  fs::create_dir_all(dir.path().join("provenance/decisions/nested.json")).unwrap();

  let names: Vec<_> = s
    .list(RecordKind::Decision)
    .unwrap()
    .into_iter()
    .map(|d| d.name)
    .collect();
  assert_eq!(names, vec!["DEC-ACME-WEB-000001.json", "DEC-ACME-WEB-000002.json"]);
}

#[test]
fn malformed_file_is_listed_as_malformed() {
  let (dir, s) = store();
  write(&dir, "provenance/risks/RA-ACME-WEB-000001.json", "{ nope");

  let docs = s.list(RecordKind::Risk).unwrap();
  assert_eq!(docs.len(), 1);
  assert_eq!(docs[0].path, "provenance/risks/RA-ACME-WEB-000001.json");
  assert!(matches!(docs[0].body, Document::Malformed(_)));
}

#[test]
fn put_and_remove() {
  let (dir, s) = store();
  let doc = json!({ "risk_id": "RA-ACME-WEB-000001" });

  let path = s.put(RecordKind::Risk, "RA-ACME-WEB-000001.json", &doc).unwrap();
  assert_eq!(path, "provenance/risks/RA-ACME-WEB-000001.json");
  let text = fs::read_to_string(dir.path().join(&path)).unwrap();
  assert!(text.ends_with("}\n"));
  assert_eq!(s.list(RecordKind::Risk).unwrap()[0].body, Document::Parsed(doc));

  s.remove(RecordKind::Risk, "RA-ACME-WEB-000001.json").unwrap();
  s.remove(RecordKind::Risk, "RA-ACME-WEB-000001.json").unwrap();
  assert!(s.list(RecordKind::Risk).unwrap().is_empty());
}

// ─── Config & registries ─────────────────────────────────────────────────────

#[test]
fn missing_config_is_not_initialised() {
  let (_dir, s) = store();
  assert!(matches!(s.load_config(), Err(Error::Core(prov_core::Error::NotInitialised))));
}

#[test]
fn config_round_trips() {
  let (dir, s) = store();
  let config = ProvenanceConfig::new("ACME", "WEB").unwrap();
  assert_eq!(s.write_config(&config).unwrap(), CONFIG_PATH);
  assert_eq!(s.load_config().unwrap(), config);
  assert_eq!(read(&dir, CONFIG_PATH)["defaultAppCode"], json!("ACME"));
}

#[test]
fn malformed_config_is_reported() {
  let (dir, s) = store();
  write(&dir, CONFIG_PATH, "{");
  assert!(matches!(s.load_config(), Err(Error::MalformedConfig { .. })));
}

#[test]
fn sequences_round_trip() {
  let (dir, s) = store();
  assert_eq!(s.read_sequences().unwrap(), SequenceMarks::default());

  let mut marks = SequenceMarks::default();
  marks.raise("DEC-ACME-WEB", 7);
  s.write_sequences(&marks).unwrap();
  assert_eq!(s.read_sequences().unwrap(), marks);

  let on_disk = read(&dir, "provenance/sequences.json");
  assert_eq!(on_disk["schema"], json!("provenancecode.sequences@1.0"));
  assert_eq!(on_disk["sequences"]["DEC-ACME-WEB"], json!(7));
}

#[test]
fn register_codes_adds_subprojects() {
  let (dir, s) = store();
  s.ensure_scaffold().unwrap();

  assert!(s.register_codes("ACME", "WEB").unwrap());
  assert!(!s.register_codes("ACME", "WEB").unwrap());

  let codes = read(&dir, "provenance/codes.json");
  assert_eq!(
    codes["projects"]["ACME"]["subprojects"]["WEB"],
    json!({ "name": "WEB", "workspace": "." })
  );
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[test]
fn legacy_repository_migrates_and_validates() {
  let (dir, s) = store();
  write(
    &dir,
    "provenance/decisions/DEC-000001.json",
    &json!({
      "schema": "https://provenancecode.org/schemas/decision.g2.schema.json",
      "decision_id": "DEC-000001",
      "title": "Adopt Rust",
      "status": "accepted",
      "context": "Need speed",
      "decision": "Rust",
      "consequences": "Longer builds",
    })
    .to_string(),
  );
  write(
    &dir,
    "provenance/risks/RSK-000001.json",
    &json!({
      "schema": "https://provenancecode.org/schemas/risk.g2.schema.json",
      "risk_id": "RSK-000001",
      "title": "Hiring",
      "description": "Few Rust developers",
      "severity": "medium",
      "status": "open",
      "linked_decisions": ["DEC-000001"],
    })
    .to_string(),
  );

  let report = migrate(&s, "ACME", "WEB").unwrap();
  assert_eq!((report.decision_count, report.risk_count), (1, 1));
  assert!(!dir.path().join("provenance/decisions/DEC-000001.json").exists());
  assert_eq!(
    read(&dir, "provenance/risks/RA-ACME-WEB-000001.json")["linked_decisions"],
    json!(["DEC-ACME-WEB-000001"])
  );

  let config = s.load_config().unwrap();
  let report = validate(&s, &config).unwrap();
  assert!(report.valid, "{:?}", report.errors);
  assert!(report.warnings.is_empty(), "{:?}", report.warnings);

  assert!(migrate(&s, "ACME", "WEB").unwrap().is_noop());
}

#[test]
fn added_records_survive_reopening() {
  let (dir, s) = store();
  s.ensure_scaffold().unwrap();
  let config = ProvenanceConfig::new("ACME", "WEB").unwrap();
  s.write_config(&config).unwrap();

  let added = add_decision(&s, &config, NewDecision {
    title: "Adopt Rust".to_owned(),
    context: "Need speed".to_owned(),
    decision: "Rust".to_owned(),
    ..NewDecision::default()
  })
  .unwrap();
  assert_eq!(added.decision_id, "DEC-ACME-WEB-000001");

  let reopened = FsStore::open(dir.path()).unwrap();
  assert_eq!(
    next_sequence(&reopened, RecordKind::Decision, "ACME", "WEB").unwrap(),
    "000002"
  );
}
