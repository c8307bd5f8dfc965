//! One function per subcommand.

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use prov_core::{
  config::{ProvenanceConfig, ValidationMode, checked_code},
  ledger::{Ledger, NewDecision, NewRisk, add_decision, add_risk},
  migrate::migrate,
  record::{Link, LinkKind, Record},
  search::{SearchOptions, search},
  sequence::next_sequence,
  store::{Document, RecordStore},
  validate::validate,
};
use prov_store_fs::FsStore;
use tracing::warn;

use crate::{AddCommand, Args, Command, ConfigCommand, render};

/// Run one command. Returns `false` when validation fails under the active
/// mode.
pub fn run(args: Args) -> Result<bool> {
  let repairs_config = matches!(args.command, Command::Init { .. } | Command::Migrate { .. });
  let store = open_store(&args.root, repairs_config)
    .with_context(|| format!("failed to open ledger at {}", args.root.display()))?;
  let json = args.json;

  match args.command {
    Command::Init { project, area } => init(&store, &project, &area, json)?,
    Command::Migrate { app_code, area } => {
      let report = migrate(&store, &app_code, &area).context("migration failed")?;
      render::migration(&report, json)?;
    }
    Command::Validate { mode, resolve_refs } => {
      return validate_ledger(&store, mode, resolve_refs, json);
    }
    Command::NextId { kind, project, area } => {
      let config = load_config(&store)?;
      let project = project.unwrap_or(config.default_project);
      let area = area.unwrap_or(config.default_area);
      let project = checked_code("project", &project)?;
      let area = checked_code("area", &area)?;
      let sequence = next_sequence(&store, kind, &project, &area)?;
      println!("{}-{project}-{area}-{sequence}", kind.prefix());
    }
    Command::Add(add) => add_record(&store, add, json)?,
    Command::Search { query, fuzzy, kind, status, limit } => {
      let ledger = Ledger::load(&store)?;
      let options = SearchOptions { fuzzy, kind, status, limit };
      render::hits(&search(&ledger, &query, &options), json)?;
    }
    Command::Show { id } => {
      let ledger = Ledger::load(&store)?;
      let Some(record) = ledger.find(&id) else {
        bail!(prov_core::Error::RecordNotFound(id));
      };
      render::record(&record)?;
    }
    Command::Related { id } => {
      let ledger = Ledger::load(&store)?;
      render::related(&ledger.related(&id)?, json)?;
    }
    Command::Config(command) => config(&store, command, json)?,
  }

  Ok(true)
}

/// Open the ledger at `root`. With `repairs_config`, an unreadable config
/// falls back to the default layout so the command can rewrite it.
fn open_store(root: &Path, repairs_config: bool) -> Result<FsStore, prov_store_fs::Error> {
  match FsStore::open(root) {
    Err(
      err @ (prov_store_fs::Error::MalformedConfig { .. }
      | prov_store_fs::Error::Core(prov_core::Error::Serialization(_))),
    ) if repairs_config => {
      warn!(%err, "config is unreadable; using the default layout");
      Ok(FsStore::new(root))
    }
    other => other,
  }
}

/// The config, or the defaults when the ledger has none yet.
fn load_config(store: &FsStore) -> Result<ProvenanceConfig> {
  match store.load_config() {
    Ok(config) => Ok(config),
    Err(prov_store_fs::Error::Core(prov_core::Error::NotInitialised)) => {
      warn!("no config found; using defaults (run `prvc init`)");
      Ok(ProvenanceConfig::default())
    }
    Err(err) => Err(err).context("failed to load config"),
  }
}

fn init(store: &FsStore, project: &str, area: &str, json: bool) -> Result<()> {
  let fresh = ProvenanceConfig::new(project, area)?;
  let mut created = store.ensure_scaffold()?;

  let config = match store.read_config()? {
    None => {
      created.push(store.write_config(&fresh)?);
      fresh
    }
    Some(Document::Parsed(value)) => match ProvenanceConfig::from_value(value.clone()) {
      Ok(config) => config,
      Err(err) => {
        warn!(%err, "config does not match the config model; normalizing it");
        let config = ProvenanceConfig::normalized(Some(&value), project, area)?;
        store.write_config(&config)?;
        config
      }
    },
    Some(Document::Malformed(reason)) => {
      warn!(%reason, "config is not valid JSON; replacing it");
      store.write_config(&fresh)?;
      fresh
    }
  };

  store.register_codes(&config.default_project, &config.default_area)?;
  render::created(&created, json)
}

fn validate_ledger(
  store: &FsStore,
  mode: Option<ValidationMode>,
  resolve_refs: bool,
  json: bool,
) -> Result<bool> {
  let mut config = load_config(store)?;
  config.validation.resolve_references |= resolve_refs;
  let mode = mode.unwrap_or(config.validation.mode);

  let report = validate(store, &config).context("validation could not run")?;
  render::validation(&report, json)?;

  Ok(mode.passes(&report))
}

fn add_record(store: &FsStore, command: AddCommand, json: bool) -> Result<()> {
  let config = load_config(store)?;

  let record = match command {
    AddCommand::Decision {
      title,
      context,
      decision,
      consequences,
      status,
      project,
      area,
      links,
      authors,
      tags,
    } => {
      let links = links
        .into_iter()
        .map(|url| Link { kind: LinkKind::Decision, url, title: None })
        .collect();
      let new = NewDecision {
        title,
        context,
        decision,
        consequences,
        status,
        project,
        area,
        links,
        authors,
        tags,
      };
      Record::Decision(add_decision(store, &config, new)?)
    }
    AddCommand::Risk {
      title,
      description,
      severity,
      status,
      probability,
      impact,
      mitigation,
      owner,
      decisions,
      project,
      area,
      tags,
    } => {
      let new = NewRisk {
        title,
        description,
        severity,
        status,
        probability,
        impact,
        mitigation,
        owner,
        linked_decisions: decisions,
        project,
        area,
        tags,
      };
      Record::Risk(add_risk(store, &config, new)?)
    }
  };

  render::added(&record, json)
}

fn config(store: &FsStore, command: ConfigCommand, json: bool) -> Result<()> {
  match command {
    ConfigCommand::List => render::config(&load_config(store)?, json),
    ConfigCommand::Get { key } => {
      let Some(value) = load_config(store)?.get(&key)? else {
        bail!("unknown config key {key:?}");
      };
      render::value(&value)
    }
    ConfigCommand::Set { key, value } => {
      let mut config = store.load_config().context("failed to load config")?;
      match key.as_str() {
        "defaultAppCode" | "defaultProject" | "project" => config.set_project(&value)?,
        "defaultArea" | "area" => config.set_area(&value)?,
        "validation.mode" | "mode" => config.set_mode(&value)?,
        "validation.resolveReferences" => {
          config.validation.resolve_references = value
            .parse()
            .with_context(|| format!("expected true or false, got {value:?}"))?;
        }
        other => bail!("config key {other:?} cannot be set"),
      }
      store.write_config(&config)?;
      store.register_codes(&config.default_project, &config.default_area)?;
      render::config(&config, json)
    }
  }
}

#[cfg(test)]
mod tests {
  use clap::Parser as _;
  use prov_core::record::RecordKind;
  use tempfile::TempDir;

  use super::*;

  fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("prvc").chain(args.iter().copied())).unwrap()
  }

  fn run_in(dir: &TempDir, args: &[&str]) -> bool {
    let root = dir.path().to_str().unwrap();
    let mut full = vec!["--root", root];
    full.extend_from_slice(args);
    run(parse(&full)).unwrap()
  }

  #[test]
  fn parses_nested_subcommands() {
    let args = parse(&["add", "risk", "--title", "t", "--description", "d", "--decision", "X"]);
    let Command::Add(AddCommand::Risk { decisions, .. }) = args.command else {
      panic!("expected add risk");
    };
    assert_eq!(decisions, vec!["X".to_owned()]);

    let args = parse(&["validate", "--mode", "fail", "--resolve-refs"]);
    assert!(matches!(
      args.command,
      Command::Validate { mode: Some(ValidationMode::Fail), resolve_refs: true }
    ));

    let args = parse(&["next-id", "risk"]);
    assert!(matches!(args.command, Command::NextId { kind: RecordKind::Risk, .. }));
  }

  #[test]
  fn fail_mode_fails_only_on_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_in(&dir, &["init", "--project", "ACME", "--area", "WEB"]));
    assert!(run_in(&dir, &["validate", "--mode", "fail"]));

    let bad = dir.path().join("provenance/decisions/DEC-1.json");
    std::fs::write(bad, "{").unwrap();
    assert!(run_in(&dir, &["validate"]));
    assert!(!run_in(&dir, &["validate", "--mode", "fail"]));
  }

  #[test]
  fn migrate_repairs_an_unreadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let provenance = dir.path().join("provenance");
    std::fs::create_dir_all(provenance.join("decisions")).unwrap();
    std::fs::write(provenance.join("provenance.config.json"), "{ not json").unwrap();
    let legacy = serde_json::json!({
      "schema": "https://provenancecode.org/schemas/decision.g2.schema.json",
      "decision_id": "DEC-000001",
      "title": "Adopt Rust",
      "status": "accepted",
      "context": "Need speed",
      "decision": "Rust",
    });
    std::fs::write(provenance.join("decisions/DEC-000001.json"), legacy.to_string()).unwrap();

    assert!(run_in(&dir, &["migrate", "--app-code", "ACME", "--area", "WEB"]));
    assert!(provenance.join("decisions/DEC-ACME-WEB-000001.json").is_file());
    assert!(!provenance.join("decisions/DEC-000001.json").exists());

    let store = FsStore::open(dir.path()).unwrap();
    assert_eq!(store.load_config().unwrap().default_project, "ACME");
    assert!(run_in(&dir, &["validate", "--mode", "fail"]));
  }

  #[test]
  fn init_repairs_an_unreadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("provenance/provenance.config.json");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, r#"{ "defaultArea": "API", "paths": 7 }"#).unwrap();

    assert!(run_in(&dir, &["init", "--project", "SHOP"]));
    let loaded = FsStore::open(dir.path()).unwrap().load_config().unwrap();
    assert_eq!((loaded.default_project.as_str(), loaded.default_area.as_str()), ("SHOP", "API"));
  }

  #[test]
  fn config_set_registers_codes() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_in(&dir, &["init"]));
    assert!(run_in(&dir, &["config", "set", "defaultArea", "api"]));

    let store = FsStore::new(dir.path());
    assert_eq!(store.load_config().unwrap().default_area, "API");
    let codes = std::fs::read_to_string(dir.path().join("provenance/codes.json")).unwrap();
    let codes: serde_json::Value = serde_json::from_str(&codes).unwrap();
    assert!(codes["projects"]["PROJ"]["subprojects"]["API"].is_object());
  }
}
