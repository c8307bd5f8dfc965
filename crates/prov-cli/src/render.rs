//! Text and JSON output for each command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use prov_core::{
  config::ProvenanceConfig,
  ledger::Related,
  migrate::MigrationReport,
  record::{DecisionRecord, Record, RiskRecord},
  search::SearchHit,
  validate::{Finding, ValidationReport},
};
use serde::Serialize;
use serde_json::Value;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn day(date: Option<DateTime<Utc>>) -> String {
  date.map_or_else(|| "-".to_owned(), |d| d.format("%Y-%m-%d").to_string())
}

fn decision_line(d: &DecisionRecord) -> String {
  format!("  {}  [{}]  {}  ({})", d.decision_id, d.status, d.title, day(d.date_created))
}

fn risk_line(r: &RiskRecord) -> String {
  format!("  {}  [{}/{}]  {}", r.risk_id, r.severity, r.status, r.title)
}

// ─── Commands ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Created<'a> {
  created: &'a [String],
}

pub fn created(files: &[String], json: bool) -> Result<()> {
  if json {
    return print_json(&Created { created: files });
  }
  if files.is_empty() {
    println!("Ledger already initialised; nothing to create.");
  }
  for file in files {
    println!("created {file}");
  }
  Ok(())
}

pub fn migration(report: &MigrationReport, json: bool) -> Result<()> {
  if json {
    return print_json(report);
  }
  if report.is_noop() && report.skipped.is_empty() {
    println!("Nothing to migrate.");
    return Ok(());
  }
  println!(
    "Migrated {} decision(s) and {} risk(s).",
    report.decision_count, report.risk_count
  );
  for file in &report.created_files {
    println!("  created {file}");
  }
  for file in &report.updated_files {
    println!("  updated {file}");
  }
  for skipped in &report.skipped {
    println!("  skipped {}: {}", skipped.path, skipped.reason);
  }
  Ok(())
}

fn finding_line(level: &str, finding: &Finding) -> String {
  format!("{level} [{}] {}: {}", finding.category, finding.file, finding.message)
}

pub fn validation(report: &ValidationReport, json: bool) -> Result<()> {
  if json {
    return print_json(report);
  }
  for finding in &report.errors {
    println!("{}", finding_line("error", finding));
  }
  for finding in &report.warnings {
    println!("{}", finding_line("warning", finding));
  }
  println!(
    "Checked {} decision(s) and {} risk(s): {} error(s), {} warning(s).",
    report.decisions_checked,
    report.risks_checked,
    report.errors.len(),
    report.warnings.len()
  );
  Ok(())
}

pub fn added(record: &Record, json: bool) -> Result<()> {
  if json {
    return print_json(&record.to_value()?);
  }
  println!("Added {} ({})", record.id(), record.file_name());
  Ok(())
}

pub fn record(record: &Record) -> Result<()> { print_json(&record.to_value()?) }

pub fn hits(hits: &[SearchHit], json: bool) -> Result<()> {
  if json {
    return print_json(hits);
  }
  if hits.is_empty() {
    println!("No matches.");
  }
  for hit in hits {
    println!("{:>4}  {}  {}", hit.score, hit.id, hit.title);
    if let Some(highlight) = &hit.highlight {
      println!("        {highlight}");
    }
  }
  Ok(())
}

pub fn related(related: &Related<'_>, json: bool) -> Result<()> {
  if json {
    return print_json(related);
  }
  println!("{}", decision_line(related.decision).trim_start());

  println!("Linked decisions:");
  related.linked.iter().for_each(|d| println!("{}", decision_line(d)));
  println!("Risks:");
  related.risks.iter().for_each(|r| println!("{}", risk_line(r)));
  println!("Sharing a tag:");
  related.shared_tags.iter().for_each(|d| println!("{}", decision_line(d)));
  Ok(())
}

pub fn config(config: &ProvenanceConfig, json: bool) -> Result<()> {
  if json {
    return print_json(config);
  }
  println!("standard        {}", config.standard);
  println!("project         {}", config.default_project);
  println!("area            {}", config.default_area);
  println!("decisions       {}", config.paths.decisions);
  println!("risks           {}", config.paths.risks);
  println!("validation      {}", config.validation.mode);
  println!("resolve refs    {}", config.validation.resolve_references);
  Ok(())
}

pub fn value(value: &Value) -> Result<()> {
  match value {
    Value::String(s) => println!("{s}"),
    other => println!("{}", serde_json::to_string_pretty(other)?),
  }
  Ok(())
}
