//! `prvc`, the command-line front end for a repository's decision and risk
//! ledger.
//!
//! # Usage
//!
//! ```
//! prvc init --project ACME --area WEB
//! prvc add decision --title "Adopt Rust" --context "..." --decision "..."
//! prvc validate --mode fail
//! prvc migrate --app-code ACME --area WEB
//! ```

mod commands;
mod render;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand};
use prov_core::{
  config::{DEFAULT_AREA, DEFAULT_PROJECT, ValidationMode},
  record::{DecisionStatus, Probability, RecordKind, RiskStatus, Severity},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "prvc", version, about = "Decision and risk ledger for a repository")]
struct Args {
  /// Repository root containing the `provenance/` directory.
  #[arg(long, env = "PRVC_ROOT", default_value = ".", global = true)]
  root: PathBuf,

  /// Print JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the ledger layout, registries and a config.
  Init {
    #[arg(long, default_value = DEFAULT_PROJECT)]
    project: String,
    #[arg(long, default_value = DEFAULT_AREA)]
    area:    String,
  },

  /// Upgrade legacy ids, file names and schema tags in place.
  Migrate {
    /// Project code for sequence-only legacy ids.
    #[arg(long, default_value = DEFAULT_PROJECT)]
    app_code: String,
    /// Area code for sequence-only legacy ids.
    #[arg(long, default_value = DEFAULT_AREA)]
    area:     String,
  },

  /// Check every record and report errors and warnings.
  Validate {
    /// Override the configured validation mode (`warn` or `fail`).
    #[arg(long)]
    mode:         Option<ValidationMode>,
    /// Require decision references to resolve to existing decisions.
    #[arg(long)]
    resolve_refs: bool,
  },

  /// Print the next free id in a scope. Creates no record, but records the
  /// scope's current high-water mark so the number is never reused.
  NextId {
    #[arg(default_value_t = RecordKind::Decision)]
    kind:    RecordKind,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    area:    Option<String>,
  },

  /// Record a new decision or risk.
  #[command(subcommand)]
  Add(AddCommand),

  /// Search titles and contents.
  Search {
    /// Text to look for. Omit to list everything that passes the filters.
    #[arg(default_value = "")]
    query:  String,
    /// Also match records containing only some of the words.
    #[arg(long)]
    fuzzy:  bool,
    #[arg(long)]
    kind:   Option<RecordKind>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long, default_value_t = 20)]
    limit:  usize,
  },

  /// Print one record.
  Show { id: String },

  /// Show what links to and from a decision.
  Related { id: String },

  /// Read or change the ledger config.
  #[command(subcommand)]
  Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum AddCommand {
  Decision {
    #[arg(long)]
    title:        String,
    #[arg(long)]
    context:      String,
    #[arg(long)]
    decision:     String,
    #[arg(long)]
    consequences: Option<String>,
    #[arg(long, default_value_t = DecisionStatus::Draft)]
    status:       DecisionStatus,
    #[arg(long)]
    project:      Option<String>,
    #[arg(long)]
    area:         Option<String>,
    /// Id of a related decision; repeatable.
    #[arg(long = "link")]
    links:        Vec<String>,
    #[arg(long = "author")]
    authors:      Vec<String>,
    #[arg(long = "tag")]
    tags:         Vec<String>,
  },
  Risk {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value_t = Severity::Medium)]
    severity:    Severity,
    #[arg(long, default_value_t = RiskStatus::Open)]
    status:      RiskStatus,
    #[arg(long)]
    probability: Option<Probability>,
    #[arg(long)]
    impact:      Option<String>,
    #[arg(long)]
    mitigation:  Option<String>,
    #[arg(long)]
    owner:       Option<String>,
    /// Id of a decision that introduced this risk; repeatable.
    #[arg(long = "decision")]
    decisions:   Vec<String>,
    #[arg(long)]
    project:     Option<String>,
    #[arg(long)]
    area:        Option<String>,
    #[arg(long = "tag")]
    tags:        Vec<String>,
  },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
  /// Print the whole config.
  List,
  /// Print one value, e.g. `validation.mode`.
  Get { key: String },
  /// Change `defaultAppCode`, `defaultArea`, `validation.mode` or
  /// `validation.resolveReferences`.
  Set { key: String, value: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let passed = commands::run(args)?;
  Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
