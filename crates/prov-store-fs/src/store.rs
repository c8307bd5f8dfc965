//! [`FsStore`], the filesystem implementation of [`RecordStore`].

use std::{
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use prov_core::{
  config::{Paths, ProvenanceConfig},
  record::{DecisionRecord, RecordKind, RiskRecord},
  schema::BUNDLED_SCHEMAS,
  store::{Document, RecordStore, SequenceMarks, StoredDocument},
};
use serde_json::Value;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{
    CodeRegistry, decode_codes, decode_document, decode_sequences, encode_codes, encode_pretty,
    encode_sequences,
  },
  layout::{CODES_FILE, CONFIG_PATH, Layout, README, README_FILE, SEQUENCES_FILE, TEMPLATE_FILE},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ledger rooted at a repository directory.
#[derive(Debug, Clone)]
pub struct FsStore {
  layout: Layout,
}

impl FsStore {
  /// A store using the default `provenance/` layout under `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self::with_paths(root, Paths::default()) }

  pub fn with_paths(root: impl Into<PathBuf>, paths: Paths) -> Self {
    Self { layout: Layout::new(root.into(), paths) }
  }

  /// Open the ledger under `root`, honouring the directory layout in its
  /// config when one exists and parses.
  pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let store = Self::new(root);
    match store.load_config() {
      Ok(config) => Ok(Self::with_paths(store.layout.root().to_owned(), config.paths)),
      Err(Error::Core(prov_core::Error::NotInitialised)) => Ok(store),
      Err(err) => Err(err),
    }
  }

  pub fn root(&self) -> &Path { self.layout.root() }

  /// Read and parse the config. Fails with `NotInitialised` if there is
  /// none.
  pub fn load_config(&self) -> Result<ProvenanceConfig> {
    match self.read_config()? {
      None => Err(prov_core::Error::NotInitialised.into()),
      Some(Document::Malformed(reason)) => {
        Err(Error::MalformedConfig { path: CONFIG_PATH.to_owned(), reason })
      }
      Some(Document::Parsed(value)) => Ok(ProvenanceConfig::from_value(value)?),
    }
  }

  /// Record the `project`/`area` pair in the code registry. Returns `true`
  /// if the registry changed.
  pub fn register_codes(&self, project: &str, area: &str) -> Result<bool> {
    let relative = self.layout.in_root(CODES_FILE);
    let mut registry = match self.read_text(&relative)? {
      Some(text) => decode_codes(&text)?,
      None => CodeRegistry::default(),
    };
    if !registry.register(project, area) {
      return Ok(false);
    }
    self.write_text(&relative, &encode_codes(&registry)?)?;
    Ok(true)
  }

  // ── File helpers ──────────────────────────────────────────────────────

  /// Contents of a repository-relative file; `None` if it does not exist.
  fn read_text(&self, relative: &str) -> Result<Option<String>> {
    let path = self.layout.absolute(relative);
    match fs::read_to_string(&path) {
      Ok(text) => Ok(Some(text)),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(err) => Err(Error::io("read", path)(err)),
    }
  }

  fn write_text(&self, relative: &str, contents: &str) -> Result<()> {
    let path = self.layout.absolute(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(Error::io("create directory", parent))?;
    }
    fs::write(&path, contents).map_err(Error::io("write", &path))?;
    debug!(path = relative, "wrote file");
    Ok(())
  }

  /// Write `contents` only if nothing exists at `relative` yet. Returns
  /// `true` if the file was created.
  fn create_new(&self, relative: &str, contents: &str) -> Result<bool> {
    let path = self.layout.absolute(relative);
    let file = fs::OpenOptions::new().write(true).create_new(true).open(&path);
    let mut file = match file {
      Ok(file) => file,
      Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
      Err(err) => return Err(Error::io("create", path)(err)),
    };
    file.write_all(contents.as_bytes()).map_err(Error::io("write", &path))?;
    debug!(path = relative, "created file");
    Ok(true)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for FsStore {
  type Error = Error;

  fn list(&self, kind: RecordKind) -> Result<Vec<StoredDocument>> {
    let dir = self.layout.absolute(self.layout.kind_dir(kind));
    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(err) => return Err(Error::io("list", dir)(err)),
    };

    let mut names = Vec::new();
    for entry in entries {
      let entry = entry.map_err(Error::io("list", &dir))?;
      if !entry.file_type().map_err(Error::io("stat", entry.path()))?.is_file() {
        continue;
      }
      let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
        continue;
      };
      if name.ends_with(".json") && name != TEMPLATE_FILE {
        names.push(name);
      }
    }
    names.sort();

    let mut documents = Vec::with_capacity(names.len());
    for name in names {
      let relative = self.layout.record(kind, &name);
      let path = self.layout.absolute(&relative);
      let body = match fs::read_to_string(&path) {
        Ok(text) => decode_document(&text),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
          Document::Malformed("file is not valid UTF-8".to_owned())
        }
        Err(err) => return Err(Error::io("read", path)(err)),
      };
      documents.push(StoredDocument { name, path: relative, body });
    }
    Ok(documents)
  }

  fn put(&self, kind: RecordKind, name: &str, document: &Value) -> Result<String> {
    let relative = self.layout.record(kind, name);
    self.write_text(&relative, &encode_pretty(document)?)?;
    Ok(relative)
  }

  fn remove(&self, kind: RecordKind, name: &str) -> Result<()> {
    let relative = self.layout.record(kind, name);
    let path = self.layout.absolute(&relative);
    match fs::remove_file(&path) {
      Ok(()) => {
        debug!(path = relative, "removed file");
        Ok(())
      }
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(err) => Err(Error::io("remove", path)(err)),
    }
  }

  fn read_config(&self) -> Result<Option<Document>> {
    Ok(self.read_text(CONFIG_PATH)?.map(|text| decode_document(&text)))
  }

  fn write_config(&self, config: &ProvenanceConfig) -> Result<String> {
    self.write_text(CONFIG_PATH, &encode_pretty(config)?)?;
    Ok(CONFIG_PATH.to_owned())
  }

  fn ensure_scaffold(&self) -> Result<Vec<String>> {
    for dir in self.layout.directories() {
      let path = self.layout.absolute(dir);
      fs::create_dir_all(&path).map_err(Error::io("create directory", path))?;
    }

    let mut files = vec![
      (self.layout.record(RecordKind::Decision, TEMPLATE_FILE), encode_pretty(&DecisionRecord::template())?),
      (self.layout.record(RecordKind::Risk, TEMPLATE_FILE), encode_pretty(&RiskRecord::template())?),
      (self.layout.in_root(CODES_FILE), encode_codes(&CodeRegistry::default())?),
      (self.layout.in_root(SEQUENCES_FILE), encode_sequences(&SequenceMarks::default())?),
      (self.layout.in_root(README_FILE), README.to_owned()),
    ];
    for (name, schema) in BUNDLED_SCHEMAS {
      files.push((self.layout.in_schemas(name), schema.to_owned()));
    }

    let mut created = Vec::new();
    for (relative, contents) in files {
      if self.create_new(&relative, &contents)? {
        created.push(relative);
      }
    }
    Ok(created)
  }

  fn read_sequences(&self) -> Result<SequenceMarks> {
    Ok(
      self
        .read_text(&self.layout.in_root(SEQUENCES_FILE))?
        .map(|text| decode_sequences(&text))
        .unwrap_or_default(),
    )
  }

  fn write_sequences(&self, marks: &SequenceMarks) -> Result<()> {
    self.write_text(&self.layout.in_root(SEQUENCES_FILE), &encode_sequences(marks)?)
  }
}
