//! Sequence allocation per (kind, project, area) scope.
//!
//! The next sequence is one past the highest number ever seen in the scope:
//! the maximum over the ids currently in the store and the high-water mark
//! kept in the store's sequence registry. Deleting records therefore never
//! frees a number for reuse.

use tracing::debug;

use crate::{
  Error, Result,
  id::{RecordId, format_sequence, scope_prefix},
  record::RecordKind,
  store::{RecordStore, StoredDocument},
};

/// Largest sequence that fits the six-digit grammar.
pub const MAX_SEQUENCE: u32 = 999_999;

/// Registry key for a scope, e.g. `DEC-ACME-WEB`.
pub fn scope_key(kind: RecordKind, project: &str, area: &str) -> String {
  format!("{}-{project}-{area}", kind.prefix())
}

/// Highest sequence among `documents` whose id lies in the scope.
///
/// Malformed documents, ids outside the scope and non-numeric trailing
/// segments are ignored.
pub fn max_observed(
  documents: &[StoredDocument],
  kind: RecordKind,
  project: &str,
  area: &str,
) -> u32 {
  let prefix = scope_prefix(kind, project, area);
  documents
    .iter()
    .filter_map(|doc| doc.id(kind))
    .filter_map(|id| id.strip_prefix(prefix.as_str()))
    .filter(|seq| !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()))
    .filter_map(|seq| seq.parse::<u32>().ok())
    .max()
    .unwrap_or(0)
}

/// The next sequence for a scope, computed from `documents` alone. `None`
/// once the scope has run out of six-digit numbers.
pub fn next_sequence_in(
  documents: &[StoredDocument],
  kind: RecordKind,
  project: &str,
  area: &str,
) -> Option<String> {
  let next = max_observed(documents, kind, project, area).saturating_add(1);
  (next <= MAX_SEQUENCE).then(|| format_sequence(next))
}

/// The next unused sequence for a scope, zero-padded to six digits.
///
/// Raises the scope's high-water mark to the largest sequence currently in
/// the store, so a later deletion of that record does not lower the result.
/// Errors if the scope has run out of six-digit numbers.
pub fn next_sequence<S: RecordStore>(
  store: &S,
  kind: RecordKind,
  project: &str,
  area: &str,
) -> Result<String> {
  Ok(format_sequence(peek(store, kind, project, area)?))
}

/// Like [`next_sequence`], returning the full id.
pub fn allocate<S: RecordStore>(
  store: &S,
  kind: RecordKind,
  project: &str,
  area: &str,
) -> Result<RecordId> {
  let sequence = peek(store, kind, project, area)?;
  Ok(RecordId {
    kind,
    project: project.to_owned(),
    area: area.to_owned(),
    sequence,
  })
}

/// Record that `id` has been written, so its sequence is never handed out
/// again.
pub fn commit<S: RecordStore>(store: &S, id: &RecordId) -> Result<()> {
  let mut marks = store.read_sequences().map_err(Error::store)?;
  if marks.raise(&scope_key(id.kind, &id.project, &id.area), id.sequence) {
    store.write_sequences(&marks).map_err(Error::store)?;
  }
  Ok(())
}

fn peek<S: RecordStore>(store: &S, kind: RecordKind, project: &str, area: &str) -> Result<u32> {
  let documents = store.list(kind).map_err(Error::store)?;
  let observed = max_observed(&documents, kind, project, area);

  let scope = scope_key(kind, project, area);
  let mut marks = store.read_sequences().map_err(Error::store)?;
  if marks.raise(&scope, observed) {
    debug!(%scope, observed, "raising sequence high-water mark");
    store.write_sequences(&marks).map_err(Error::store)?;
  }

  let next = marks.get(&scope).saturating_add(1);
  if next > MAX_SEQUENCE {
    return Err(Error::SequenceExhausted(scope));
  }
  Ok(next)
}
