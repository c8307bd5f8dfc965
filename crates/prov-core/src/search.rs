//! Text search over a loaded [`Ledger`].

use serde::Serialize;

use crate::{
  ledger::Ledger,
  record::{Record, RecordKind},
};

/// Score of a record whose serialized form contains the query.
pub const MATCH_SCORE: u32 = 100;
/// Added when the title itself contains the query.
pub const TITLE_BONUS: u32 = 100;
/// Ceiling of a fuzzy (per-word) score.
pub const FUZZY_SCORE: u32 = 50;
/// Characters of context kept either side of a title match.
pub const HIGHLIGHT_CONTEXT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
  /// Also match records containing only some of the query's words.
  pub fuzzy:  bool,
  pub kind:   Option<RecordKind>,
  /// Case-insensitive status filter.
  pub status: Option<String>,
  pub limit:  usize,
}

impl Default for SearchOptions {
  fn default() -> Self { Self { fuzzy: false, kind: None, status: None, limit: 20 } }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
  #[serde(skip)]
  pub record:    Record,
  pub id:        String,
  pub kind:      RecordKind,
  pub title:     String,
  pub score:     u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub highlight: Option<String>,
}

/// Rank records against `query`, best first (ties by id).
///
/// An empty query matches every record that passes the filters, with a
/// score of zero.
pub fn search(ledger: &Ledger, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
  let query = query.trim().to_lowercase();
  let words: Vec<&str> = query.split_whitespace().collect();

  let mut hits: Vec<SearchHit> = ledger
    .records()
    .filter(|r| options.kind.is_none_or(|k| r.kind() == k))
    .filter(|r| {
      options
        .status
        .as_deref()
        .is_none_or(|s| r.status().eq_ignore_ascii_case(s))
    })
    .filter_map(|record| {
      let (score, highlight) = score(&record, &query, &words, options.fuzzy)?;
      Some(SearchHit {
        id: record.id().to_owned(),
        kind: record.kind(),
        title: record.title().to_owned(),
        score,
        highlight,
        record,
      })
    })
    .collect();

  hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
  hits.truncate(options.limit);
  hits
}

fn score(record: &Record, query: &str, words: &[&str], fuzzy: bool) -> Option<(u32, Option<String>)> {
  if query.is_empty() {
    return Some((0, None));
  }

  let haystack = record.to_value().ok()?.to_string().to_lowercase();
  if haystack.contains(query) {
    let highlight = highlight(record.title(), query);
    let bonus = if highlight.is_some() { TITLE_BONUS } else { 0 };
    return Some((MATCH_SCORE + bonus, highlight));
  }

  if fuzzy && !words.is_empty() {
    let matched = words.iter().filter(|w| haystack.contains(**w)).count();
    if matched > 0 {
      let score = (matched as u32 * FUZZY_SCORE) / words.len() as u32;
      return Some((score.max(1), None));
    }
  }

  None
}

/// The part of `title` around the first case-insensitive occurrence of
/// `query`, with `...` marking cut ends.
fn highlight(title: &str, query: &str) -> Option<String> {
  let chars: Vec<char> = title.chars().collect();
  let start = title
    .char_indices()
    .position(|(i, _)| title[i..].to_lowercase().starts_with(query))?;
  let len = query.chars().count();

  let from = start.saturating_sub(HIGHLIGHT_CONTEXT);
  let to = (start + len + HIGHLIGHT_CONTEXT).min(chars.len());

  let mut out = String::new();
  if from > 0 {
    out.push_str("...");
  }
  out.extend(&chars[from..to]);
  if to < chars.len() {
    out.push_str("...");
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn highlight_trims_long_titles() {
    let title = "A very long decision title that mentions postgres somewhere in the middle of it";
    let got = highlight(title, "postgres").unwrap();
    assert!(got.starts_with("..."));
    assert!(got.ends_with("..."));
    assert!(got.contains("postgres"));
  }

  #[test]
  fn highlight_is_case_insensitive() {
    assert_eq!(highlight("Use Postgres", "postgres").as_deref(), Some("Use Postgres"));
    assert_eq!(highlight("Use Postgres", "mysql"), None);
  }
}
