//! Team record flattening: nested API JSON to long-form [`MetricRow`]s.
//!
//! A team record is walked in three parts:
//!
//! - **static fields**: a configured list of scalar fields per category
//!   (Team Info, Bye Weeks), each renamed to a display label;
//! - **team stats**: every scalar under `teamStats`, discovered dynamically;
//! - **top performers**: the rank-1 entry of every metric under
//!   `topPerformers`.
//!
//! Nothing here fails for a bad value. Missing fields and non-numeric values
//! are reported as [`Diagnostic`]s alongside the rows.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  coerce::{describe, to_finite},
  json::Node,
  row::{Category, MetricRow},
};

// ─── Layout ──────────────────────────────────────────────────────────────────

/// One static field: where to read it and what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticField {
  /// Dotted source path, e.g. `byeWeeks.2023`.
  pub source: String,
  /// `Level2` label; defaults to the source path.
  #[serde(default)]
  pub label:  Option<String>,
}

impl StaticField {
  pub fn plain(source: &str) -> Self { Self { source: source.to_owned(), label: None } }

  pub fn renamed(source: &str, label: &str) -> Self {
    Self { source: source.to_owned(), label: Some(label.to_owned()) }
  }

  pub fn label(&self) -> &str { self.label.as_deref().unwrap_or(&self.source) }
}

/// A fixed list of fields emitted under one `Level1` category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticGroup {
  pub level1: Category,
  pub fields: Vec<StaticField>,
}

/// The hand-specified part of the team layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StaticLayout {
  pub groups: Vec<StaticGroup>,
}

impl Default for StaticLayout {
  fn default() -> Self {
    let info = ["teamName", "teamCity", "conference", "division", "wins", "loss"];
    Self {
      groups: vec![
        StaticGroup {
          level1: Category::TeamInfo,
          fields: info.into_iter().map(StaticField::plain).collect(),
        },
        StaticGroup {
          level1: Category::ByeWeeks,
          fields: (2022..=2024)
            .map(|year| {
              StaticField::renamed(&format!("byeWeeks.{year}"), &format!("{year}-Byes"))
            })
            .collect(),
        },
      ],
    }
  }
}

// ─── Diagnostics ─────────────────────────────────────────────────────────────

/// A non-fatal problem found while flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
  /// A configured static field or section is absent for this team.
  MissingField { team_id: String, field: String },
  /// A value could not be coerced; the row was kept with a null value.
  NonNumeric { team_id: String, category: Category, label: String, raw: String },
  /// A section had the wrong JSON type and was skipped.
  UnexpectedType { team_id: String, detail: String },
  /// A whole record was skipped.
  SkippedRecord { index: usize, reason: String },
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Diagnostic::MissingField { team_id, field } => {
        write!(f, "teamID {team_id}: missing field {field}")
      }
      Diagnostic::NonNumeric { team_id, category, label, raw } => {
        write!(f, "teamID {team_id}: non-numeric value {raw:?} for {category}/{label}")
      }
      Diagnostic::UnexpectedType { team_id, detail } => write!(f, "teamID {team_id}: {detail}"),
      Diagnostic::SkippedRecord { index, reason } => write!(f, "record {index} skipped: {reason}"),
    }
  }
}

/// Rows plus whatever was noticed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened<T> {
  pub rows:        Vec<T>,
  pub diagnostics: Vec<Diagnostic>,
}

impl<T> Default for Flattened<T> {
  fn default() -> Self { Self { rows: Vec::new(), diagnostics: Vec::new() } }
}

impl<T> Flattened<T> {
  pub fn extend(&mut self, other: Flattened<T>) {
    self.rows.extend(other.rows);
    self.diagnostics.extend(other.diagnostics);
  }
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// Normalise a metric name into a `Level2` label: capitalise the first letter
/// of each whitespace-separated word and concatenate. The rest of each word
/// is kept as-is, so `rushYds` becomes `RushYds` and `rush yds` becomes
/// `RushYds` too.
pub fn normalize_label(raw: &str) -> String {
  raw
    .split_whitespace()
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
      }
    })
    .collect()
}

/// Visit every terminal value below `map`, passing the key path to reach it.
///
/// Objects are descended into; anything else (including arrays) is a leaf.
/// Iteration follows the map's key order, so it is deterministic for a given
/// payload.
pub fn walk_scalars<'a, F>(map: &'a Map<String, Value>, visit: &mut F)
where
  F: FnMut(&[&'a str], &'a Value),
{
  fn go<'a, F>(map: &'a Map<String, Value>, path: &mut Vec<&'a str>, visit: &mut F)
  where
    F: FnMut(&[&'a str], &'a Value),
  {
    for (key, value) in map {
      path.push(key);
      match value {
        Value::Object(inner) => go(inner, path, visit),
        leaf => visit(path, leaf),
      }
      path.pop();
    }
  }

  go(map, &mut Vec::new(), visit);
}

/// Label for a stat reached at `path` (category first), without the category
/// unless it is the only segment.
fn short_label(path: &[&str]) -> String {
  match path {
    [] => String::new(),
    [only] => normalize_label(only),
    [_category, rest @ ..] => rest.iter().map(|seg| normalize_label(seg)).collect(),
  }
}

/// Labels for the stats reached at `paths`, in order. A short label shared by
/// two or more paths keeps its category in front, so `Passing.yds` and
/// `Rushing.yds` become `PassingYds` and `RushingYds`.
fn stat_labels(paths: &[Vec<&str>]) -> Vec<String> {
  let short: Vec<String> = paths.iter().map(|path| short_label(path)).collect();
  let mut uses: BTreeMap<&str, usize> = BTreeMap::new();
  for label in &short {
    *uses.entry(label.as_str()).or_default() += 1;
  }

  paths
    .iter()
    .zip(&short)
    .map(|(path, label)| match uses.get(label.as_str()) {
      Some(&n) if n > 1 => path.iter().map(|seg| normalize_label(seg)).collect(),
      _ => label.clone(),
    })
    .collect()
}

// ─── Flattening ──────────────────────────────────────────────────────────────

struct TeamCtx<'a> {
  team_id:   &'a str,
  data_date: NaiveDate,
  out:       Flattened<MetricRow>,
}

impl TeamCtx<'_> {
  fn coerce(&mut self, category: Category, label: &str, raw: &Value) -> Option<f64> {
    let value = to_finite(raw);
    if value.is_none() {
      self.out.diagnostics.push(Diagnostic::NonNumeric {
        team_id: self.team_id.to_owned(),
        category,
        label: label.to_owned(),
        raw: describe(raw),
      });
    }
    value
  }

  fn missing(&mut self, field: impl Into<String>) {
    self
      .out
      .diagnostics
      .push(Diagnostic::MissingField { team_id: self.team_id.to_owned(), field: field.into() });
  }

  fn unexpected(&mut self, err: Error) {
    self
      .out
      .diagnostics
      .push(Diagnostic::UnexpectedType { team_id: self.team_id.to_owned(), detail: err.to_string() });
  }

  /// Look up a section object, reporting absence or a wrong type.
  fn section<'v>(&mut self, root: &Node<'v>, key: &str) -> Option<&'v Map<String, Value>> {
    match root.get(key).object() {
      Ok(Some(map)) => Some(map),
      Ok(None) => {
        self.missing(key);
        None
      }
      Err(err) => {
        self.unexpected(err);
        None
      }
    }
  }
}

/// Flatten one team record into metric rows for `data_date`.
///
/// Fails only if the record has no usable `teamID`; every other problem is a
/// diagnostic.
pub fn flatten_team(
  record: &Value,
  data_date: NaiveDate,
  layout: &StaticLayout,
) -> Result<Flattened<MetricRow>> {
  let root = Node::new(record);
  if root.object()?.is_none() {
    return Err(Error::UnexpectedShape("team record is null".to_owned()));
  }
  let team_id =
    root.get("teamID").non_empty_text()?.ok_or_else(|| Error::MissingField("teamID".into()))?;

  let mut ctx = TeamCtx { team_id: &team_id, data_date, out: Flattened::default() };

  flatten_static(&mut ctx, &root, layout);
  if let Some(stats) = ctx.section(&root, "teamStats") {
    flatten_team_stats(&mut ctx, stats);
  }
  if let Some(performers) = ctx.section(&root, "topPerformers") {
    flatten_top_performers(&mut ctx, performers);
  }

  Ok(ctx.out)
}

fn flatten_static(ctx: &mut TeamCtx<'_>, root: &Node<'_>, layout: &StaticLayout) {
  for group in &layout.groups {
    for field in &group.fields {
      let node = root.dotted(&field.source).first_or_self();
      let Some(raw) = node.value() else {
        ctx.missing(field.source.as_str());
        continue;
      };
      let value = ctx.coerce(group.level1, field.label(), raw);
      let row = MetricRow::new(ctx.team_id, group.level1, field.label(), value, ctx.data_date);
      ctx.out.rows.push(row);
    }
  }
}

fn flatten_team_stats(ctx: &mut TeamCtx<'_>, stats: &Map<String, Value>) {
  let mut paths = Vec::new();
  let mut values = Vec::new();
  walk_scalars(stats, &mut |path, value| {
    paths.push(path.to_vec());
    values.push(value);
  });

  for (label, raw) in stat_labels(&paths).into_iter().zip(values) {
    let value = ctx.coerce(Category::TeamStats, &label, raw);
    let row = MetricRow::new(ctx.team_id, Category::TeamStats, label, value, ctx.data_date);
    ctx.out.rows.push(row);
  }
}

fn flatten_top_performers(ctx: &mut TeamCtx<'_>, performers: &Map<String, Value>) {
  let mut paths = Vec::new();
  let mut leaders = Vec::new();
  for (category, stats) in performers {
    let stats = match Node::new(stats).object() {
      Ok(Some(stats)) => stats,
      Ok(None) => continue,
      Err(_) => {
        ctx.unexpected(Error::TypeMismatch {
          path:     format!("topPerformers.{category}"),
          expected: "object",
          found:    crate::json::type_name(stats),
        });
        continue;
      }
    };

    for (stat_name, details) in stats {
      let details = Node::new(details);
      // Only the leaderboard's first entry is kept; no total, no row.
      let Ok(Some(total)) = details.get("total").array() else { continue };
      let Some(first) = total.first() else { continue };

      let player_id = details.get("playerID").index(0).non_empty_text().ok().flatten();
      paths.push(vec![category.as_str(), stat_name.as_str()]);
      leaders.push((first, player_id));
    }
  }

  for (label, (first, player_id)) in stat_labels(&paths).into_iter().zip(leaders) {
    let value = ctx.coerce(Category::TopPerformers, &label, first);
    let row = MetricRow::top_performer(ctx.team_id, label, value, player_id, ctx.data_date);
    ctx.out.rows.push(row);
  }
}

/// Flatten every record of a teams payload. Records without a usable
/// `teamID` are skipped with a diagnostic.
pub fn flatten_teams(
  records: &[Value],
  data_date: NaiveDate,
  layout: &StaticLayout,
) -> Flattened<MetricRow> {
  let mut out = Flattened::default();
  for (index, record) in records.iter().enumerate() {
    match flatten_team(record, data_date, layout) {
      Ok(team) => out.extend(team),
      Err(err) => {
        out.diagnostics.push(Diagnostic::SkippedRecord { index, reason: err.to_string() })
      }
    }
  }
  out
}

// ─── Coverage ────────────────────────────────────────────────────────────────

/// Distinct team ids present in a payload.
pub fn payload_team_ids(records: &[Value]) -> BTreeSet<String> {
  records
    .iter()
    .filter_map(|r| Node::new(r).get("teamID").non_empty_text().ok().flatten())
    .collect()
}

impl StaticLayout {
  /// Every `Level1` category a record flattened with this layout can produce.
  pub fn categories(&self) -> BTreeSet<Category> {
    self
      .groups
      .iter()
      .map(|g| g.level1)
      .chain([Category::TeamStats, Category::TopPerformers])
      .collect()
  }
}

/// Number of distinct teams with at least one row, per `Level1` category.
/// Every category in `expected` is present, with 0 when no team has a row.
pub fn team_coverage(
  rows: &[MetricRow],
  expected: &BTreeSet<Category>,
) -> BTreeMap<Category, usize> {
  let mut seen: BTreeMap<Category, BTreeSet<&str>> =
    expected.iter().map(|&category| (category, BTreeSet::new())).collect();
  for row in rows {
    seen.entry(row.level1()).or_default().insert(row.team_id());
  }
  seen.into_iter().map(|(category, teams)| (category, teams.len())).collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 9, 8).unwrap() }

  fn rows_in(out: &Flattened<MetricRow>, category: Category) -> Vec<&MetricRow> {
    out.rows.iter().filter(|r| r.level1() == category).collect()
  }

  #[test]
  fn normalize_label_capitalises_words() {
    assert_eq!(normalize_label("rush yds"), "RushYds");
    assert_eq!(normalize_label("rushYds"), "RushYds");
    assert_eq!(normalize_label("  pass   TD "), "PassTD");
    assert_eq!(normalize_label(""), "");
  }

  #[test]
  fn team_stat_example() {
    let record = json!({ "teamID": "KC", "teamStats": { "Rushing": { "rushYds": "142" } } });
    let out = flatten_team(&record, date(), &StaticLayout { groups: vec![] }).unwrap();
    let stats = rows_in(&out, Category::TeamStats);
    assert_eq!(stats.len(), 1);
    assert_eq!(
      *stats[0],
      MetricRow::new("KC", Category::TeamStats, "RushYds", Some(142.0), date())
    );
    assert_eq!(stats[0].player_id(), None);
  }

  #[test]
  fn missing_static_field_skips_only_that_field() {
    let full = json!({
      "teamID": "1",
      "teamName": "Cardinals",
      "teamCity": "Arizona",
      "conference": "NFC",
      "division": "West",
      "wins": "4",
      "loss": "13",
      "byeWeeks": { "2022": ["13"], "2023": ["14"], "2024": ["11"] },
    });
    let layout = StaticLayout::default();
    let complete = flatten_team(&full, date(), &layout).unwrap();
    assert_eq!(complete.rows.len(), 9);

    for group in &layout.groups {
      for field in &group.fields {
        let mut partial = full.clone();
        let mut path: Vec<&str> = field.source.split('.').collect();
        let last = path.pop().unwrap();
        let mut target = &mut partial;
        for seg in path {
          target = target.get_mut(seg).unwrap();
        }
        target.as_object_mut().unwrap().remove(last);

        let out = flatten_team(&partial, date(), &layout).unwrap();
        assert_eq!(out.rows.len(), 8, "dropping {} should drop one row", field.source);
        assert!(out.rows.iter().all(|r| r.level2() != field.label()));
        assert!(out.diagnostics.contains(&Diagnostic::MissingField {
          team_id: "1".into(),
          field:   field.source.clone(),
        }));
      }
    }
  }

  #[test]
  fn bye_weeks_are_renamed_and_unwrapped() {
    let record = json!({ "teamID": "1", "byeWeeks": { "2023": ["14"] } });
    let out = flatten_team(&record, date(), &StaticLayout::default()).unwrap();
    let byes = rows_in(&out, Category::ByeWeeks);
    assert_eq!(byes.len(), 1);
    assert_eq!(byes[0].level2(), "2023-Byes");
    assert_eq!(byes[0].value(), Some(14.0));
  }

  #[test]
  fn text_static_values_are_kept_as_null_with_warning() {
    let record = json!({ "teamID": "1", "teamName": "Cardinals" });
    let out = flatten_team(&record, date(), &StaticLayout::default()).unwrap();
    let info = rows_in(&out, Category::TeamInfo);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].value(), None);
    assert!(out.diagnostics.iter().any(|d| matches!(
      d,
      Diagnostic::NonNumeric { label, .. } if label == "teamName"
    )));
  }

  #[test]
  fn non_numeric_stat_keeps_row_with_null() {
    let record = json!({
      "teamID": "KC",
      "teamStats": { "Passing": { "passYds": "n/a", "passTD": 3 } },
    });
    let out = flatten_team(&record, date(), &StaticLayout { groups: vec![] }).unwrap();
    let stats = rows_in(&out, Category::TeamStats);
    assert_eq!(stats.len(), 2);
    let yds = stats.iter().find(|r| r.level2() == "PassYds").unwrap();
    assert_eq!(yds.value(), None);
    assert_eq!(out.diagnostics.len(), 2, "non-numeric + missing topPerformers");
  }

  #[test]
  fn new_stats_appear_without_configuration() {
    let record = json!({
      "teamID": "KC",
      "teamStats": {
        "Defense": { "sacks": "40", "fumbles recovered": "9" },
        "Kicking": { "fgMade": "30", "Long": { "fgLong": "57" } },
      },
    });
    let out = flatten_team(&record, date(), &StaticLayout { groups: vec![] }).unwrap();
    let labels: BTreeSet<&str> =
      rows_in(&out, Category::TeamStats).into_iter().map(|r| r.level2()).collect();
    assert_eq!(
      labels,
      BTreeSet::from(["Sacks", "FumblesRecovered", "FgMade", "LongFgLong"])
    );
  }

  #[test]
  fn repeated_stat_names_keep_their_category() {
    let record = json!({
      "teamID": "KC",
      "teamStats": {
        "Passing": { "yds": "250", "passTD": "2" },
        "Rushing": { "yds": "142" },
      },
      "topPerformers": {
        "Passing": { "yds": { "total": ["291"], "playerID": ["3139477"] } },
        "Receiving": { "yds": { "total": ["110"], "playerID": ["4241"] } },
      },
    });
    let out = flatten_team(&record, date(), &StaticLayout { groups: vec![] }).unwrap();

    let value_of = |category, label: &str| {
      rows_in(&out, category).into_iter().find(|r| r.level2() == label).and_then(|r| r.value())
    };
    assert_eq!(value_of(Category::TeamStats, "PassingYds"), Some(250.0));
    assert_eq!(value_of(Category::TeamStats, "RushingYds"), Some(142.0));
    assert_eq!(value_of(Category::TeamStats, "PassTD"), Some(2.0));
    assert_eq!(value_of(Category::TopPerformers, "PassingYds"), Some(291.0));
    assert_eq!(value_of(Category::TopPerformers, "ReceivingYds"), Some(110.0));

    for category in [Category::TeamStats, Category::TopPerformers] {
      let labels: Vec<&str> = rows_in(&out, category).into_iter().map(|r| r.level2()).collect();
      let distinct: BTreeSet<&str> = labels.iter().copied().collect();
      assert_eq!(labels.len(), distinct.len(), "{category} labels repeat: {labels:?}");
    }
  }

  #[test]
  fn top_performers_keep_rank_one_only() {
    let record = json!({
      "teamID": "KC",
      "topPerformers": {
        "Rushing": {
          "rushYds": { "total": ["70", "40"], "playerID": ["4241", "999"] },
          "rushTD": { "total": [], "playerID": [] },
        },
        "Passing": { "passYds": { "total": ["291"], "playerID": [] } },
      },
    });
    let out = flatten_team(&record, date(), &StaticLayout { groups: vec![] }).unwrap();
    let top = rows_in(&out, Category::TopPerformers);
    assert_eq!(top.len(), 2, "empty total emits nothing");

    let rush = top.iter().find(|r| r.level2() == "RushYds").unwrap();
    assert_eq!(rush.value(), Some(70.0));
    assert_eq!(rush.player_id(), Some("4241"));

    let pass = top.iter().find(|r| r.level2() == "PassYds").unwrap();
    assert_eq!(pass.player_id(), None);
  }

  #[test]
  fn wrong_section_type_is_a_diagnostic() {
    let record = json!({ "teamID": "KC", "teamStats": [], "topPerformers": {} });
    let out = flatten_team(&record, date(), &StaticLayout { groups: vec![] }).unwrap();
    assert!(out.rows.is_empty());
    assert!(matches!(out.diagnostics.as_slice(), [Diagnostic::UnexpectedType { .. }]));
  }

  #[test]
  fn records_without_team_id_are_skipped() {
    let records = vec![
      json!({ "teamName": "Nobody" }),
      json!("not an object"),
      json!({ "teamID": "DEN", "teamStats": { "Rushing": { "rushYds": 88 } } }),
    ];
    let out = flatten_teams(&records, date(), &StaticLayout { groups: vec![] });
    assert!(out.rows.iter().all(|r| r.team_id() == "DEN"));
    let skipped = out
      .diagnostics
      .iter()
      .filter(|d| matches!(d, Diagnostic::SkippedRecord { .. }))
      .count();
    assert_eq!(skipped, 2);
  }

  #[test]
  fn coverage_counts_teams_per_category() {
    let records = vec![
      json!({ "teamID": "KC", "teamStats": { "R": { "yds": 1 } }, "topPerformers": {} }),
      json!({ "teamID": "SF", "teamStats": { "R": { "yds": 2 } } }),
    ];
    let out = flatten_teams(&records, date(), &StaticLayout { groups: vec![] });
    assert_eq!(payload_team_ids(&records).len(), 2);
    let layout = StaticLayout { groups: vec![] };
    let coverage = team_coverage(&out.rows, &layout.categories());
    assert_eq!(coverage.get(&Category::TeamStats), Some(&2));
    assert_eq!(coverage.get(&Category::TopPerformers), Some(&0));
    assert_eq!(coverage.get(&Category::TeamInfo), None);
  }

  #[test]
  fn layout_categories_include_static_groups_and_sections() {
    assert_eq!(StaticLayout::default().categories(), BTreeSet::from(Category::ALL));
    assert_eq!(
      StaticLayout { groups: vec![] }.categories(),
      BTreeSet::from([Category::TeamStats, Category::TopPerformers])
    );
  }
}
