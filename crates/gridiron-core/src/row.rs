//! Flat row types written to the warehouse.
//!
//! Two shapes exist. Schedule data maps one game to one [`GameRow`]. Team data
//! is stored long-form: one [`MetricRow`] per (team, category, metric).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Tables and keys ─────────────────────────────────────────────────────────

/// A warehouse table this loader writes to. Each table accepts exactly one
/// row shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
  Games,
  Teams,
}

impl Table {
  /// Natural-id column used for deduplication.
  pub fn key_column(self) -> KeyColumn {
    match self {
      Table::Games => KeyColumn::GameId,
      Table::Teams => KeyColumn::TeamId,
    }
  }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Table::Games => "games",
      Table::Teams => "teams",
    })
  }
}

/// A column that can identify already-loaded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyColumn {
  #[serde(rename = "gameID")]
  GameId,
  #[serde(rename = "teamID")]
  TeamId,
}

impl KeyColumn {
  /// Column name as stored in the warehouse.
  pub fn as_str(self) -> &'static str {
    match self {
      KeyColumn::GameId => "gameID",
      KeyColumn::TeamId => "teamID",
    }
  }
}

impl fmt::Display for KeyColumn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Rows that expose key-column values to the dedup filter.
pub trait Keyed {
  /// The value of `column` for this row, or `None` if the row has no such
  /// column.
  fn key(&self, column: KeyColumn) -> Option<&str>;

  /// Partition date of the row.
  fn data_date(&self) -> NaiveDate;
}

// ─── Long-form team metrics ──────────────────────────────────────────────────

/// The `Level1` grouping of a metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
  #[serde(rename = "Team Info")]
  TeamInfo,
  #[serde(rename = "Bye Weeks")]
  ByeWeeks,
  #[serde(rename = "Team Stats")]
  TeamStats,
  #[serde(rename = "Top Performers")]
  TopPerformers,
}

impl Category {
  pub const ALL: [Category; 4] =
    [Category::TeamInfo, Category::ByeWeeks, Category::TeamStats, Category::TopPerformers];

  pub fn as_str(self) -> &'static str {
    match self {
      Category::TeamInfo => "Team Info",
      Category::ByeWeeks => "Bye Weeks",
      Category::TeamStats => "Team Stats",
      Category::TopPerformers => "Top Performers",
    }
  }

  pub fn parse(s: &str) -> Option<Self> { Self::ALL.into_iter().find(|c| c.as_str() == s) }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One `(teamID, Level1, Level2, Value, PlayerID, dataDate)` row.
///
/// Fields are private so that `player_id` can only be set on
/// [`Category::TopPerformers`] rows and `value` is always finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
  #[serde(rename = "teamID")]
  team_id:   String,
  #[serde(rename = "Level1")]
  level1:    Category,
  #[serde(rename = "Level2")]
  level2:    String,
  #[serde(rename = "Value")]
  value:     Option<f64>,
  #[serde(rename = "PlayerID")]
  player_id: Option<String>,
  #[serde(rename = "dataDate")]
  data_date: NaiveDate,
}

impl MetricRow {
  /// A row for any category other than top performers.
  pub fn new(
    team_id: impl Into<String>,
    level1: Category,
    level2: impl Into<String>,
    value: Option<f64>,
    data_date: NaiveDate,
  ) -> Self {
    Self {
      team_id: team_id.into(),
      level1,
      level2: level2.into(),
      value: value.filter(|v| v.is_finite()),
      player_id: None,
      data_date,
    }
  }

  /// A [`Category::TopPerformers`] row carrying the leader's player id.
  pub fn top_performer(
    team_id: impl Into<String>,
    level2: impl Into<String>,
    value: Option<f64>,
    player_id: Option<String>,
    data_date: NaiveDate,
  ) -> Self {
    Self {
      player_id,
      ..Self::new(team_id, Category::TopPerformers, level2, value, data_date)
    }
  }

  pub fn team_id(&self) -> &str { &self.team_id }

  pub fn level1(&self) -> Category { self.level1 }

  pub fn level2(&self) -> &str { &self.level2 }

  pub fn value(&self) -> Option<f64> { self.value }

  pub fn player_id(&self) -> Option<&str> { self.player_id.as_deref() }
}

impl Keyed for MetricRow {
  fn key(&self, column: KeyColumn) -> Option<&str> {
    match column {
      KeyColumn::TeamId => Some(&self.team_id),
      KeyColumn::GameId => None,
    }
  }

  fn data_date(&self) -> NaiveDate { self.data_date }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// One scheduled game, columns mapped one-to-one from the API record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRow {
  #[serde(rename = "gameID")]
  pub game_id:          String,
  #[serde(rename = "seasonType")]
  pub season_type:      Option<String>,
  pub away:             Option<String>,
  #[serde(rename = "gameDate")]
  pub game_date:        Option<NaiveDate>,
  #[serde(rename = "espnID")]
  pub espn_id:          Option<String>,
  #[serde(rename = "teamIDHome")]
  pub team_id_home:     Option<String>,
  #[serde(rename = "gameStatus")]
  pub game_status:      Option<String>,
  #[serde(rename = "gameWeek")]
  pub game_week:        Option<String>,
  #[serde(rename = "teamIDAway")]
  pub team_id_away:     Option<String>,
  pub home:             Option<String>,
  #[serde(rename = "espnLink")]
  pub espn_link:        Option<String>,
  #[serde(rename = "cbsLink")]
  pub cbs_link:         Option<String>,
  #[serde(rename = "gameTime")]
  pub game_time:        Option<String>,
  #[serde(rename = "gameTime_epoch")]
  pub game_time_epoch:  Option<DateTime<Utc>>,
  pub season:           Option<String>,
  #[serde(rename = "neutralSite")]
  pub neutral_site:     bool,
  #[serde(rename = "gameStatusCode")]
  pub game_status_code: Option<String>,
  #[serde(rename = "dataDate")]
  pub data_date:        NaiveDate,
}

impl Keyed for GameRow {
  fn key(&self, column: KeyColumn) -> Option<&str> {
    match column {
      KeyColumn::GameId => Some(&self.game_id),
      KeyColumn::TeamId => None,
    }
  }

  fn data_date(&self) -> NaiveDate { self.data_date }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// A homogeneous batch of rows bound for one table.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBatch {
  Games(Vec<GameRow>),
  Metrics(Vec<MetricRow>),
}

impl RowBatch {
  /// The table this batch belongs in.
  pub fn table(&self) -> Table {
    match self {
      RowBatch::Games(_) => Table::Games,
      RowBatch::Metrics(_) => Table::Teams,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      RowBatch::Games(rows) => rows.len(),
      RowBatch::Metrics(rows) => rows.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
