//! Encoding and decoding helpers between row types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as ISO 8601 (`YYYY-MM-DD`), timestamps as RFC 3339 UTC
//! strings, booleans as 0/1 integers.

use chrono::{DateTime, NaiveDate, Utc};
use gridiron_core::row::{Category, GameRow, KeyColumn, MetricRow, Table};

use crate::{Error, Result};

// ─── Names ───────────────────────────────────────────────────────────────────

pub fn table_name(table: Table) -> &'static str {
  match table {
    Table::Games => "games",
    Table::Teams => "team_metrics",
  }
}

/// Key columns share their name with the warehouse column.
pub fn column_name(column: KeyColumn) -> &'static str { column.as_str() }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Bound parameters ────────────────────────────────────────────────────────

/// Owned column values for one `team_metrics` insert.
pub struct MetricParams {
  pub team_id:   String,
  pub level1:    &'static str,
  pub level2:    String,
  pub value:     Option<f64>,
  pub player_id: Option<String>,
  pub data_date: String,
}

impl From<&MetricRow> for MetricParams {
  fn from(row: &MetricRow) -> Self {
    Self {
      team_id:   row.team_id().to_owned(),
      level1:    row.level1().as_str(),
      level2:    row.level2().to_owned(),
      value:     row.value(),
      player_id: row.player_id().map(str::to_owned),
      data_date: encode_date(gridiron_core::row::Keyed::data_date(row)),
    }
  }
}

/// Owned column values for one `games` insert.
pub struct GameParams {
  pub row:             GameRow,
  pub game_date:       Option<String>,
  pub game_time_epoch: Option<String>,
  pub data_date:       String,
}

impl From<&GameRow> for GameParams {
  fn from(row: &GameRow) -> Self {
    Self {
      game_date:       row.game_date.map(encode_date),
      game_time_epoch: row.game_time_epoch.map(encode_dt),
      data_date:       encode_date(row.data_date),
      row:             row.clone(),
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `team_metrics` row.
pub struct RawMetricRow {
  pub team_id:   String,
  pub level1:    String,
  pub level2:    String,
  pub value:     Option<f64>,
  pub player_id: Option<String>,
  pub data_date: String,
}

impl RawMetricRow {
  pub fn into_row(self) -> Result<MetricRow> {
    let level1 = Category::parse(&self.level1)
      .ok_or_else(|| Error::Decode(format!("unknown Level1: {:?}", self.level1)))?;
    let data_date = decode_date(&self.data_date)?;
    Ok(match level1 {
      Category::TopPerformers => {
        MetricRow::top_performer(self.team_id, self.level2, self.value, self.player_id, data_date)
      }
      other => MetricRow::new(self.team_id, other, self.level2, self.value, data_date),
    })
  }
}

/// Raw values read directly from a `games` row.
pub struct RawGameRow {
  pub game_id:          String,
  pub season_type:      Option<String>,
  pub away:             Option<String>,
  pub game_date:        Option<String>,
  pub espn_id:          Option<String>,
  pub team_id_home:     Option<String>,
  pub game_status:      Option<String>,
  pub game_week:        Option<String>,
  pub team_id_away:     Option<String>,
  pub home:             Option<String>,
  pub espn_link:        Option<String>,
  pub cbs_link:         Option<String>,
  pub game_time:        Option<String>,
  pub game_time_epoch:  Option<String>,
  pub season:           Option<String>,
  pub neutral_site:     bool,
  pub game_status_code: Option<String>,
  pub data_date:        String,
}

impl RawGameRow {
  pub fn into_row(self) -> Result<GameRow> {
    Ok(GameRow {
      game_id:          self.game_id,
      season_type:      self.season_type,
      away:             self.away,
      game_date:        self.game_date.as_deref().map(decode_date).transpose()?,
      espn_id:          self.espn_id,
      team_id_home:     self.team_id_home,
      game_status:      self.game_status,
      game_week:        self.game_week,
      team_id_away:     self.team_id_away,
      home:             self.home,
      espn_link:        self.espn_link,
      cbs_link:         self.cbs_link,
      game_time:        self.game_time,
      game_time_epoch:  self.game_time_epoch.as_deref().map(decode_dt).transpose()?,
      season:           self.season,
      neutral_site:     self.neutral_site,
      game_status_code: self.game_status_code,
      data_date:        decode_date(&self.data_date)?,
    })
  }
}
