//! Schedule records: one API game object to one [`GameRow`].

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::{
  Error, Result,
  coerce::to_finite,
  flatten::{Diagnostic, Flattened},
  json::Node,
  row::GameRow,
};

/// Date format used by the schedule endpoint, e.g. `20240908`.
pub const API_DATE_FORMAT: &str = "%Y%m%d";

/// Map one game record. Only `gameID` is required; the rest are copied when
/// present and left empty otherwise.
pub fn flatten_game(record: &Value, data_date: NaiveDate) -> Result<GameRow> {
  let root = Node::new(record);
  if root.object()?.is_none() {
    return Err(Error::UnexpectedShape("game record is null".to_owned()));
  }
  let text = |key: &str| root.get(key).non_empty_text();

  let game_id = text("gameID")?.ok_or_else(|| Error::MissingField("gameID".into()))?;

  let game_date = text("gameDate")?
    .map(|raw| {
      NaiveDate::parse_from_str(raw.trim(), API_DATE_FORMAT).map_err(|_| Error::TypeMismatch {
        path:     "gameDate".into(),
        expected: "YYYYMMDD date",
        found:    "string",
      })
    })
    .transpose()?;

  let game_time_epoch = root.get("gameTime_epoch").value().and_then(to_finite).and_then(epoch_to_utc);

  Ok(GameRow {
    game_id,
    season_type: text("seasonType")?,
    away: text("away")?,
    game_date,
    espn_id: text("espnID")?,
    team_id_home: text("teamIDHome")?,
    game_status: text("gameStatus")?,
    game_week: text("gameWeek")?,
    team_id_away: text("teamIDAway")?,
    home: text("home")?,
    espn_link: text("espnLink")?,
    cbs_link: text("cbsLink")?,
    game_time: text("gameTime")?,
    game_time_epoch,
    season: text("season")?,
    neutral_site: text("neutralSite")?.is_some_and(|s| s.eq_ignore_ascii_case("true")),
    game_status_code: text("gameStatusCode")?,
    data_date,
  })
}

/// Map every record of a schedule payload, skipping unusable records with a
/// diagnostic. A repeated `gameID` keeps its first record.
pub fn flatten_games(records: &[Value], data_date: NaiveDate) -> Flattened<GameRow> {
  let mut out = Flattened::default();
  let mut seen = HashSet::new();
  for (index, record) in records.iter().enumerate() {
    match flatten_game(record, data_date) {
      Ok(row) if seen.insert(row.game_id.clone()) => out.rows.push(row),
      Ok(row) => {
        let reason = format!("duplicate gameID {}", row.game_id);
        out.diagnostics.push(Diagnostic::SkippedRecord { index, reason })
      }
      Err(err) => {
        out.diagnostics.push(Diagnostic::SkippedRecord { index, reason: err.to_string() })
      }
    }
  }
  out
}

fn epoch_to_utc(secs: f64) -> Option<DateTime<Utc>> {
  let whole = secs.trunc();
  let nanos = ((secs - whole) * 1e9).round() as u32;
  DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
