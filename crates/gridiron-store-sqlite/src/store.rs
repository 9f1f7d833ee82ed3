//! [`SqliteWarehouse`]: the SQLite implementation of [`Warehouse`].

use std::{collections::HashSet, path::Path};

use chrono::NaiveDate;
use gridiron_core::{
  row::{GameRow, KeyColumn, MetricRow, RowBatch, Table},
  store::Warehouse,
};

use crate::{
  encode::{
    GameParams, MetricParams, RawGameRow, RawMetricRow, column_name, encode_date, table_name,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gridiron warehouse backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteWarehouse {
  conn: tokio_rusqlite::Connection,
}

impl SqliteWarehouse {
  /// Open (or create) a warehouse at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory warehouse.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// All team-metric rows, optionally restricted to one partition, in
  /// insertion order.
  pub async fn metric_rows(&self, partition: Option<NaiveDate>) -> Result<Vec<MetricRow>> {
    let date_str = partition.map(encode_date);

    let raws: Vec<RawMetricRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT teamID, Level1, Level2, Value, PlayerID, dataDate
           FROM team_metrics
           WHERE ?1 IS NULL OR dataDate = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![date_str], |row| {
            Ok(RawMetricRow {
              team_id:   row.get(0)?,
              level1:    row.get(1)?,
              level2:    row.get(2)?,
              value:     row.get(3)?,
              player_id: row.get(4)?,
              data_date: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMetricRow::into_row).collect()
  }

  /// All game rows in insertion order.
  pub async fn game_rows(&self) -> Result<Vec<GameRow>> {
    let raws: Vec<RawGameRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT gameID, seasonType, away, gameDate, espnID, teamIDHome,
                  gameStatus, gameWeek, teamIDAway, home, espnLink, cbsLink,
                  gameTime, gameTime_epoch, season, neutralSite, gameStatusCode,
                  dataDate
           FROM games
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawGameRow {
              game_id:          row.get(0)?,
              season_type:      row.get(1)?,
              away:             row.get(2)?,
              game_date:        row.get(3)?,
              espn_id:          row.get(4)?,
              team_id_home:     row.get(5)?,
              game_status:      row.get(6)?,
              game_week:        row.get(7)?,
              team_id_away:     row.get(8)?,
              home:             row.get(9)?,
              espn_link:        row.get(10)?,
              cbs_link:         row.get(11)?,
              game_time:        row.get(12)?,
              game_time_epoch:  row.get(13)?,
              season:           row.get(14)?,
              neutral_site:     row.get(15)?,
              game_status_code: row.get(16)?,
              data_date:        row.get(17)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGameRow::into_row).collect()
  }

  async fn insert_metrics(&self, rows: &[MetricRow]) -> Result<usize> {
    let params: Vec<MetricParams> = rows.iter().map(MetricParams::from).collect();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO team_metrics (teamID, Level1, Level2, Value, PlayerID, dataDate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for p in &params {
            stmt.execute(rusqlite::params![
              p.team_id,
              p.level1,
              p.level2,
              p.value,
              p.player_id,
              p.data_date,
            ])?;
          }
        }
        tx.commit()?;
        Ok(params.len())
      })
      .await?;
    Ok(written)
  }

  async fn insert_games(&self, rows: &[GameRow]) -> Result<usize> {
    let params: Vec<GameParams> = rows.iter().map(GameParams::from).collect();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO games (
               gameID, seasonType, away, gameDate, espnID, teamIDHome,
               gameStatus, gameWeek, teamIDAway, home, espnLink, cbsLink,
               gameTime, gameTime_epoch, season, neutralSite, gameStatusCode,
               dataDate
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                       ?13, ?14, ?15, ?16, ?17, ?18)",
          )?;
          for p in &params {
            let r = &p.row;
            stmt.execute(rusqlite::params![
              r.game_id,
              r.season_type,
              r.away,
              p.game_date,
              r.espn_id,
              r.team_id_home,
              r.game_status,
              r.game_week,
              r.team_id_away,
              r.home,
              r.espn_link,
              r.cbs_link,
              r.game_time,
              p.game_time_epoch,
              r.season,
              r.neutral_site,
              r.game_status_code,
              p.data_date,
            ])?;
          }
        }
        tx.commit()?;
        Ok(params.len())
      })
      .await?;
    Ok(written)
  }
}

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for SqliteWarehouse {
  type Error = Error;

  async fn existing_keys(
    &self,
    table:      Table,
    column:     KeyColumn,
    partition:  Option<NaiveDate>,
    candidates: &[String],
  ) -> Result<HashSet<String>> {
    if table.key_column() != column {
      return Err(Error::UnknownColumn { table, column });
    }
    if candidates.is_empty() {
      return Ok(HashSet::new());
    }

    // One statement for the whole candidate set: `col IN (?1, ..., ?n)`,
    // with the partition date bound last when present.
    let col = column_name(column);
    let placeholders = (1..=candidates.len()).map(|i| format!("?{i}")).collect::<Vec<_>>();
    let mut sql = format!(
      "SELECT DISTINCT {col} FROM {} WHERE {col} IN ({})",
      table_name(table),
      placeholders.join(", ")
    );
    let mut params: Vec<String> = candidates.to_vec();
    if let Some(date) = partition {
      params.push(encode_date(date));
      sql.push_str(&format!(" AND dataDate = ?{}", params.len()));
    }

    let found = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let keys = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(keys)
      })
      .await?;
    Ok(found)
  }

  async fn count_partition(&self, table: Table, partition: NaiveDate) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE dataDate = ?1", table_name(table));
    let date_str = encode_date(partition);

    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, rusqlite::params![date_str], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn insert(&self, table: Table, batch: &RowBatch) -> Result<usize> {
    match (table, batch) {
      (_, batch) if batch.is_empty() => Ok(0),
      (Table::Teams, RowBatch::Metrics(rows)) => self.insert_metrics(rows).await,
      (Table::Games, RowBatch::Games(rows)) => self.insert_games(rows).await,
      (table, RowBatch::Metrics(_)) => Err(Error::ShapeMismatch { table, rows: "metric rows" }),
      (table, RowBatch::Games(_)) => Err(Error::ShapeMismatch { table, rows: "game rows" }),
    }
  }

  async fn delete_before(&self, table: Table, cutoff: NaiveDate) -> Result<u64> {
    let sql = format!("DELETE FROM {} WHERE dataDate < ?1", table_name(table));
    let date_str = encode_date(cutoff);

    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![date_str])?))
      .await?;
    Ok(removed as u64)
  }

  fn is_permanent(error: &Error) -> bool { error.is_permanent() }
}
