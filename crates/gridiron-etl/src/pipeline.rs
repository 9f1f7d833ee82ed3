//! The orchestrator: runs every configured job, one unit of work at a time.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::{Days, Local, NaiveDate};
use gridiron_core::{
  dedup::{candidate_keys, retain_new},
  feed::{FeedRequest, SportsFeed, records},
  flatten::{StaticLayout, flatten_teams, payload_team_ids, team_coverage},
  row::{Category, Keyed, MetricRow, RowBatch, Table},
  schedule::flatten_games,
  store::Warehouse,
};
use serde_json::Value;
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
  Error, Result,
  context::{RunContext, RunReport, Stage, Unit, UnitOutcome},
  lookup::LookupGuard,
  settings::{DedupMode, Job, PipelineSettings},
  writer::write_with_retry,
};

pub struct Pipeline<W, F> {
  warehouse: Arc<W>,
  feed:      Arc<F>,
  settings:  PipelineSettings,
}

impl<W: Warehouse, F: SportsFeed> Pipeline<W, F> {
  pub fn new(warehouse: Arc<W>, feed: Arc<F>, settings: PipelineSettings) -> Self {
    Self { warehouse, feed, settings }
  }

  pub fn settings(&self) -> &PipelineSettings { &self.settings }

  /// Run every job for `load_date` (today, local time, when `None`).
  ///
  /// A failing unit of work is logged and recorded in the report, and the run
  /// moves on. Only invalid settings make the run itself fail.
  pub async fn run(&self, load_date: Option<NaiveDate>) -> Result<RunReport> {
    self.settings.validate()?;
    let load_date = load_date.unwrap_or_else(|| Local::now().date_naive());
    let mut ctx = RunContext::new(load_date);
    let span = ctx.span().clone();

    async move {
      info!(jobs = ?self.settings.jobs, "run started");
      for &job in &self.settings.jobs {
        self.run_job(&mut ctx, job).await?;
      }
      let report = ctx.into_report();
      info!(counters = ?report.counters, "{report}");
      Ok::<_, Error>(report)
    }
    .instrument(span)
    .await
  }

  async fn run_job(&self, ctx: &mut RunContext, job: Job) -> Result<()> {
    let (table, retain_days, days) = match job {
      Job::Games => {
        (Table::Games, self.settings.schedule.retain_days, self.settings.schedule.days)
      }
      Job::Teams => (Table::Teams, self.settings.teams.retain_days, 1),
    };

    if let Some(retain) = retain_days {
      self.cleanup(ctx, table, retain).await;
    }

    for offset in 0..days {
      let data_date = ctx
        .load_date()
        .checked_add_days(Days::new(offset.into()))
        .ok_or_else(|| Error::Settings(format!("{} + {offset} days is out of range", ctx.load_date())))?;

      let mut unit = ctx.begin(job, data_date);
      let span = info_span!("unit", %job, %data_date);
      let result = match job {
        Job::Games => self.load_games(ctx, &mut unit).instrument(span).await,
        Job::Teams => self.load_teams(ctx, &mut unit).instrument(span).await,
      };

      let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
          error!(%job, %data_date, stage = %unit.stage(), error = %err, "unit failed; continuing");
          UnitOutcome::Failed(err.to_string())
        }
      };
      ctx.finish(unit, outcome);
    }
    Ok(())
  }

  // ─── Jobs ──────────────────────────────────────────────────────────────────

  async fn load_games(&self, ctx: &mut RunContext, unit: &mut Unit) -> Result<UnitOutcome> {
    let data_date = unit.data_date();

    unit.advance(Stage::Fetching);
    let request = FeedRequest::games_for_date(data_date);
    let Some(body) = self.feed.fetch(&request).await? else {
      info!(%request, "no games in response");
      return Ok(UnitOutcome::Empty);
    };

    unit.advance(Stage::Validating);
    let records = records(&body)?;
    ctx.counters.records_fetched += records.len();

    unit.advance(Stage::Flattening);
    let flat = flatten_games(records, data_date);
    ctx.report_diagnostics(unit, &flat.diagnostics);
    ctx.counters.rows_flattened += flat.rows.len();

    // Game ids are unique across dates, so look them up table-wide.
    self.dedup_and_write(ctx, unit, Table::Games, None, flat.rows, RowBatch::Games).await
  }

  async fn load_teams(&self, ctx: &mut RunContext, unit: &mut Unit) -> Result<UnitOutcome> {
    let data_date = unit.data_date();

    unit.advance(Stage::Fetching);
    let request = FeedRequest::teams();
    let Some(body) = self.feed.fetch(&request).await? else {
      info!(%request, "no teams in response");
      return Ok(UnitOutcome::Empty);
    };

    if let Some(dir) = &self.settings.raw_dump_dir {
      match dump_raw(dir, data_date, &body).await {
        Ok(path) => info!(path = %path.display(), "saved raw teams response"),
        Err(err) => warn!(dir = %dir.display(), error = %err, "could not save raw teams response"),
      }
    }

    unit.advance(Stage::Validating);
    let records = records(&body)?;
    ctx.counters.records_fetched += records.len();

    unit.advance(Stage::Flattening);
    let flat = flatten_teams(records, data_date, &self.settings.static_groups);
    ctx.report_diagnostics(unit, &flat.diagnostics);
    ctx.counters.rows_flattened += flat.rows.len();
    let gaps = coverage_gaps(records, &flat.rows, &self.settings.static_groups);
    for (category, teams, expected) in gaps {
      warn!(level1 = %category, teams, expected, "team count differs from payload");
    }

    self
      .dedup_and_write(ctx, unit, Table::Teams, Some(data_date), flat.rows, RowBatch::Metrics)
      .await
  }

  // ─── Shared steps ──────────────────────────────────────────────────────────

  async fn dedup_and_write<R: Keyed + Send + Sync>(
    &self,
    ctx: &mut RunContext,
    unit: &mut Unit,
    table: Table,
    partition: Option<NaiveDate>,
    rows: Vec<R>,
    into_batch: fn(Vec<R>) -> RowBatch,
  ) -> Result<UnitOutcome> {
    let produced = rows.len();
    if produced == 0 {
      info!(%table, "nothing to load");
      return Ok(UnitOutcome::NothingNew);
    }

    unit.advance(Stage::Deduping);
    let fresh = self.dedup(ctx, unit, table, partition, rows).await?;
    let skipped = produced - fresh.len();
    ctx.counters.rows_skipped_existing += skipped;
    info!(%table, candidates = produced, new = fresh.len(), skipped, "deduplicated");

    unit.advance(Stage::Writing);
    let batch = into_batch(fresh);
    let timeout = self.settings.timeouts.write();
    match write_with_retry(&*self.warehouse, table, &batch, &self.settings.retry, timeout).await {
      Ok(written) => {
        ctx.counters.rows_written += written.rows;
        ctx.counters.write_retries += written.attempts.saturating_sub(1);
        Ok(if written.rows == 0 { UnitOutcome::NothingNew } else { UnitOutcome::Written(written.rows) })
      }
      Err(err) => {
        if let Error::Write { attempts, .. } = &err {
          ctx.counters.write_retries += attempts.saturating_sub(1);
        }
        Err(err)
      }
    }
  }

  async fn dedup<R: Keyed + Send + Sync>(
    &self,
    ctx: &mut RunContext,
    unit: &Unit,
    table: Table,
    partition: Option<NaiveDate>,
    rows: Vec<R>,
  ) -> Result<Vec<R>> {
    let guard = LookupGuard {
      policy:  self.settings.dedup.on_lookup_error,
      timeout: self.settings.timeouts.lookup(),
    };
    let warehouse = &*self.warehouse;

    match self.settings.dedup.mode {
      DedupMode::PerKey => {
        let column = table.key_column();
        let candidates = candidate_keys(&rows, column)?;
        let existing =
          guard.existing_keys(ctx, warehouse, table, column, partition, &candidates).await?;
        Ok(retain_new(&existing, rows, column)?)
      }
      DedupMode::Partition => {
        let data_date = unit.data_date();
        if guard.partition_exists(ctx, warehouse, table, data_date).await? {
          info!(%table, %data_date, "partition already loaded; skipping batch");
          Ok(Vec::new())
        } else {
          Ok(rows)
        }
      }
    }
  }

  /// Delete rows older than `retain_days` before the load date. A failure is
  /// logged and counted; loading goes ahead.
  async fn cleanup(&self, ctx: &mut RunContext, table: Table, retain_days: u32) {
    let Some(cutoff) = ctx.load_date().checked_sub_days(Days::new(retain_days.into())) else {
      warn!(%table, retain_days, "retention window reaches before the calendar; skipping cleanup");
      return;
    };

    match self.delete_before(table, cutoff).await {
      Ok(removed) => {
        ctx.counters.rows_deleted += removed;
        info!(%table, %cutoff, removed, "deleted stale rows");
      }
      Err(err) => {
        ctx.counters.cleanup_failures += 1;
        error!(%table, %cutoff, error = %err, "stale-row cleanup failed");
      }
    }
  }

  async fn delete_before(&self, table: Table, cutoff: NaiveDate) -> Result<u64> {
    let timeout = self.settings.timeouts.write();
    match tokio::time::timeout(timeout, self.warehouse.delete_before(table, cutoff)).await {
      Ok(Ok(removed)) => Ok(removed),
      Ok(Err(e)) => Err(Error::Cleanup { table, source: Box::new(e) }),
      Err(_) => Err(Error::Cleanup {
        table,
        source: Box::new(Error::Timeout { operation: "stale-row delete", after: timeout }),
      }),
    }
  }
}

/// Categories covering a different number of teams than the payload holds,
/// as `(category, teams, expected)`. A category no team produced counts as 0.
pub(crate) fn coverage_gaps(
  records: &[Value],
  rows: &[MetricRow],
  layout: &StaticLayout,
) -> Vec<(Category, usize, usize)> {
  let expected = payload_team_ids(records).len();
  team_coverage(rows, &layout.categories())
    .into_iter()
    .filter(|&(_, teams)| teams != expected)
    .map(|(category, teams)| (category, teams, expected))
    .collect()
}

async fn dump_raw(dir: &Path, data_date: NaiveDate, body: &Value) -> Result<PathBuf> {
  tokio::fs::create_dir_all(dir).await?;
  let path = dir.join(format!("nfl_teams_raw_response_{data_date}.json"));
  let bytes = serde_json::to_vec_pretty(body).map_err(gridiron_core::Error::from)?;
  tokio::fs::write(&path, bytes).await?;
  Ok(path)
}
