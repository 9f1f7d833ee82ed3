//! Per-run state threaded through every step: the run id, counters, the
//! tracing span and the outcome of each unit of work.

use std::fmt;

use chrono::NaiveDate;
use gridiron_core::flatten::Diagnostic;
use tracing::{Span, debug, info_span, warn};
use uuid::Uuid;

use crate::settings::Job;

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Where a unit of work is in fetch → validate → flatten → dedup → write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Idle,
  Fetching,
  Validating,
  Flattening,
  Deduping,
  Writing,
  Done,
  Failed,
}

impl Stage {
  pub fn is_terminal(self) -> bool { matches!(self, Stage::Done | Stage::Failed) }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::Idle => "idle",
      Stage::Fetching => "fetching",
      Stage::Validating => "validating",
      Stage::Flattening => "flattening",
      Stage::Deduping => "deduping",
      Stage::Writing => "writing",
      Stage::Done => "done",
      Stage::Failed => "failed",
    })
  }
}

// ─── Counters ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
  pub units_ok:              u32,
  pub units_failed:          u32,
  pub records_fetched:       usize,
  pub rows_flattened:        usize,
  pub rows_skipped_existing: usize,
  pub rows_written:          usize,
  pub diagnostics:           usize,
  pub lookup_failures:       u32,
  pub write_retries:         u32,
  pub rows_deleted:          u64,
  pub cleanup_failures:      u32,
}

// ─── Units ───────────────────────────────────────────────────────────────────

/// How a unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
  Written(usize),
  /// Rows were produced but all of them were already loaded.
  NothingNew,
  /// The feed returned no body.
  Empty,
  Failed(String),
}

/// One job for one data date.
#[derive(Debug)]
pub struct Unit {
  job:       Job,
  data_date: NaiveDate,
  stage:     Stage,
}

impl Unit {
  pub fn job(&self) -> Job { self.job }

  pub fn data_date(&self) -> NaiveDate { self.data_date }

  pub fn stage(&self) -> Stage { self.stage }

  /// Move to `next`. Terminal stages are set by [`RunContext::finish`].
  pub fn advance(&mut self, next: Stage) {
    debug!(job = %self.job, data_date = %self.data_date, from = %self.stage, to = %next, "stage");
    self.stage = next;
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
  pub job:       Job,
  pub data_date: NaiveDate,
  /// Last stage entered before the unit finished.
  pub reached:   Stage,
  pub outcome:   UnitOutcome,
}

impl UnitReport {
  pub fn stage(&self) -> Stage {
    match self.outcome {
      UnitOutcome::Failed(_) => Stage::Failed,
      _ => Stage::Done,
    }
  }
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Explicit replacement for process-wide logging and cycle state. One per
/// call to [`Pipeline::run`](crate::Pipeline::run).
#[derive(Debug)]
pub struct RunContext {
  run_id:              Uuid,
  load_date:           NaiveDate,
  span:                Span,
  pub(crate) counters: RunCounters,
  units:               Vec<UnitReport>,
}

impl RunContext {
  pub fn new(load_date: NaiveDate) -> Self {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, %load_date);
    Self { run_id, load_date, span, counters: RunCounters::default(), units: Vec::new() }
  }

  pub fn run_id(&self) -> Uuid { self.run_id }

  pub fn load_date(&self) -> NaiveDate { self.load_date }

  pub fn span(&self) -> &Span { &self.span }

  pub fn counters(&self) -> &RunCounters { &self.counters }

  pub fn begin(&self, job: Job, data_date: NaiveDate) -> Unit {
    Unit { job, data_date, stage: Stage::Idle }
  }

  /// Record the outcome of `unit`.
  pub fn finish(&mut self, unit: Unit, outcome: UnitOutcome) {
    match outcome {
      UnitOutcome::Failed(_) => self.counters.units_failed += 1,
      _ => self.counters.units_ok += 1,
    }
    debug!(job = %unit.job, data_date = %unit.data_date, from = %unit.stage, ?outcome, "unit finished");
    self.units.push(UnitReport {
      job: unit.job,
      data_date: unit.data_date,
      reached: unit.stage,
      outcome,
    });
  }

  /// Log every flattening diagnostic as a warning and count them.
  pub fn report_diagnostics(&mut self, unit: &Unit, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
      match diagnostic {
        Diagnostic::NonNumeric { team_id, category, label, raw } => warn!(
          job = %unit.job,
          data_date = %unit.data_date,
          team_id = %team_id,
          level1 = %category,
          level2 = %label,
          raw = %raw,
          "value is not numeric; kept as null"
        ),
        other => warn!(job = %unit.job, data_date = %unit.data_date, "{other}"),
      }
    }
    self.counters.diagnostics += diagnostics.len();
  }

  pub fn into_report(self) -> RunReport {
    RunReport {
      run_id:    self.run_id,
      load_date: self.load_date,
      counters:  self.counters,
      units:     self.units,
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub run_id:    Uuid,
  pub load_date: NaiveDate,
  pub counters:  RunCounters,
  pub units:     Vec<UnitReport>,
}

impl RunReport {
  pub fn failed_units(&self) -> impl Iterator<Item = &UnitReport> {
    self.units.iter().filter(|u| u.stage() == Stage::Failed)
  }
}

impl fmt::Display for RunReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let c = &self.counters;
    write!(
      f,
      "run {} for {}: {} unit(s) ok, {} failed, {} row(s) written, {} already loaded",
      self.run_id, self.load_date, c.units_ok, c.units_failed, c.rows_written, c.rows_skipped_existing
    )
  }
}

#[cfg(test)]
mod tests {
  use gridiron_core::row::Category;

  use super::*;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 9, 8).unwrap() }

  #[test]
  fn finishing_units_updates_counters() {
    let mut ctx = RunContext::new(date());

    let mut unit = ctx.begin(Job::Games, date());
    unit.advance(Stage::Fetching);
    unit.advance(Stage::Writing);
    ctx.finish(unit, UnitOutcome::Written(4));

    let mut unit = ctx.begin(Job::Games, date().succ_opt().unwrap());
    unit.advance(Stage::Fetching);
    ctx.finish(unit, UnitOutcome::Failed("status 502".into()));

    let report = ctx.into_report();
    assert_eq!(report.counters.units_ok, 1);
    assert_eq!(report.counters.units_failed, 1);
    assert_eq!(report.units[0].stage(), Stage::Done);

    let failed: Vec<_> = report.failed_units().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reached, Stage::Fetching);
  }

  #[test]
  fn diagnostics_are_counted() {
    let mut ctx = RunContext::new(date());
    let unit = ctx.begin(Job::Teams, date());
    ctx.report_diagnostics(&unit, &[
      Diagnostic::MissingField { team_id: "KC".into(), field: "byeWeeks.2022".into() },
      Diagnostic::NonNumeric {
        team_id:  "KC".into(),
        category: Category::TeamInfo,
        label:    "teamName".into(),
        raw:      "\"Chiefs\"".into(),
      },
    ]);
    assert_eq!(ctx.counters().diagnostics, 2);
  }

  #[test]
  fn terminal_stages() {
    assert!(Stage::Done.is_terminal());
    assert!(Stage::Failed.is_terminal());
    assert!(!Stage::Writing.is_terminal());
  }
}
