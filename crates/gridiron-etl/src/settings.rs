//! Pipeline settings, deserialised from the `[pipeline]` section of the
//! trigger configuration. Every field has a default.

use std::{fmt, path::PathBuf, time::Duration};

use gridiron_core::flatten::StaticLayout;
use serde::Deserialize;

use crate::{Error, Result, writer::RetryPolicy};

/// A load job run on every trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
  /// Schedule rows from `getNFLGamesForDate`, one fetch per date.
  Games,
  /// Long-form team metrics from `getNFLTeams`.
  Teams,
}

impl fmt::Display for Job {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Job::Games => "NFL Games",
      Job::Teams => "NFL Teams",
    })
  }
}

/// How already-loaded rows are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
  /// Look up candidate natural ids. Games match on `gameID` across all dates;
  /// teams match on `(teamID, dataDate)`.
  #[default]
  PerKey,
  /// Skip the whole batch if any row already exists for its `dataDate`.
  Partition,
}

/// What to do when the existing-key lookup itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
  /// Log and proceed as if nothing were loaded yet. Favours getting data in
  /// over strict dedup; a transient read failure can double-insert.
  #[default]
  AssumeEmpty,
  /// Fail the unit of work.
  Fail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DedupSettings {
  #[serde(default)]
  pub mode:            DedupMode,
  #[serde(default)]
  pub on_lookup_error: LookupFailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
  /// Consecutive dates to fetch, starting at the load date.
  #[serde(default = "default_days")]
  pub days:        u32,
  /// Delete game rows whose `dataDate` is more than this many days before the
  /// load date, before fetching.
  #[serde(default)]
  pub retain_days: Option<u32>,
}

impl Default for ScheduleSettings {
  fn default() -> Self { Self { days: default_days(), retain_days: None } }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamSettings {
  /// Same as [`ScheduleSettings::retain_days`], for the metrics table.
  #[serde(default)]
  pub retain_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
  #[serde(default = "default_lookup_secs")]
  pub lookup_secs: u64,
  /// Per write attempt; also bounds stale-row deletes.
  #[serde(default = "default_write_secs")]
  pub write_secs:  u64,
}

impl Timeouts {
  pub fn lookup(&self) -> Duration { Duration::from_secs(self.lookup_secs) }

  pub fn write(&self) -> Duration { Duration::from_secs(self.write_secs) }
}

impl Default for Timeouts {
  fn default() -> Self {
    Self { lookup_secs: default_lookup_secs(), write_secs: default_write_secs() }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
  #[serde(default = "default_jobs")]
  pub jobs:          Vec<Job>,
  #[serde(default)]
  pub schedule:      ScheduleSettings,
  #[serde(default)]
  pub teams:         TeamSettings,
  #[serde(default)]
  pub dedup:         DedupSettings,
  #[serde(default)]
  pub retry:         RetryPolicy,
  #[serde(default)]
  pub timeouts:      Timeouts,
  #[serde(default)]
  pub static_groups: StaticLayout,
  /// Write each raw teams payload here before flattening.
  #[serde(default)]
  pub raw_dump_dir:  Option<PathBuf>,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self {
      jobs:          default_jobs(),
      schedule:      ScheduleSettings::default(),
      teams:         TeamSettings::default(),
      dedup:         DedupSettings::default(),
      retry:         RetryPolicy::default(),
      timeouts:      Timeouts::default(),
      static_groups: StaticLayout::default(),
      raw_dump_dir:  None,
    }
  }
}

impl PipelineSettings {
  /// Reject settings no run could succeed with.
  pub fn validate(&self) -> Result<()> {
    if self.jobs.is_empty() {
      return Err(Error::Settings("no jobs configured".into()));
    }
    if self.schedule.days == 0 {
      return Err(Error::Settings("schedule.days must be at least 1".into()));
    }
    if self.retry.attempts == 0 {
      return Err(Error::Settings("retry.attempts must be at least 1".into()));
    }
    Ok(())
  }
}

fn default_jobs() -> Vec<Job> { vec![Job::Games, Job::Teams] }

fn default_days() -> u32 { 1 }

fn default_lookup_secs() -> u64 { 30 }

fn default_write_secs() -> u64 { 60 }

#[cfg(test)]
mod tests {
  use gridiron_core::row::Category;
  use serde_json::json;

  use super::*;

  #[test]
  fn empty_section_gives_defaults() {
    let s: PipelineSettings = serde_json::from_value(json!({})).unwrap();
    assert_eq!(s.jobs, vec![Job::Games, Job::Teams]);
    assert_eq!(s.schedule.days, 1);
    assert_eq!(s.dedup.mode, DedupMode::PerKey);
    assert_eq!(s.dedup.on_lookup_error, LookupFailurePolicy::AssumeEmpty);
    assert_eq!(s.retry.attempts, 3);
    assert_eq!(s.static_groups, StaticLayout::default());
  }

  #[test]
  fn overrides_are_read() {
    let s: PipelineSettings = serde_json::from_value(json!({
      "jobs": ["teams"],
      "schedule": { "days": 7, "retain_days": 30 },
      "dedup": { "mode": "partition", "on_lookup_error": "fail" },
      "retry": { "attempts": 5, "base_delay_ms": 100 },
      "static_groups": [
        { "level1": "Team Info", "fields": [{ "source": "teamAbv", "label": "Abbrev" }] },
      ],
    }))
    .unwrap();
    assert_eq!(s.jobs, vec![Job::Teams]);
    assert_eq!(s.schedule.retain_days, Some(30));
    assert_eq!(s.dedup.mode, DedupMode::Partition);
    assert_eq!(s.dedup.on_lookup_error, LookupFailurePolicy::Fail);
    assert_eq!(s.retry.attempts, 5);
    assert_eq!(s.retry.multiplier, 2);
    assert_eq!(s.static_groups.groups[0].level1, Category::TeamInfo);
    assert_eq!(s.static_groups.groups[0].fields[0].label(), "Abbrev");
  }

  #[test]
  fn validation() {
    assert!(PipelineSettings::default().validate().is_ok());

    let mut s = PipelineSettings::default();
    s.schedule.days = 0;
    assert!(matches!(s.validate(), Err(Error::Settings(_))));

    let mut s = PipelineSettings::default();
    s.jobs.clear();
    assert!(matches!(s.validate(), Err(Error::Settings(_))));

    let mut s = PipelineSettings::default();
    s.retry.attempts = 0;
    assert!(matches!(s.validate(), Err(Error::Settings(m)) if m.contains("retry.attempts")));

    let s: PipelineSettings = serde_json::from_value(json!({ "retry": { "attempts": 0 } })).unwrap();
    assert!(s.validate().is_err());
  }
}
