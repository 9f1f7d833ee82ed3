//! SQL schema for the gridiron SQLite warehouse.
//!
//! Executed once at connection startup. Mirrors the cloud tables: the
//! team-metrics table is long-form and partitioned by `dataDate`, which here
//! is simply indexed.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS games (
    gameID          TEXT NOT NULL,
    seasonType      TEXT,
    away            TEXT,
    gameDate        TEXT,            -- ISO 8601 date
    espnID          TEXT,
    teamIDHome      TEXT,
    gameStatus      TEXT,
    gameWeek        TEXT,
    teamIDAway      TEXT,
    home            TEXT,
    espnLink        TEXT,
    cbsLink         TEXT,
    gameTime        TEXT,
    gameTime_epoch  TEXT,            -- RFC 3339 UTC
    season          TEXT,
    neutralSite     INTEGER NOT NULL DEFAULT 0,
    gameStatusCode  TEXT,
    dataDate        TEXT NOT NULL
);

-- One row per (team, Level1, Level2) per day.
CREATE TABLE IF NOT EXISTS team_metrics (
    teamID    TEXT NOT NULL,
    Level1    TEXT NOT NULL,   -- 'Team Info' | 'Bye Weeks' | 'Team Stats' | 'Top Performers'
    Level2    TEXT NOT NULL,
    Value     REAL,
    PlayerID  TEXT,            -- only set for 'Top Performers'
    dataDate  TEXT NOT NULL,
    CHECK (PlayerID IS NULL OR Level1 = 'Top Performers')
);

CREATE INDEX IF NOT EXISTS games_id_idx          ON games(gameID);
CREATE INDEX IF NOT EXISTS games_date_idx        ON games(dataDate);
CREATE INDEX IF NOT EXISTS team_metrics_date_idx ON team_metrics(dataDate, teamID);

PRAGMA user_version = 1;
";
