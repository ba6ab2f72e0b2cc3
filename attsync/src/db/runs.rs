//! Sync run persistence
//!
//! Every queued fetch-and-process job gets one row, updated as it moves
//! through `queued → running → completed | failed | timed_out`.

use attsync_common::time::format_checkin_time;
use attsync_common::{Error, Result, TimeWindow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Queued,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Queued => "queued",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::TimedOut => "timed_out",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(RunState::Queued),
            "running" => Ok(RunState::Running),
            "completed" => Ok(RunState::Completed),
            "failed" => Ok(RunState::Failed),
            "timed_out" => Ok(RunState::TimedOut),
            other => Err(Error::Internal(format!("Unknown run state: {}", other))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::TimedOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Scheduled => "scheduled",
            RunTrigger::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(RunTrigger::Scheduled),
            "manual" => Ok(RunTrigger::Manual),
            other => Err(Error::Internal(format!("Unknown run trigger: {}", other))),
        }
    }
}

/// Counters written back when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub pages_fetched: u64,
    pub records_fetched: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub unmatched: u64,
    /// Records without a usable badge or time
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub trigger: RunTrigger,
    pub device_id: Option<i64>,
    pub device_ip: String,
    pub window_start: String,
    pub window_end: String,
    pub state: RunState,
    pub counts: RunCounts,
    pub error: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn run_from_row(row: &SqliteRow) -> Result<SyncRun> {
    let run_id: String = row.get("run_id");
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| Error::Internal(format!("Failed to parse run_id: {}", e)))?;

    let started_at: Option<String> = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");

    Ok(SyncRun {
        run_id,
        trigger: RunTrigger::parse(row.get::<&str, _>("trigger"))?,
        device_id: row.get("device_id"),
        device_ip: row.get("device_ip"),
        window_start: row.get("window_start"),
        window_end: row.get("window_end"),
        state: RunState::parse(row.get::<&str, _>("state"))?,
        counts: RunCounts {
            pages_fetched: row.get::<i64, _>("pages_fetched") as u64,
            records_fetched: row.get::<i64, _>("records_fetched") as u64,
            inserted: row.get::<i64, _>("inserted") as u64,
            duplicates: row.get::<i64, _>("duplicates") as u64,
            unmatched: row.get::<i64, _>("unmatched") as u64,
            skipped: row.get::<i64, _>("skipped") as u64,
        },
        error: row.get("error"),
        queued_at: parse_timestamp(row.get::<&str, _>("queued_at"), "queued_at")?,
        started_at: started_at
            .as_deref()
            .map(|s| parse_timestamp(s, "started_at"))
            .transpose()?,
        ended_at: ended_at
            .as_deref()
            .map(|s| parse_timestamp(s, "ended_at"))
            .transpose()?,
    })
}

/// Record a newly queued run
pub async fn insert_run(
    pool: &SqlitePool,
    trigger: RunTrigger,
    device_id: Option<i64>,
    device_ip: &str,
    window: &TimeWindow,
) -> Result<SyncRun> {
    let run = SyncRun {
        run_id: Uuid::new_v4(),
        trigger,
        device_id,
        device_ip: device_ip.to_string(),
        window_start: format_checkin_time(window.start),
        window_end: format_checkin_time(window.end),
        state: RunState::Queued,
        counts: RunCounts::default(),
        error: None,
        queued_at: Utc::now(),
        started_at: None,
        ended_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO sync_runs (
            run_id, trigger, device_id, device_ip, window_start, window_end, state, queued_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run.run_id.to_string())
    .bind(run.trigger.as_str())
    .bind(run.device_id)
    .bind(&run.device_ip)
    .bind(&run.window_start)
    .bind(&run.window_end)
    .bind(run.state.as_str())
    .bind(format_timestamp(run.queued_at))
    .execute(pool)
    .await?;

    Ok(run)
}

pub async fn mark_running(pool: &SqlitePool, run_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE sync_runs SET state = ?, started_at = ? WHERE run_id = ?")
        .bind(RunState::Running.as_str())
        .bind(format_timestamp(Utc::now()))
        .bind(run_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Move a run to a terminal state with its final counts
pub async fn finish_run(
    pool: &SqlitePool,
    run_id: Uuid,
    state: RunState,
    counts: &RunCounts,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sync_runs SET
            state = ?,
            pages_fetched = ?,
            records_fetched = ?,
            inserted = ?,
            duplicates = ?,
            unmatched = ?,
            skipped = ?,
            error = ?,
            ended_at = ?
        WHERE run_id = ?
        "#,
    )
    .bind(state.as_str())
    .bind(counts.pages_fetched as i64)
    .bind(counts.records_fetched as i64)
    .bind(counts.inserted as i64)
    .bind(counts.duplicates as i64)
    .bind(counts.unmatched as i64)
    .bind(counts.skipped as i64)
    .bind(error)
    .bind(format_timestamp(Utc::now()))
    .bind(run_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fail every run left `queued` or `running` by a previous process
///
/// The queue itself is in memory, so these rows have no worker that will
/// ever pick them up. Returns the number of runs closed.
pub async fn fail_interrupted_runs(pool: &SqlitePool, error: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE sync_runs SET
            state = ?,
            error = ?,
            ended_at = ?
        WHERE state IN (?, ?)
        "#,
    )
    .bind(RunState::Failed.as_str())
    .bind(error)
    .bind(format_timestamp(Utc::now()))
    .bind(RunState::Queued.as_str())
    .bind(RunState::Running.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn get_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<SyncRun>> {
    let row = sqlx::query("SELECT * FROM sync_runs WHERE run_id = ?")
        .bind(run_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(run_from_row).transpose()
}

/// Most recent runs first
pub async fn list_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<SyncRun>> {
    let rows = sqlx::query("SELECT * FROM sync_runs ORDER BY queued_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(run_from_row).collect()
}
