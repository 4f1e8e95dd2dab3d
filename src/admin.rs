//! HTTP handlers for the trends query and the administrative surface.
//!
//! These are thin JSON wrappers: range resolution, aggregation and the
//! lifecycle operations all live in their own modules.

use std::time::Instant;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use time::{Date, macros::time};

use crate::{
    AppState, Error,
    archive::{ArchiveRunResult, ArchiveStats},
    expense,
    monitor::QuerySample,
    range::{ExpenseRange, resolve},
    scheduler::{MaintenanceResult, SchedulerStatus},
    trends::{GroupBy, TrendReport, aggregate},
};

#[derive(Debug, Deserialize)]
pub(crate) struct TrendsParams {
    start_year: i32,
    end_year: i32,
    start_month: Option<u8>,
    end_month: Option<u8>,
    #[serde(default = "default_group_by")]
    group_by: GroupBy,
}

fn default_group_by() -> GroupBy {
    GroupBy::Month
}

/// Resolve the requested range, query the live store and aggregate the
/// matching expenses into a trend report.
pub(crate) async fn get_trends(
    State(state): State<AppState>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<TrendReport>, Error> {
    let clauses = resolve(&ExpenseRange {
        start_year: params.start_year,
        end_year: params.end_year,
        start_month: params.start_month,
        end_month: params.end_month,
    })?;

    let started = Instant::now();
    let records = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        expense::get_expenses_in_range(&clauses, &connection)?
    };
    state.monitor.record_query("trends", started.elapsed());

    Ok(Json(aggregate(&records, params.group_by)))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ArchiveParams {
    retention_years: Option<u32>,
}

/// Run an archival pass now, optionally overriding the retention window.
pub(crate) async fn post_archive(
    State(state): State<AppState>,
    body: Option<Json<ArchiveParams>>,
) -> Result<Json<ArchiveRunResult>, Error> {
    let params = body.map(|Json(params)| params).unwrap_or_default();

    let result = state.scheduler.trigger_archival(params.retention_years)?;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestoreParams {
    start: Date,
    end: Date,
}

/// Restore archived expenses created within an inclusive date range.
pub(crate) async fn post_restore(
    State(state): State<AppState>,
    Json(params): Json<RestoreParams>,
) -> Result<Json<Value>, Error> {
    let start = params.start.midnight().assume_utc();
    let end = params.end.with_time(time!(23:59:59)).assume_utc();

    let restored = state.archive.restore_from_archive(start, end)?;

    Ok(Json(json!({ "restored_count": restored })))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CleanupParams {
    max_archive_years: Option<u32>,
}

/// Delete archived expenses past the maximum retention horizon.
pub(crate) async fn post_cleanup(
    State(state): State<AppState>,
    body: Option<Json<CleanupParams>>,
) -> Result<Json<Value>, Error> {
    let params = body.map(|Json(params)| params).unwrap_or_default();
    let horizon = params
        .max_archive_years
        .unwrap_or(state.lifecycle.max_archive_years);

    let deleted = state.archive.cleanup_old_archives(horizon)?;

    Ok(Json(json!({ "deleted_count": deleted })))
}

/// Aggregate statistics over the archive store.
pub(crate) async fn get_archive_stats(
    State(state): State<AppState>,
) -> Result<Json<ArchiveStats>, Error> {
    Ok(Json(state.archive.archive_stats()?))
}

/// Run a maintenance pass now: archive stats plus cleanup when enabled.
pub(crate) async fn post_maintenance(
    State(state): State<AppState>,
) -> Result<Json<MaintenanceResult>, Error> {
    Ok(Json(state.scheduler.trigger_maintenance()?))
}

/// The scheduler's per-job state.
pub(crate) async fn get_scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

/// The query performance monitor's recorded samples.
pub(crate) async fn get_monitor(State(state): State<AppState>) -> Json<Vec<QuerySample>> {
    Json(state.monitor.snapshot())
}
