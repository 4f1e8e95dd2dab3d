//! Runs the data-lifecycle jobs on a fixed cadence.
//!
//! Three named jobs exist: `archival` (monthly), `monitor-reset` (weekly) and
//! `maintenance` (monthly). Each job holds its own lock: a manual trigger
//! while the same job is running, or a scheduled tick overlapping a manual
//! run, fails fast with [Error::JobAlreadyRunning] instead of executing
//! concurrently against the same cutoff. Scheduled-run failures are logged
//! and recorded per job; they never take the process down.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    Error,
    archive::{ArchiveManager, ArchiveRunResult, ArchiveStats},
    config::{
        ARCHIVAL_INTERVAL, LifecycleConfig, MAINTENANCE_INTERVAL, MONITOR_RESET_INTERVAL,
    },
    monitor::QueryMonitor,
};

/// The scheduling options, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Whether `start()` actually schedules the jobs.
    pub enabled: bool,
    /// The cadence of the archival job.
    pub archival_interval: std::time::Duration,
    /// The cadence of the monitor-reset job.
    pub monitor_reset_interval: std::time::Duration,
    /// The cadence of the maintenance job.
    pub maintenance_interval: std::time::Duration,
}

impl SchedulerConfig {
    /// The standard cadences, enabled or not per the lifecycle config.
    pub fn from_lifecycle(lifecycle: &LifecycleConfig) -> Self {
        Self {
            enabled: lifecycle.scheduler_enabled,
            archival_interval: ARCHIVAL_INTERVAL,
            monitor_reset_interval: MONITOR_RESET_INTERVAL,
            maintenance_interval: MAINTENANCE_INTERVAL,
        }
    }
}

/// How a job's most recent run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    /// When the run finished.
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    /// Whether the run succeeded.
    pub success: bool,
    /// A short human-readable description of the outcome.
    pub detail: String,
}

/// The reported state of a single job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    /// The job's name.
    pub name: &'static str,
    /// Whether an interval task is scheduled for the job.
    pub scheduled: bool,
    /// Whether the job body is executing right now.
    pub running: bool,
    /// The most recent run's outcome, if the job has run.
    pub last_outcome: Option<JobOutcome>,
}

/// The reported state of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    /// Whether scheduling is globally enabled.
    pub enabled: bool,
    /// The per-job state.
    pub jobs: Vec<JobStatus>,
}

/// The outcome of one maintenance run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceResult {
    /// Archive statistics gathered during the run.
    pub stats: ArchiveStats,
    /// How many archived records cleanup deleted, or `None` when cleanup is
    /// not enabled.
    pub cleaned_up: Option<usize>,
}

struct Job {
    name: &'static str,
    guard: tokio::sync::Mutex<()>,
    running: AtomicBool,
    last_outcome: Mutex<Option<JobOutcome>>,
}

impl Job {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            guard: tokio::sync::Mutex::new(()),
            running: AtomicBool::new(false),
            last_outcome: Mutex::new(None),
        }
    }

    fn status(&self, scheduled: bool) -> JobStatus {
        JobStatus {
            name: self.name,
            scheduled,
            running: self.running.load(Ordering::SeqCst),
            last_outcome: self
                .last_outcome
                .lock()
                .map(|outcome| outcome.clone())
                .unwrap_or(None),
        }
    }
}

struct Jobs {
    archival: Job,
    monitor_reset: Job,
    maintenance: Job,
}

/// Schedules and triggers the data-lifecycle jobs.
pub struct Scheduler {
    config: SchedulerConfig,
    lifecycle: LifecycleConfig,
    archive: ArchiveManager,
    monitor: QueryMonitor,
    jobs: Jobs,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler; no jobs run until [Scheduler::start] is called.
    pub fn new(
        config: SchedulerConfig,
        lifecycle: LifecycleConfig,
        archive: ArchiveManager,
        monitor: QueryMonitor,
    ) -> Self {
        Self {
            config,
            lifecycle,
            archive,
            monitor,
            jobs: Jobs {
                archival: Job::new("archival"),
                monitor_reset: Job::new("monitor-reset"),
                maintenance: Job::new("maintenance"),
            },
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the interval tasks for all jobs.
    ///
    /// Does nothing when scheduling is disabled or already started.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            tracing::info!("scheduling is disabled, no jobs will run automatically");
            return;
        }

        let Ok(mut handles) = self.handles.lock() else {
            tracing::error!("could not lock the scheduler task list");
            return;
        };
        if !handles.is_empty() {
            return;
        }

        let scheduler = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.config.archival_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; jobs should wait one period.
            interval.tick().await;
            loop {
                interval.tick().await;
                match scheduler.trigger_archival(None) {
                    Ok(result) => tracing::info!(
                        "scheduled archival run archived {} and deleted {} records",
                        result.archived_count,
                        result.deleted_count
                    ),
                    Err(error) => tracing::error!("scheduled archival run failed: {error}"),
                }
            }
        }));

        let scheduler = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.config.monitor_reset_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(error) = scheduler.trigger_monitor_reset() {
                    tracing::error!("scheduled monitor reset failed: {error}");
                }
            }
        }));

        let scheduler = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.config.maintenance_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                match scheduler.trigger_maintenance() {
                    Ok(result) => tracing::info!(
                        "scheduled maintenance run saw {} archived records",
                        result.stats.total_records
                    ),
                    Err(error) => tracing::error!("scheduled maintenance run failed: {error}"),
                }
            }
        }));

        tracing::info!("scheduled {} lifecycle jobs", handles.len());
    }

    /// Abort the scheduled interval tasks.
    pub fn stop(&self) {
        let Ok(mut handles) = self.handles.lock() else {
            return;
        };

        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    /// Run the archival job now, with an optional retention override.
    ///
    /// # Errors
    /// Returns [Error::JobAlreadyRunning] if an archival run is in flight,
    /// or any error the archive manager raises.
    pub fn trigger_archival(
        &self,
        retention_years: Option<u32>,
    ) -> Result<ArchiveRunResult, Error> {
        let retention = retention_years.unwrap_or(self.lifecycle.data_retention_years);
        let batch_size = self.lifecycle.archive_batch_size;

        self.run_job(&self.jobs.archival, || {
            self.archive.archive_old_data(retention, batch_size)
        })
    }

    /// Run the maintenance job now: gather archive statistics and, when
    /// cleanup is enabled, delete archives past the retention horizon.
    ///
    /// # Errors
    /// Returns [Error::JobAlreadyRunning] if a maintenance run is in flight,
    /// or any error the archive manager raises.
    pub fn trigger_maintenance(&self) -> Result<MaintenanceResult, Error> {
        self.run_job(&self.jobs.maintenance, || {
            let stats = self.archive.archive_stats()?;
            let cleaned_up = if self.lifecycle.cleanup_old_archives {
                Some(
                    self.archive
                        .cleanup_old_archives(self.lifecycle.max_archive_years)?,
                )
            } else {
                None
            };

            Ok(MaintenanceResult { stats, cleaned_up })
        })
    }

    fn trigger_monitor_reset(&self) -> Result<(), Error> {
        self.run_job(&self.jobs.monitor_reset, || {
            self.monitor.reset();
            Ok(())
        })
    }

    /// The scheduler's current state.
    pub fn status(&self) -> SchedulerStatus {
        let scheduled = self.config.enabled
            && self
                .handles
                .lock()
                .map(|handles| !handles.is_empty())
                .unwrap_or(false);

        SchedulerStatus {
            enabled: self.config.enabled,
            jobs: vec![
                self.jobs.archival.status(scheduled),
                self.jobs.monitor_reset.status(scheduled),
                self.jobs.maintenance.status(scheduled),
            ],
        }
    }

    fn run_job<T>(&self, job: &Job, body: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
        let Ok(_guard) = job.guard.try_lock() else {
            return Err(Error::JobAlreadyRunning(job.name));
        };

        job.running.store(true, Ordering::SeqCst);
        let result = body();
        job.running.store(false, Ordering::SeqCst);

        let outcome = JobOutcome {
            finished_at: OffsetDateTime::now_utc(),
            success: result.is_ok(),
            detail: match &result {
                Ok(_) => "completed".to_owned(),
                Err(error) => error.to_string(),
            },
        };
        if let Ok(mut last_outcome) = job.last_outcome.lock() {
            *last_outcome = Some(outcome);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::{Connection, params};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        archive::ArchiveManager,
        config::LifecycleConfig,
        db::initialize,
        monitor::QueryMonitor,
    };

    use super::{Scheduler, SchedulerConfig};

    fn get_test_scheduler(lifecycle: LifecycleConfig) -> (Scheduler, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let connection = Arc::new(Mutex::new(conn));
        let monitor = QueryMonitor::new();
        let archive = ArchiveManager::new(connection.clone(), monitor.clone());

        let scheduler = Scheduler::new(
            SchedulerConfig::from_lifecycle(&lifecycle),
            lifecycle,
            archive,
            monitor,
        );

        (scheduler, connection)
    }

    fn insert_live_aged(connection: &Arc<Mutex<Connection>>, years_old: i64) {
        let created_at = OffsetDateTime::now_utc() - Duration::days(365 * years_old);
        let month = 1 + (years_old % 12) as u8;
        let conn = connection.lock().unwrap();
        conn.execute(
            "INSERT INTO expense (category, amount, month, year, created_at, updated_at) \
            VALUES ('Salaries', '100.00', ?1, 2020, ?2, ?2)",
            params![month, created_at],
        )
        .unwrap();
    }

    #[test]
    fn trigger_archival_uses_the_configured_retention() {
        let (scheduler, connection) = get_test_scheduler(LifecycleConfig::default());
        insert_live_aged(&connection, 11);
        insert_live_aged(&connection, 2);

        let result = scheduler.trigger_archival(None).unwrap();

        assert_eq!(result.archived_count, 1);
        assert_eq!(result.deleted_count, 1);
    }

    #[test]
    fn trigger_archival_honours_a_retention_override() {
        let (scheduler, connection) = get_test_scheduler(LifecycleConfig::default());
        insert_live_aged(&connection, 6);

        let default_run = scheduler.trigger_archival(None).unwrap();
        assert_eq!(default_run.archived_count, 0);

        let override_run = scheduler.trigger_archival(Some(5)).unwrap();
        assert_eq!(override_run.archived_count, 1);
    }

    #[test]
    fn an_overlapping_trigger_is_rejected() {
        let (scheduler, _connection) = get_test_scheduler(LifecycleConfig::default());

        let _guard = scheduler.jobs.archival.guard.try_lock().unwrap();
        let result = scheduler.trigger_archival(None);

        assert_eq!(result.unwrap_err(), Error::JobAlreadyRunning("archival"));
    }

    #[test]
    fn the_job_lock_is_released_after_a_run() {
        let (scheduler, _connection) = get_test_scheduler(LifecycleConfig::default());

        scheduler.trigger_archival(None).unwrap();

        assert!(scheduler.trigger_archival(None).is_ok());
    }

    #[test]
    fn maintenance_skips_cleanup_unless_enabled() {
        let (scheduler, _connection) = get_test_scheduler(LifecycleConfig::default());

        let result = scheduler.trigger_maintenance().unwrap();

        assert_eq!(result.cleaned_up, None);
    }

    #[test]
    fn maintenance_cleans_up_when_enabled() {
        let lifecycle = LifecycleConfig {
            cleanup_old_archives: true,
            ..LifecycleConfig::default()
        };
        let (scheduler, connection) = get_test_scheduler(lifecycle);
        insert_live_aged(&connection, 21);
        scheduler.trigger_archival(None).unwrap();

        let result = scheduler.trigger_maintenance().unwrap();

        assert_eq!(result.cleaned_up, Some(1));
        assert_eq!(result.stats.total_records, 1);
    }

    #[test]
    fn status_reports_all_jobs_and_the_enabled_flag() {
        let (scheduler, _connection) = get_test_scheduler(LifecycleConfig::default());

        let status = scheduler.status();

        assert!(!status.enabled);
        let names: Vec<&str> = status.jobs.iter().map(|job| job.name).collect();
        assert_eq!(names, vec!["archival", "monitor-reset", "maintenance"]);
        assert!(status.jobs.iter().all(|job| !job.scheduled && !job.running));
    }

    #[test]
    fn a_run_records_its_outcome() {
        let (scheduler, _connection) = get_test_scheduler(LifecycleConfig::default());

        scheduler.trigger_archival(None).unwrap();

        let status = scheduler.status();
        let outcome = status.jobs[0].last_outcome.as_ref().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.detail, "completed");
    }
}
