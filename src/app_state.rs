//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    archive::ArchiveManager,
    config::LifecycleConfig,
    db::initialize,
    monitor::QueryMonitor,
    scheduler::{Scheduler, SchedulerConfig},
};

/// The state of the REST server.
///
/// The database connection is the only store handle in the process; every
/// component that needs it gets it from here at construction.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The data-lifecycle options.
    pub lifecycle: LifecycleConfig,

    /// The archive manager over the same connection.
    pub archive: ArchiveManager,

    /// The scheduler for the lifecycle jobs.
    pub scheduler: Arc<Scheduler>,

    /// The query performance monitor shared across the query paths.
    pub monitor: QueryMonitor,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the live and archive stores if they are missing.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, lifecycle: LifecycleConfig) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let monitor = QueryMonitor::new();
        let archive = ArchiveManager::new(connection.clone(), monitor.clone());
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::from_lifecycle(&lifecycle),
            lifecycle.clone(),
            archive.clone(),
            monitor.clone(),
        ));

        Ok(Self {
            db_connection: connection,
            lifecycle,
            archive,
            scheduler,
            monitor,
        })
    }
}
