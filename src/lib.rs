//! Outlay tracks categorized monthly organizational expenses and serves the
//! aggregated trends behind the expense charts.
//!
//! The interesting parts live in three places: [`trends`] turns a date-range
//! query into grouped financial summaries, [`archive`] manages the long-term
//! lifecycle of expense records (batched archival, restoration, bounded
//! cleanup), and [`scheduler`] runs the lifecycle jobs on a fixed cadence.
//! Everything else is thin wiring around them.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod admin;
mod app_state;
pub mod archive;
pub mod config;
pub mod db;
pub mod expense;
pub mod monitor;
pub mod range;
mod routing;
pub mod scheduler;
pub mod trends;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A date range was given with its bounds out of order, either by the
    /// range resolver (years/months) or by an archive restore request.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// An expense failed validation (non-positive amount, amount over the
    /// supported maximum, or a month/year outside the supported window).
    #[error("invalid expense: {0}")]
    InvalidExpense(String),

    /// An expense already exists for the same category, month and year.
    ///
    /// Live records are unique per (category, month, year) triple.
    #[error("an expense already exists for this category and period")]
    DuplicatePeriod,

    /// A manual trigger or scheduled tick tried to run a job that is already
    /// in flight. The caller should retry once the current run finishes.
    #[error("the job \"{0}\" is already running")]
    JobAlreadyRunning(&'static str),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl Error {
    /// The stable machine-readable code reported to operators.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRange(_) => "RANGE_ERROR",
            Error::InvalidExpense(_) => "INVALID_EXPENSE",
            Error::DuplicatePeriod => "DUPLICATE_PERIOD",
            Error::JobAlreadyRunning(_) => "JOB_RUNNING",
            Error::NotFound => "NOT_FOUND",
            Error::SqlError(_) => "STORE_ERROR",
            Error::DatabaseLockError => "STORE_ERROR",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("expense.category") =>
            {
                Error::DuplicatePeriod
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidRange(_) | Error::InvalidExpense(_) => StatusCode::BAD_REQUEST,
            Error::JobAlreadyRunning(_) | Error::DuplicatePeriod => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::SqlError(_) | Error::DatabaseLockError => {
                // Store errors are logged server side and reported to the
                // client without the underlying SQL detail.
                tracing::error!("An unexpected error occurred: {}", self);
                let body = json!({
                    "code": self.code(),
                    "message": "an internal storage error occurred",
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
