/*! Defines and implements traits for interacting with the application's database. */

use rusqlite::{Connection, Error, Row, Transaction as SqlTransaction};

use crate::expense::{ArchivedExpenseRecord, ExpenseRecord};

/// A trait for adding an object schema to a database.
pub trait CreateTable {
    /// Create a table (and any supporting indexes) for the model.
    ///
    /// # Errors
    /// Returns an error if the table already exists or if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), Error>;
}

/// A trait for mapping a `rusqlite::Row` to a concrete rust type.
pub trait MapRow {
    /// The type the row is converted into.
    type ReturnType;

    /// Convert a row into a concrete type.
    ///
    /// **Note:** This function expects that the row object contains all the
    /// table columns in the order they were defined.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the
    /// corresponding rust type, or if an invalid column index was used.
    fn map_row(row: &Row) -> Result<Self::ReturnType, Error>;
}

impl CreateTable for ExpenseRecord {
    fn create_table(connection: &Connection) -> Result<(), Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL,
                amount TEXT NOT NULL,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(category, month, year)
                )",
            (),
        )?;

        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_expense_period ON expense(year, month)",
            (),
        )?;
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_expense_created_at ON expense(created_at)",
            (),
        )?;

        Ok(())
    }
}

impl CreateTable for ArchivedExpenseRecord {
    fn create_table(connection: &Connection) -> Result<(), Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS expense_archive (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL,
                amount TEXT NOT NULL,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                archived_at TEXT NOT NULL
                )",
            (),
        )?;

        // The stats, restore and cleanup queries all filter on one of these.
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_archive_period ON expense_archive(year, month)",
            (),
        )?;
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_archive_category ON expense_archive(category)",
            (),
        )?;
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_archive_archived_at ON expense_archive(archived_at)",
            (),
        )?;
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_archive_created_at ON expense_archive(created_at)",
            (),
        )?;

        Ok(())
    }
}

/// Create the tables for the live and archive expense stores if they do not
/// exist yet.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), crate::Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    ExpenseRecord::create_table(&transaction)?;
    ArchivedExpenseRecord::create_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
