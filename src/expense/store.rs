//! Database query helpers for the live expense store.

use rusqlite::{Connection, params, params_from_iter};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{Error, db::MapRow, range::YearClause};

use super::{ExpenseId, ExpenseRecord, NewExpense};

/// Insert a validated expense into the live store.
///
/// # Errors
/// Returns [Error::DuplicatePeriod] if a live expense already exists for the
/// same category, month and year, or [Error::SqlError] for any other SQL
/// error.
pub fn create_expense(expense: NewExpense, connection: &Connection) -> Result<ExpenseRecord, Error> {
    let now = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO expense (category, amount, month, year, created_at, updated_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            expense.category.as_str(),
            expense.amount.to_string(),
            expense.month,
            expense.year,
            now,
            now,
        ],
    )?;

    Ok(ExpenseRecord {
        id: connection.last_insert_rowid(),
        category: expense.category,
        amount: expense.amount,
        month: expense.month,
        year: expense.year,
        created_at: now,
        updated_at: now,
    })
}

/// Set a new amount on an existing expense, refreshing its `updated_at`.
///
/// # Errors
/// Returns [Error::NotFound] if no expense has the given ID.
pub fn update_expense_amount(
    id: ExpenseId,
    amount: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    let updated = connection.execute(
        "UPDATE expense SET amount = ?1, updated_at = ?2 WHERE id = ?3",
        params![amount.to_string(), OffsetDateTime::now_utc(), id],
    )?;

    if updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete an expense from the live store.
///
/// # Errors
/// Returns [Error::NotFound] if no expense has the given ID.
pub fn delete_expense(id: ExpenseId, connection: &Connection) -> Result<(), Error> {
    let deleted = connection.execute("DELETE FROM expense WHERE id = ?1", params![id])?;

    if deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the live expenses matched by a set of resolved year clauses, ordered
/// by year, month and category — the order the trend aggregator expects.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn get_expenses_in_range(
    clauses: &[YearClause],
    connection: &Connection,
) -> Result<Vec<ExpenseRecord>, Error> {
    let (predicate, values) = crate::range::to_sql_predicate(clauses);

    let query = format!(
        "SELECT id, category, amount, month, year, created_at, updated_at FROM expense \
        WHERE {predicate} \
        ORDER BY year ASC, month ASC, category ASC"
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(values), ExpenseRecord::map_row)?
        .map(|record| record.map_err(Error::SqlError))
        .collect()
}
