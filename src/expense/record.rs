//! The live and archived expense record models.

use rusqlite::{Row, types::Type};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, db::MapRow};

use super::Category;

/// The row ID of an expense record in the database.
pub type ExpenseId = i64;

/// The largest amount a single expense may record: 999,999,999.99.
// 99_999_999_999 scaled by 10^-2, split into the low/mid 32-bit words.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_215_752_191, 23, 0, false, 2);

/// The earliest year an expense may be recorded for.
pub const MIN_YEAR: i32 = 2020;

/// The latest year an expense may be recorded for.
pub const MAX_YEAR: i32 = 2050;

/// A categorized monthly expense in the live store.
///
/// At most one live record exists per (category, month, year); only the
/// amount (and `updated_at`) changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRecord {
    /// The record's unique ID, assigned on creation.
    pub id: ExpenseId,
    /// The category the expense is recorded under.
    pub category: Category,
    /// The amount spent, positive with two decimal places.
    pub amount: Decimal,
    /// The month the expense belongs to (1-12).
    pub month: u8,
    /// The year the expense belongs to.
    pub year: i32,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record's amount was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An expense that was migrated out of the live store.
///
/// Only the archive manager creates these; `archived_at` is the time of the
/// migration and is never earlier than `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedExpenseRecord {
    /// The expense as it was in the live store.
    #[serde(flatten)]
    pub record: ExpenseRecord,
    /// When the record was migrated into the archive.
    #[serde(with = "time::serde::rfc3339")]
    pub archived_at: OffsetDateTime,
}

/// A validated expense that has not been inserted into the live store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub(crate) category: Category,
    pub(crate) amount: Decimal,
    pub(crate) month: u8,
    pub(crate) year: i32,
}

impl NewExpense {
    /// Validate the fields for a new expense.
    ///
    /// # Errors
    /// Returns [Error::InvalidExpense] if the amount is not positive, has more
    /// than two decimal places, exceeds [MAX_AMOUNT], or if the month/year
    /// fall outside the supported window.
    pub fn new(category: Category, amount: Decimal, month: u8, year: i32) -> Result<Self, Error> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidExpense(format!(
                "amount must be positive, got {amount}"
            )));
        }

        if amount > MAX_AMOUNT {
            return Err(Error::InvalidExpense(format!(
                "amount must not exceed {MAX_AMOUNT}, got {amount}"
            )));
        }

        if amount.scale() > 2 {
            return Err(Error::InvalidExpense(format!(
                "amount must have at most two decimal places, got {amount}"
            )));
        }

        if !(1..=12).contains(&month) {
            return Err(Error::InvalidExpense(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::InvalidExpense(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
            )));
        }

        Ok(Self {
            category,
            amount,
            month,
            year,
        })
    }
}

/// Parse a TEXT column holding a decimal amount.
///
/// Amounts are stored as text so that no value ever passes through binary
/// floating point on its way in or out of the database.
pub(crate) fn decimal_from_row(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;
    text.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

fn category_from_row(row: &Row, index: usize) -> Result<Category, rusqlite::Error> {
    let text: String = row.get(index)?;
    text.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

impl MapRow for ExpenseRecord {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            category: category_from_row(row, 1)?,
            amount: decimal_from_row(row, 2)?,
            month: row.get(3)?,
            year: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl MapRow for ArchivedExpenseRecord {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            record: ExpenseRecord::map_row(row)?,
            archived_at: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::{Error, expense::Category};

    use super::{MAX_AMOUNT, NewExpense};

    #[test]
    fn new_expense_accepts_a_two_decimal_amount() {
        let amount: Decimal = "1234.56".parse().unwrap();

        let expense = NewExpense::new(Category::Travel, amount, 6, 2024).unwrap();

        assert_eq!(expense.amount, amount);
    }

    #[test]
    fn new_expense_rejects_non_positive_amounts() {
        for text in ["0", "-1.00"] {
            let amount: Decimal = text.parse().unwrap();
            let result = NewExpense::new(Category::Travel, amount, 6, 2024);
            assert!(matches!(result, Err(Error::InvalidExpense(_))));
        }
    }

    #[test]
    fn new_expense_rejects_amounts_over_the_maximum() {
        let amount = MAX_AMOUNT + Decimal::new(1, 2);

        let result = NewExpense::new(Category::Salaries, amount, 1, 2024);

        assert!(matches!(result, Err(Error::InvalidExpense(_))));
    }

    #[test]
    fn new_expense_rejects_sub_cent_precision() {
        let amount: Decimal = "10.005".parse().unwrap();

        let result = NewExpense::new(Category::Utilities, amount, 1, 2024);

        assert!(matches!(result, Err(Error::InvalidExpense(_))));
    }

    #[test]
    fn new_expense_rejects_out_of_range_periods() {
        let amount = Decimal::from(100);

        assert!(NewExpense::new(Category::Travel, amount, 0, 2024).is_err());
        assert!(NewExpense::new(Category::Travel, amount, 13, 2024).is_err());
        assert!(NewExpense::new(Category::Travel, amount, 1, 2019).is_err());
        assert!(NewExpense::new(Category::Travel, amount, 1, 2051).is_err());
    }

    #[test]
    fn max_amount_is_the_documented_limit() {
        assert_eq!(MAX_AMOUNT, "999999999.99".parse::<Decimal>().unwrap());
    }
}
