//! Resolves a year/month range request into per-year query clauses.

use serde::Deserialize;

use crate::Error;

/// A date-range request over whole months.
///
/// Month bounds are optional; an absent bound leaves that end of the range
/// open within its year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExpenseRange {
    /// The first year in the range.
    pub start_year: i32,
    /// The last year in the range (inclusive).
    pub end_year: i32,
    /// The first month of `start_year` to include, if bounded.
    pub start_month: Option<u8>,
    /// The last month of `end_year` to include, if bounded.
    pub end_month: Option<u8>,
}

/// One year's worth of a resolved range: the year plus optional inclusive
/// month bounds. A clause with no month bounds covers the whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearClause {
    /// The year this clause covers.
    pub year: i32,
    /// The inclusive lower month bound, if any.
    pub month_from: Option<u8>,
    /// The inclusive upper month bound, if any.
    pub month_to: Option<u8>,
}

impl YearClause {
    fn full_year(year: i32) -> Self {
        Self {
            year,
            month_from: None,
            month_to: None,
        }
    }
}

/// Resolve a range request into one clause per year covered.
///
/// A same-year range yields a single clause carrying whichever month bounds
/// were supplied. A multi-year range yields a clause for the start year
/// (bounded below), full-year clauses for the years strictly in between, and
/// a clause for the end year (bounded above). The result is never empty.
///
/// # Errors
/// Returns [Error::InvalidRange] when `end_year < start_year`, or when the
/// range is within one year and `end_month < start_month`.
pub fn resolve(range: &ExpenseRange) -> Result<Vec<YearClause>, Error> {
    if range.end_year < range.start_year {
        return Err(Error::InvalidRange(format!(
            "end year {} is before start year {}",
            range.end_year, range.start_year
        )));
    }

    if range.start_year == range.end_year {
        if let (Some(start_month), Some(end_month)) = (range.start_month, range.end_month)
            && end_month < start_month
        {
            return Err(Error::InvalidRange(format!(
                "end month {end_month} is before start month {start_month}"
            )));
        }

        return Ok(vec![YearClause {
            year: range.start_year,
            month_from: range.start_month,
            month_to: range.end_month,
        }]);
    }

    let mut clauses = vec![YearClause {
        year: range.start_year,
        month_from: range.start_month,
        month_to: None,
    }];

    for year in range.start_year + 1..range.end_year {
        clauses.push(YearClause::full_year(year));
    }

    clauses.push(YearClause {
        year: range.end_year,
        month_from: None,
        month_to: range.end_month,
    });

    Ok(clauses)
}

/// Translate resolved clauses into a parameterized SQL predicate over the
/// `year` and `month` columns, returning the WHERE fragment and its values.
pub fn to_sql_predicate(clauses: &[YearClause]) -> (String, Vec<i64>) {
    if clauses.is_empty() {
        // Matches nothing; resolve() never produces this.
        return ("0".to_owned(), Vec::new());
    }

    let mut parts = Vec::with_capacity(clauses.len());
    let mut values = Vec::new();

    for clause in clauses {
        let mut conditions = vec!["year = ?"];
        values.push(i64::from(clause.year));

        if let Some(month_from) = clause.month_from {
            conditions.push("month >= ?");
            values.push(i64::from(month_from));
        }

        if let Some(month_to) = clause.month_to {
            conditions.push("month <= ?");
            values.push(i64::from(month_to));
        }

        parts.push(format!("({})", conditions.join(" AND ")));
    }

    (parts.join(" OR "), values)
}
