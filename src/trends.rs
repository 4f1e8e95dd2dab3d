//! Aggregates expense records into grouped trend summaries for the charts.
//!
//! All arithmetic is done with [`Decimal`] so that a group's total always
//! equals the exact sum of its breakdown entries; amounts never pass through
//! binary floating point.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::expense::{Category, ExpenseRecord};

/// How to bucket expense records when aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One group per (year, month) pair.
    Month,
    /// One group per year.
    Year,
    /// One group per category.
    Category,
}

/// A category's share of a period group's total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAmount {
    /// The category.
    pub category: Category,
    /// The summed amount for the category within the group.
    pub amount: Decimal,
}

/// A period's share of a category group's total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodAmount {
    /// The month of the period (1-12).
    pub month: u8,
    /// The year of the period.
    pub year: i32,
    /// The summed amount for the period within the group.
    pub amount: Decimal,
}

/// One aggregated bucket of expenses.
///
/// The shape depends on the grouping mode; in every shape `total` equals the
/// exact sum of the breakdown amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrendGroup {
    /// Expenses for a single month, broken down by category.
    Monthly {
        /// The month (1-12).
        month: u8,
        /// The year.
        year: i32,
        /// The month's total.
        total: Decimal,
        /// Per-category totals summing to `total`.
        category_breakdown: Vec<CategoryAmount>,
    },
    /// Expenses for a single year, broken down by category.
    Yearly {
        /// The year.
        year: i32,
        /// The year's total.
        total: Decimal,
        /// Per-category totals summing to `total`.
        category_breakdown: Vec<CategoryAmount>,
    },
    /// Expenses for a single category, broken down by month.
    Category {
        /// The category.
        category: Category,
        /// The category's total.
        total: Decimal,
        /// Per-period totals summing to `total`.
        monthly_breakdown: Vec<PeriodAmount>,
    },
}

impl TrendGroup {
    /// The group's total amount.
    pub fn total(&self) -> Decimal {
        match self {
            TrendGroup::Monthly { total, .. }
            | TrendGroup::Yearly { total, .. }
            | TrendGroup::Category { total, .. } => *total,
        }
    }
}

/// Summary statistics computed over the group totals (not the raw records).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    /// The sum of all group totals.
    pub total: Decimal,
    /// `total` divided by the group count, rounded to two decimal places.
    /// Zero when there are no groups.
    pub average: Decimal,
    /// The largest group total, or `None` when there are no groups.
    ///
    /// `None` distinguishes "no data" from a group that genuinely totals
    /// zero, which a zero sentinel could not.
    pub highest: Option<Decimal>,
    /// The smallest group total, or `None` when there are no groups.
    pub lowest: Option<Decimal>,
}

/// The aggregation output: the groups plus cross-group summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    /// The aggregated groups.
    pub groups: Vec<TrendGroup>,
    /// Summary statistics over the group totals.
    pub summary: TrendSummary,
}

/// Aggregate expense records into trend groups.
///
/// A single pass accumulates each record's amount into its group total and
/// the group's nested breakdown. Monthly and yearly groups come back in
/// ascending period order; category groups in descending order of total.
pub fn aggregate(records: &[ExpenseRecord], group_by: GroupBy) -> TrendReport {
    let groups = match group_by {
        GroupBy::Month => aggregate_by_month(records),
        GroupBy::Year => aggregate_by_year(records),
        GroupBy::Category => aggregate_by_category(records),
    };

    let summary = summarize(&groups);

    TrendReport { groups, summary }
}

fn aggregate_by_month(records: &[ExpenseRecord]) -> Vec<TrendGroup> {
    // BTreeMap keys keep the (year, month) groups in ascending order.
    let mut totals: BTreeMap<(i32, u8), BTreeMap<Category, Decimal>> = BTreeMap::new();

    for record in records {
        *totals
            .entry((record.year, record.month))
            .or_default()
            .entry(record.category)
            .or_insert(Decimal::ZERO) += record.amount;
    }

    totals
        .into_iter()
        .map(|((year, month), breakdown)| {
            let category_breakdown = category_breakdown(breakdown);
            TrendGroup::Monthly {
                month,
                year,
                total: breakdown_total(&category_breakdown),
                category_breakdown,
            }
        })
        .collect()
}

fn aggregate_by_year(records: &[ExpenseRecord]) -> Vec<TrendGroup> {
    let mut totals: BTreeMap<i32, BTreeMap<Category, Decimal>> = BTreeMap::new();

    for record in records {
        *totals
            .entry(record.year)
            .or_default()
            .entry(record.category)
            .or_insert(Decimal::ZERO) += record.amount;
    }

    totals
        .into_iter()
        .map(|(year, breakdown)| {
            let category_breakdown = category_breakdown(breakdown);
            TrendGroup::Yearly {
                year,
                total: breakdown_total(&category_breakdown),
                category_breakdown,
            }
        })
        .collect()
}

fn aggregate_by_category(records: &[ExpenseRecord]) -> Vec<TrendGroup> {
    let mut totals: BTreeMap<Category, BTreeMap<(i32, u8), Decimal>> = BTreeMap::new();

    for record in records {
        *totals
            .entry(record.category)
            .or_default()
            .entry((record.year, record.month))
            .or_insert(Decimal::ZERO) += record.amount;
    }

    let mut groups: Vec<TrendGroup> = totals
        .into_iter()
        .map(|(category, periods)| {
            let monthly_breakdown: Vec<PeriodAmount> = periods
                .into_iter()
                .map(|((year, month), amount)| PeriodAmount {
                    month,
                    year,
                    amount,
                })
                .collect();
            let total = monthly_breakdown
                .iter()
                .fold(Decimal::ZERO, |sum, entry| sum + entry.amount);

            TrendGroup::Category {
                category,
                total,
                monthly_breakdown,
            }
        })
        .collect();

    groups.sort_by(|a, b| b.total().cmp(&a.total()));

    groups
}

fn category_breakdown(breakdown: BTreeMap<Category, Decimal>) -> Vec<CategoryAmount> {
    breakdown
        .into_iter()
        .map(|(category, amount)| CategoryAmount { category, amount })
        .collect()
}

fn breakdown_total(breakdown: &[CategoryAmount]) -> Decimal {
    breakdown
        .iter()
        .fold(Decimal::ZERO, |sum, entry| sum + entry.amount)
}

fn summarize(groups: &[TrendGroup]) -> TrendSummary {
    let total = groups
        .iter()
        .fold(Decimal::ZERO, |sum, group| sum + group.total());

    let average = if groups.is_empty() {
        Decimal::ZERO
    } else {
        (total / Decimal::from(groups.len() as u64)).round_dp(2)
    };

    TrendSummary {
        total,
        average,
        highest: groups.iter().map(TrendGroup::total).max(),
        lowest: groups.iter().map(TrendGroup::total).min(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    use crate::expense::{Category, ExpenseRecord};

    use super::{CategoryAmount, GroupBy, TrendGroup, aggregate};

    fn record(category: Category, amount: &str, month: u8, year: i32) -> ExpenseRecord {
        let now = OffsetDateTime::now_utc();
        ExpenseRecord {
            id: 0,
            category,
            amount: amount.parse().unwrap(),
            month,
            year,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn monthly_grouping_sums_and_breaks_down_by_category() {
        let records = vec![
            record(Category::Salaries, "50000", 1, 2024),
            record(Category::SoftwareTools, "2000", 1, 2024),
            record(Category::Salaries, "51000", 2, 2024),
        ];

        let report = aggregate(&records, GroupBy::Month);

        assert_eq!(report.groups.len(), 2);
        assert_eq!(
            report.groups[0],
            TrendGroup::Monthly {
                month: 1,
                year: 2024,
                total: Decimal::from(52_000),
                category_breakdown: vec![
                    CategoryAmount {
                        category: Category::Salaries,
                        amount: Decimal::from(50_000),
                    },
                    CategoryAmount {
                        category: Category::SoftwareTools,
                        amount: Decimal::from(2_000),
                    },
                ],
            }
        );
        assert_eq!(report.groups[1].total(), Decimal::from(51_000));

        assert_eq!(report.summary.total, Decimal::from(103_000));
        assert_eq!(report.summary.average, Decimal::from(51_500));
        assert_eq!(report.summary.highest, Some(Decimal::from(52_000)));
        assert_eq!(report.summary.lowest, Some(Decimal::from(51_000)));
    }

    #[test]
    fn monthly_groups_come_back_in_period_order() {
        let records = vec![
            record(Category::Travel, "100", 12, 2023),
            record(Category::Travel, "200", 1, 2024),
            record(Category::Travel, "300", 11, 2023),
        ];

        let report = aggregate(&records, GroupBy::Month);

        let periods: Vec<(i32, u8)> = report
            .groups
            .iter()
            .map(|group| match group {
                TrendGroup::Monthly { month, year, .. } => (*year, *month),
                other => panic!("expected a monthly group, got {other:?}"),
            })
            .collect();
        assert_eq!(periods, vec![(2023, 11), (2023, 12), (2024, 1)]);
    }

    #[test]
    fn yearly_grouping_collapses_months() {
        let records = vec![
            record(Category::Salaries, "50000", 1, 2024),
            record(Category::Salaries, "51000", 2, 2024),
            record(Category::Travel, "800", 6, 2023),
        ];

        let report = aggregate(&records, GroupBy::Year);

        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].total(), Decimal::from(800));
        assert_eq!(
            report.groups[1],
            TrendGroup::Yearly {
                year: 2024,
                total: Decimal::from(101_000),
                category_breakdown: vec![CategoryAmount {
                    category: Category::Salaries,
                    amount: Decimal::from(101_000),
                }],
            }
        );
    }

    #[test]
    fn category_groups_sort_descending_by_total() {
        let records = vec![
            record(Category::SoftwareTools, "2000", 1, 2024),
            record(Category::Salaries, "50000", 1, 2024),
            record(Category::Travel, "800", 1, 2024),
        ];

        let report = aggregate(&records, GroupBy::Category);

        let totals: Vec<Decimal> = report.groups.iter().map(TrendGroup::total).collect();
        assert_eq!(
            totals,
            vec![
                Decimal::from(50_000),
                Decimal::from(2_000),
                Decimal::from(800),
            ]
        );
    }

    #[test]
    fn category_group_totals_equal_their_monthly_breakdowns() {
        let records = vec![
            record(Category::Travel, "100.10", 1, 2024),
            record(Category::Travel, "200.20", 2, 2024),
            record(Category::Travel, "0.30", 3, 2024),
        ];

        let report = aggregate(&records, GroupBy::Category);

        let TrendGroup::Category {
            total,
            monthly_breakdown,
            ..
        } = &report.groups[0]
        else {
            panic!("expected a category group");
        };
        let breakdown_sum = monthly_breakdown
            .iter()
            .fold(Decimal::ZERO, |sum, entry| sum + entry.amount);
        assert_eq!(*total, breakdown_sum);
        assert_eq!(*total, "300.60".parse::<Decimal>().unwrap());
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        // 0.1 + 0.2 is the classic binary-float trap.
        let records = vec![
            record(Category::Utilities, "0.10", 1, 2024),
            record(Category::Utilities, "0.20", 1, 2024),
        ];

        let report = aggregate(&records, GroupBy::Month);

        assert_eq!(
            report.groups[0].total(),
            "0.30".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn empty_input_yields_no_groups_and_null_extremes() {
        let report = aggregate(&[], GroupBy::Month);

        assert!(report.groups.is_empty());
        assert_eq!(report.summary.total, Decimal::ZERO);
        assert_eq!(report.summary.average, Decimal::ZERO);
        assert_eq!(report.summary.highest, None);
        assert_eq!(report.summary.lowest, None);
    }

    #[test]
    fn a_group_totalling_zero_is_not_conflated_with_no_data() {
        let records = vec![record(Category::Miscellaneous, "0", 1, 2024)];

        let report = aggregate(&records, GroupBy::Month);

        assert_eq!(report.summary.highest, Some(Decimal::ZERO));
        assert_eq!(report.summary.lowest, Some(Decimal::ZERO));
    }

    #[test]
    fn average_rounds_to_two_decimal_places() {
        let records = vec![
            record(Category::Travel, "10", 1, 2024),
            record(Category::Travel, "10", 2, 2024),
            record(Category::Travel, "11", 3, 2024),
        ];

        let report = aggregate(&records, GroupBy::Month);

        assert_eq!(
            report.summary.average,
            "10.33".parse::<Decimal>().unwrap()
        );
    }
}
