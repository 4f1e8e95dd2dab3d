//! The fixed set of expense categories.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// The category an expense is recorded under.
///
/// The set is fixed: every expense belongs to exactly one of these seven
/// categories, and at most one live expense exists per category and period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Wages and salaries.
    Salaries,
    /// Software licenses and subscriptions.
    SoftwareTools,
    /// Advertising and promotion.
    Marketing,
    /// Consumables and office equipment.
    OfficeSupplies,
    /// Business travel and accommodation.
    Travel,
    /// Power, connectivity, rent and similar running costs.
    Utilities,
    /// Anything that does not fit the other categories.
    Miscellaneous,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Salaries,
        Category::SoftwareTools,
        Category::Marketing,
        Category::OfficeSupplies,
        Category::Travel,
        Category::Utilities,
        Category::Miscellaneous,
    ];

    /// The canonical name used for storage and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Salaries => "Salaries",
            Category::SoftwareTools => "SoftwareTools",
            Category::Marketing => "Marketing",
            Category::OfficeSupplies => "OfficeSupplies",
            Category::Travel => "Travel",
            Category::Utilities => "Utilities",
            Category::Miscellaneous => "Miscellaneous",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when parsing a string that is not a valid category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid expense category")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::Category;

    #[test]
    fn every_category_round_trips_through_its_name() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn parsing_an_unknown_name_fails() {
        assert!("Groceries".parse::<Category>().is_err());
    }
}
