//! The expense data model and live-store queries.

mod category;
mod record;
mod store;

pub use category::{Category, ParseCategoryError};
pub use record::{
    ArchivedExpenseRecord, ExpenseId, ExpenseRecord, MAX_AMOUNT, MAX_YEAR, MIN_YEAR, NewExpense,
};
pub use store::{create_expense, delete_expense, get_expenses_in_range, update_expense_amount};
