//! Spending limits per period, optionally scoped to a category.

mod core;
mod create;
mod delete;
mod evaluation;
mod list;

pub use core::{
    Budget, BudgetPeriod, NewBudget, create_budget, create_budget_table, delete_budget,
    get_all_budgets, get_budget,
};
pub use create::{create_budget_endpoint, get_new_budget_page};
pub use delete::delete_budget_endpoint;
pub use evaluation::{BudgetEvaluation, budget_period_bounds, evaluate_budget};
pub use list::get_budgets_page;
