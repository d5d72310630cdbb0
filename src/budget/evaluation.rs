//! Comparing a budget against the expenses recorded in its period.

use serde::Serialize;
use time::{Date, Duration, Month};

use crate::{
    Error,
    budget::core::{Budget, BudgetPeriod},
    database_id::BudgetId,
    transaction::{Transaction, TransactionKind, validate_amount},
};

/// How much of a budget has been spent.
///
/// `spent + remaining == amount` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetEvaluation {
    pub budget_id: BudgetId,
    pub amount: f64,
    pub spent: f64,
    /// Negative once the budget is exceeded.
    pub remaining: f64,
    /// `spent` as a percentage of `amount`, zero when the amount is zero.
    pub percentage: f64,
    pub over_budget: bool,
    /// Whether today falls inside the budget's period.
    pub is_current: bool,
    pub period_start: Date,
    pub period_end: Date,
}

/// The inclusive date range a budget covers.
///
/// An explicit end date takes priority over the length implied by the period.
///
/// # Errors
///
/// Returns [Error::InvalidPeriod] if the end date is before the start date or
/// the range runs past the largest supported date.
pub fn budget_period_bounds(
    period: BudgetPeriod,
    start_date: Date,
    end_date: Option<Date>,
) -> Result<(Date, Date), Error> {
    if let Some(end_date) = end_date {
        if end_date < start_date {
            return Err(Error::InvalidPeriod(format!(
                "the end date {end_date} is before the start date {start_date}"
            )));
        }

        return Ok((start_date, end_date));
    }

    let out_of_range =
        || Error::InvalidPeriod(format!("the period starting {start_date} is out of range"));

    match period {
        BudgetPeriod::Weekly => {
            let end_date = start_date
                .checked_add(Duration::days(6))
                .ok_or_else(out_of_range)?;

            Ok((start_date, end_date))
        }
        BudgetPeriod::Monthly => {
            let first = start_date.replace_day(1).map_err(|_| out_of_range())?;
            let (next_year, next_month) = match start_date.month() {
                Month::December => (start_date.year() + 1, Month::January),
                month => (start_date.year(), month.next()),
            };
            let last = Date::from_calendar_date(next_year, next_month, 1)
                .ok()
                .and_then(|date| date.previous_day())
                .ok_or_else(out_of_range)?;

            Ok((first, last))
        }
        BudgetPeriod::Yearly => {
            let first = Date::from_calendar_date(start_date.year(), Month::January, 1)
                .map_err(|_| out_of_range())?;
            let last = Date::from_calendar_date(start_date.year(), Month::December, 31)
                .map_err(|_| out_of_range())?;

            Ok((first, last))
        }
    }
}

/// Sum the expenses that count towards `budget` and compare them to its amount.
///
/// Only expenses in the budget's category count, or every expense if the
/// budget has no category. `today` is the current date in the user's timezone.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount] if the budget amount is negative or not finite, or
///   a counted expense has an amount that is not positive and finite,
/// - [Error::InvalidPeriod] if the budget's end date is before its start date.
pub fn evaluate_budget(
    budget: &Budget,
    transactions: &[Transaction],
    today: Date,
) -> Result<BudgetEvaluation, Error> {
    if !budget.amount.is_finite() || budget.amount < 0.0 {
        return Err(Error::InvalidAmount(budget.amount));
    }

    let (period_start, period_end) =
        budget_period_bounds(budget.period, budget.start_date, budget.end_date)?;

    let spent: f64 = transactions
        .iter()
        .filter(|transaction| transaction.kind == TransactionKind::Expense)
        .filter(|transaction| {
            budget.category_id.is_none() || transaction.category_id == budget.category_id
        })
        .filter(|transaction| (period_start..=period_end).contains(&transaction.date))
        .try_fold(0.0, |total, transaction| {
            validate_amount(transaction.amount).map(|amount| total + amount)
        })?;

    let percentage = if budget.amount == 0.0 {
        0.0
    } else {
        spent / budget.amount * 100.0
    };

    Ok(BudgetEvaluation {
        budget_id: budget.id,
        amount: budget.amount,
        spent,
        remaining: budget.amount - spent,
        percentage,
        over_budget: spent > budget.amount,
        is_current: (period_start..=period_end).contains(&today),
        period_start,
        period_end,
    })
}
