//! Reducing a list of transactions into totals, per-category sums and a
//! trailing window of monthly totals.

use serde::Serialize;
use time::{Date, Month};

use crate::{
    Error,
    transaction::{Transaction, TransactionKind, validate_amount},
};

/// The number of months in the dashboard's trailing window.
pub const DEFAULT_WINDOW_SIZE: usize = 6;

/// The summed expenses for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// The first day of the month.
    pub month: Date,
    pub income: f64,
    pub expenses: f64,
}

/// The aggregate view of a set of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expenses: f64,
    /// `total_income - total_expenses`.
    pub balance: f64,
    /// The balance as a percentage of income, zero when there is no income.
    pub savings_rate: f64,
    /// Expense totals per category name in the order the names first appear.
    pub category_totals: Vec<CategoryTotal>,
    /// Monthly totals, oldest first, ending with the current month.
    pub window: Vec<MonthlyTotals>,
}

/// Aggregate `transactions` into a [Summary].
///
/// Transfers count towards neither income nor expenses. The window holds
/// `window_size` calendar months ending with the month of `today`, and every
/// month is present even if no transactions fall in it.
///
/// # Errors
///
/// Returns [Error::InvalidAmount] if any transaction has an amount that is
/// zero, negative or not finite.
pub fn aggregate(
    transactions: &[Transaction],
    today: Date,
    window_size: usize,
) -> Result<Summary, Error> {
    let mut window: Vec<MonthlyTotals> = trailing_months(today, window_size)
        .into_iter()
        .map(|month| MonthlyTotals {
            month,
            income: 0.0,
            expenses: 0.0,
        })
        .collect();

    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    let mut category_totals: Vec<CategoryTotal> = Vec::new();

    for transaction in transactions {
        let amount = validate_amount(transaction.amount)?;
        let month = first_of_month(transaction.date);
        let bucket = window.iter_mut().find(|bucket| bucket.month == month);

        match transaction.kind {
            TransactionKind::Income => {
                total_income += amount;

                if let Some(bucket) = bucket {
                    bucket.income += amount;
                }
            }
            TransactionKind::Expense => {
                total_expenses += amount;

                if let Some(bucket) = bucket {
                    bucket.expenses += amount;
                }

                match category_totals
                    .iter_mut()
                    .find(|total| total.name == transaction.category_name)
                {
                    Some(total) => total.total += amount,
                    None => category_totals.push(CategoryTotal {
                        name: transaction.category_name.clone(),
                        total: amount,
                    }),
                }
            }
            TransactionKind::Transfer => {}
        }
    }

    let balance = total_income - total_expenses;
    let savings_rate = if total_income == 0.0 {
        0.0
    } else {
        balance / total_income * 100.0
    };

    Ok(Summary {
        total_income,
        total_expenses,
        balance,
        savings_rate,
        category_totals,
        window,
    })
}

/// The `n` categories with the largest totals, largest first.
///
/// Categories with equal totals keep their original order.
pub fn top_categories(category_totals: &[CategoryTotal], n: usize) -> Vec<CategoryTotal> {
    let mut ranked = category_totals.to_vec();
    // `sort_by` is stable, so ties stay in first-encountered order.
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    ranked.truncate(n);
    ranked
}

/// Formats a month as a three-letter abbreviation and year, e.g. "Jan 2025".
pub fn format_month_label(month: Date) -> String {
    let name = match month.month() {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    };

    format!("{name} {}", month.year())
}

fn first_of_month(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// The first day of each of the `count` months ending with the month of
/// `today`, oldest first.
fn trailing_months(today: Date, count: usize) -> Vec<Date> {
    let mut months = Vec::with_capacity(count);
    let mut month = first_of_month(today);

    for _ in 0..count {
        months.push(month);

        match month.previous_day().map(first_of_month) {
            Some(previous) => month = previous,
            None => break,
        }
    }

    months.reverse();
    months
}
