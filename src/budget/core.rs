//! Budget models and database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    auth::UserID,
    database_id::{BudgetId, CategoryId},
    transaction::validate_amount,
};

/// How long a budget lasts when it has no explicit end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// The seven days starting at the start date.
    Weekly,
    /// The calendar month of the start date.
    Monthly,
    /// The calendar year of the start date.
    Yearly,
}

impl BudgetPeriod {
    pub const ALL: [BudgetPeriod; 3] = [
        BudgetPeriod::Monthly,
        BudgetPeriod::Weekly,
        BudgetPeriod::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "Weekly",
            BudgetPeriod::Monthly => "Monthly",
            BudgetPeriod::Yearly => "Yearly",
        }
    }

    /// Move `date` to the start of the period it falls in.
    ///
    /// Monthly budgets start on the first of the month and yearly budgets on
    /// the first of January, weekly budgets start on any day.
    pub fn normalize_start(&self, date: Date) -> Date {
        match self {
            BudgetPeriod::Weekly => date,
            BudgetPeriod::Monthly => date.replace_day(1).unwrap_or(date),
            BudgetPeriod::Yearly => {
                Date::from_calendar_date(date.year(), Month::January, 1).unwrap_or(date)
            }
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(Error::InvalidPeriod(format!(
                "\"{other}\" is not one of weekly, monthly or yearly"
            ))),
        }
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for BudgetPeriod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for BudgetPeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A spending limit for a period, optionally for a single category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserID,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: Date,
    /// Overrides the length implied by `period` when set.
    pub end_date: Option<Date>,
    /// `None` means the budget covers expenses in every category.
    pub category_id: Option<CategoryId>,
    /// The name of the category the budget is scoped to.
    pub category_name: Option<String>,
}

/// The fields needed to create a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub category_id: Option<CategoryId>,
}

/// Create a budget for `user_id`.
///
/// The start date is normalized with [BudgetPeriod::normalize_start] so a
/// user has at most one budget per period, start and category.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::InvalidPeriod] if the end date is before the start date,
/// - [Error::InvalidCategory] if the category does not belong to the user,
/// - [Error::DuplicateBudget] if an equivalent budget already exists,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_budget(
    user_id: UserID,
    budget: NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    validate_amount(budget.amount)?;

    let start_date = budget.period.normalize_start(budget.start_date);

    if let Some(end_date) = budget.end_date.filter(|end_date| *end_date < start_date) {
        return Err(Error::InvalidPeriod(format!(
            "the end date {end_date} is before the start date {start_date}"
        )));
    }

    if let Some(category_id) = budget.category_id {
        let exists: bool = connection.query_row(
            "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND user_id = ?2)",
            (category_id, user_id.as_i64()),
            |row| row.get(0),
        )?;

        if !exists {
            return Err(Error::InvalidCategory(Some(category_id)));
        }
    }

    connection.execute(
        "INSERT INTO budget (user_id, amount, period, start_date, end_date, category_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            budget.amount,
            budget.period,
            start_date,
            budget.end_date,
            budget.category_id,
        ),
    )?;

    get_budget(user_id, connection.last_insert_rowid(), connection)
}

const SELECT_BUDGET: &str = "SELECT b.id, b.user_id, b.amount, b.period, b.start_date, b.end_date,
        b.category_id, c.name
    FROM budget b
    LEFT JOIN category c ON c.id = b.category_id";

/// Retrieve a budget owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `budget_id` is not one of the user's budgets.
pub fn get_budget(
    user_id: UserID,
    budget_id: BudgetId,
    connection: &Connection,
) -> Result<Budget, Error> {
    let budget = connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE b.id = :id AND b.user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &budget_id), (":user_id", &user_id.as_i64())],
            map_budget_row,
        )?;

    Ok(budget)
}

/// Retrieve all of a user's budgets, most recent period first.
pub fn get_all_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE b.user_id = :user_id
            ORDER BY b.start_date DESC, c.name IS NOT NULL, c.name ASC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Delete a budget owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingBudget] if `budget_id` is not one of the user's budgets.
pub fn delete_budget(
    user_id: UserID,
    budget_id: BudgetId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (budget_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Initialize the budget table and indexes.
///
/// Budgets scoped to a category are deleted along with the category.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            period TEXT NOT NULL CHECK (period IN ('weekly', 'monthly', 'yearly')),
            start_date TEXT NOT NULL,
            end_date TEXT,
            category_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_budget_unique
            ON budget(user_id, period, start_date, IFNULL(category_id, 0));",
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        period: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        category_id: row.get(6)?,
        category_name: row.get(7)?,
    })
}
