//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::UserID,
    database_id::{CategoryId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned, spent, or moved between the user's own accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    /// Counts towards neither income nor expenses.
    Transfer,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 3] = [
        TransactionKind::Expense,
        TransactionKind::Income,
        TransactionKind::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
        }
    }

    /// The capitalised name shown in forms and tables.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
            TransactionKind::Transfer => "Transfer",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(Error::InvalidTransactionKind(other.to_owned())),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An income, expense or transfer recorded by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserID,
    pub kind: TransactionKind,
    /// Always greater than zero, the kind says which way the money went.
    pub amount: f64,
    pub category_id: Option<CategoryId>,
    /// The name of the category, the label kept from a deleted category, or
    /// "Uncategorized".
    pub category_name: String,
    pub description: String,
    /// The date the transaction happened.
    pub date: Date,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// The user editable fields of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: f64,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub date: Date,
}

/// The display name for transactions without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Check that `amount` can be stored on a transaction or budget.
///
/// # Errors
///
/// Returns [Error::InvalidAmount] if `amount` is zero, negative or not finite.
pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount))
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_TRANSACTION: &str = "SELECT t.id, t.user_id, t.kind, t.amount, t.category_id,
        COALESCE(c.name, t.category_label, 'Uncategorized'), t.description, t.date, t.created_at
    FROM \"transaction\" t
    LEFT JOIN category c ON c.id = t.category_id";

fn validate_category(
    user_id: UserID,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(id) = category_id else {
        return Ok(());
    };

    let exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND user_id = ?2)",
        (id, user_id.as_i64()),
        |row| row.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        Err(Error::InvalidCategory(category_id))
    }
}

/// Create a new transaction for `user_id` in the database.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::InvalidCategory] if the category does not belong to the user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(transaction.amount)?;
    validate_category(user_id, transaction.category_id, connection)?;

    connection.execute(
        "INSERT INTO \"transaction\" (user_id, kind, amount, category_id, description, date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            user_id.as_i64(),
            transaction.kind,
            transaction.amount,
            transaction.category_id,
            transaction.description.trim(),
            transaction.date,
            OffsetDateTime::now_utc(),
        ),
    )?;

    let id = connection.last_insert_rowid();

    get_transaction(user_id, id, connection)
}

/// Retrieve a transaction owned by `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to one of the user's transactions,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.id = :id AND t.user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve all of a user's transactions, newest first.
pub fn get_all_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.user_id = :user_id
            ORDER BY t.date DESC, t.id DESC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Replace the editable fields of a transaction.
///
/// Choosing a category discards any label kept from a deleted category.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::InvalidCategory] if the category does not belong to the user,
/// - [Error::UpdateMissingTransaction] if the transaction is not one of the user's,
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    user_id: UserID,
    id: TransactionId,
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<(), Error> {
    validate_amount(transaction.amount)?;
    validate_category(user_id, transaction.category_id, connection)?;

    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
        SET kind = ?1, amount = ?2, category_id = ?3, description = ?4, date = ?5,
            category_label = CASE WHEN ?3 IS NULL THEN category_label ELSE NULL END
        WHERE id = ?6 AND user_id = ?7",
        (
            transaction.kind,
            transaction.amount,
            transaction.category_id,
            transaction.description.trim(),
            transaction.date,
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete a transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingTransaction] if the transaction is not one of the user's.
pub fn delete_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Create the transaction table in the database.
///
/// The category table must already exist.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense', 'transfer')),
                amount REAL NOT NULL CHECK (amount > 0),
                category_id INTEGER,
                category_label TEXT,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Used by the dashboard, budgets and transactions pages.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind: row.get(2)?,
        amount: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        description: row.get(6)?,
        date: row.get(7)?,
        created_at: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod transaction_kind_tests {
    use crate::Error;

    use super::TransactionKind;

    #[test]
    fn parses_all_kinds() {
        for kind in TransactionKind::ALL {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        assert_eq!(
            "refund".parse::<TransactionKind>(),
            Err(Error::InvalidTransactionKind("refund".to_owned()))
        );
    }
}
