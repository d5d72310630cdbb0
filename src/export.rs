//! Downloadable exports of a user's data.
//!
//! Transactions are exported as CSV and the statistics report as JSON. Both
//! routes sit behind the paywall.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    budget::{Budget, BudgetEvaluation, evaluate_budget, get_all_budgets},
    statistics::{DEFAULT_WINDOW_SIZE, Summary, aggregate},
    timezone::{get_local_offset, local_date},
    transaction::{Transaction, get_all_transactions},
};

/// The state needed for the export endpoints.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TransactionRecord<'a> {
    date: Date,
    kind: &'a str,
    amount: f64,
    category: &'a str,
    description: &'a str,
}

/// A budget and how much of it has been spent.
#[derive(Debug, Serialize)]
pub struct BudgetReport {
    pub budget: Budget,
    pub evaluation: BudgetEvaluation,
}

/// The statistics report served as JSON.
#[derive(Debug, Serialize)]
pub struct Report {
    /// The local date the report was generated for.
    pub generated_on: Date,
    pub summary: Summary,
    pub budgets: Vec<BudgetReport>,
}

/// Write `transactions` as CSV with a header row.
///
/// # Errors
///
/// Returns [Error::CsvError] if a record could not be written.
pub fn transactions_to_csv(transactions: &[Transaction]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for transaction in transactions {
        writer
            .serialize(TransactionRecord {
                date: transaction.date,
                kind: transaction.kind.as_str(),
                amount: transaction.amount,
                category: &transaction.category_name,
                description: &transaction.description,
            })
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// Build the statistics report for `transactions` and `budgets` as of `today`.
///
/// # Errors
///
/// Returns an error if a transaction or budget is invalid, see
/// [aggregate] and [evaluate_budget].
pub fn build_report(
    transactions: &[Transaction],
    budgets: Vec<Budget>,
    today: Date,
) -> Result<Report, Error> {
    let summary = aggregate(transactions, today, DEFAULT_WINDOW_SIZE)?;
    let budgets = budgets
        .into_iter()
        .map(|budget| {
            let evaluation = evaluate_budget(&budget, transactions, today)?;
            Ok(BudgetReport { budget, evaluation })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Report {
        generated_on: today,
        summary,
        budgets,
    })
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

/// Download the user's transactions as a CSV file.
pub async fn export_transactions_csv(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let transactions = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_transactions(user_id, &connection)
            .inspect_err(|error| tracing::error!("Could not get transactions: {error}"))?
    };

    let body = transactions_to_csv(&transactions)
        .inspect_err(|error| tracing::error!("Could not export transactions: {error}"))?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (CONTENT_DISPOSITION, attachment("transactions.csv")),
        ],
        body,
    )
        .into_response())
}

/// Download the statistics report as a JSON file.
pub async fn export_report_json(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;
    let today = local_date(OffsetDateTime::now_utc(), local_timezone);

    let (transactions, budgets) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let transactions = get_all_transactions(user_id, &connection)
            .inspect_err(|error| tracing::error!("Could not get transactions: {error}"))?;
        let budgets = get_all_budgets(user_id, &connection)
            .inspect_err(|error| tracing::error!("Could not get budgets: {error}"))?;

        (transactions, budgets)
    };

    let report = build_report(&transactions, budgets, today)
        .inspect_err(|error| tracing::error!("Could not build report: {error}"))?;
    let body = serde_json::to_string_pretty(&report)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok((
        [
            (CONTENT_TYPE, "application/json".to_owned()),
            (CONTENT_DISPOSITION, attachment("report.json")),
        ],
        body,
    )
        .into_response())
}
