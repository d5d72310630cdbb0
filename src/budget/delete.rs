//! Budget deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, alert::Alert, auth::UserID, budget::core::delete_budget,
    database_id::BudgetId,
};

/// The state needed for deleting a budget.
#[derive(Debug, Clone)]
pub struct DeleteBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle budget deletion. Returns a success alert or an error alert.
pub async fn delete_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<DeleteBudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_budget(user_id, budget_id, &connection) {
        Ok(()) => Alert::Success {
            message: "Budget deleted successfully".to_owned(),
            details: String::new(),
        }
        .into_html()
        .into_response(),
        Err(error @ Error::DeleteMissingBudget) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not delete budget {budget_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_budget_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        budget::core::{BudgetPeriod, NewBudget, create_budget, get_all_budgets},
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{DeleteBudgetState, delete_budget_endpoint};

    #[tokio::test]
    async fn delete_only_own_budget() {
        let connection = get_test_connection();
        let owner = create_test_user("foo@bar.baz", &connection);
        let intruder = create_test_user("bob@example.com", &connection);
        let budget = create_budget(
            owner,
            NewBudget {
                amount: 100.0,
                period: BudgetPeriod::Weekly,
                start_date: date!(2025 - 01 - 06),
                end_date: None,
                category_id: None,
            },
            &connection,
        )
        .unwrap();
        let state = DeleteBudgetState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let rejected =
            delete_budget_endpoint(Path(budget.id), State(state.clone()), Extension(intruder))
                .await;
        let accepted =
            delete_budget_endpoint(Path(budget.id), State(state.clone()), Extension(owner)).await;

        assert_eq!(rejected.status(), StatusCode::NOT_FOUND);
        assert_eq!(accepted.status(), StatusCode::OK);
        assert!(
            get_all_budgets(owner, &state.db_connection.lock().unwrap())
                .unwrap()
                .is_empty()
        );
    }
}
