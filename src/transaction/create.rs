//! The page and endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, get_all_categories},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner},
    navigation::NavBar,
    timezone::{get_local_offset, local_date},
    transaction::{
        core::{NewTransaction, TransactionKind, create_transaction},
        form::{TransactionForm, TransactionFormDefaults, transaction_form_fields},
    },
};

/// The state needed to get or create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn create_transaction_view(max_date: Date, available_categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();
    let spinner = loading_spinner();
    let fields = transaction_form_fields(
        &TransactionFormDefaults {
            kind: TransactionKind::Expense,
            amount: None,
            date: max_date,
            description: None,
            category_id: None,
            max_date,
            autofocus_amount: true,
        },
        available_categories,
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "New Transaction" }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (spinner)
                    }
                    " Create Transaction"
                }
            }
        }
    };

    base("Create Transaction", &[dollar_input_styles()], &content)
}

/// Renders the page for creating a transaction.
pub async fn get_new_transaction_page(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let available_categories = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_categories(user_id, &connection).inspect_err(|error| {
            tracing::error!("Failed to retrieve categories for new transaction page: {error}")
        })?
    };

    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone)
    })?;

    let max_date = local_date(OffsetDateTime::now_utc(), local_timezone);

    Ok(create_transaction_view(max_date, &available_categories).into_response())
}

/// A route handler for creating a new transaction, redirects to transactions view on success.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let kind = match form.kind.parse::<TransactionKind>() {
        Ok(kind) => kind,
        Err(error) => return error.into_alert_response(),
    };

    let transaction = NewTransaction {
        kind,
        amount: form.amount,
        category_id: form.category_id,
        description: form.description,
        date: form.date,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_transaction(user_id, transaction, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::InvalidAmount(_) | Error::InvalidCategory(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("could not create transaction: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod new_transaction_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::Selector;

    use crate::{
        category::{CategoryName, Color, create_category},
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            create_test_user, get_test_connection, must_get_form, parse_html_document,
        },
    };

    use super::{CreateTransactionState, get_new_transaction_page};

    #[tokio::test]
    async fn render_page_with_own_categories() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let other_user = create_test_user("bob@example.com", &connection);
        create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            Color::default(),
            &connection,
        )
        .unwrap();
        create_category(
            other_user,
            CategoryName::new_unchecked("Secret"),
            Color::default(),
            &connection,
        )
        .unwrap();
        let state = CreateTransactionState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_new_transaction_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "date", "date");
        assert_form_submit_button(&form);
        let options: Vec<String> = form
            .select(&Selector::parse("select[name=category_id] option").unwrap())
            .map(|option| option.text().collect())
            .collect();
        assert_eq!(options, ["Uncategorized", "Food"]);
    }

    #[tokio::test]
    async fn invalid_timezone_is_an_error() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let state = CreateTransactionState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Middle/Earth".to_owned(),
        };

        let result = get_new_transaction_page(State(state), Extension(user_id)).await;

        assert_eq!(
            result.err(),
            Some(crate::Error::InvalidTimezoneError("Middle/Earth".to_owned()))
        );
    }
}
