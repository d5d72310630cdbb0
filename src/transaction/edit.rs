//! The page and endpoint for editing an existing transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    category::{Category, get_all_categories},
    database_id::TransactionId,
    endpoints::{self, format_endpoint},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner},
    navigation::NavBar,
    timezone::{get_local_offset, local_date},
    transaction::{
        core::{
            NewTransaction, Transaction, TransactionKind, UNCATEGORIZED, get_transaction,
            update_transaction,
        },
        form::{TransactionForm, TransactionFormDefaults, transaction_form_fields},
    },
};

/// The state needed for the edit transaction page and endpoint.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn edit_transaction_view(
    transaction: &Transaction,
    max_date: Date,
    available_categories: &[Category],
) -> Markup {
    let edit_view = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let update_endpoint = format_endpoint(endpoints::TRANSACTION, transaction.id);
    let nav_bar = NavBar::new(&edit_view).into_html();
    let spinner = loading_spinner();
    let fields = transaction_form_fields(
        &TransactionFormDefaults {
            kind: transaction.kind,
            amount: Some(transaction.amount),
            date: transaction.date,
            description: Some(&transaction.description),
            category_id: transaction.category_id,
            max_date,
            autofocus_amount: false,
        },
        available_categories,
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(update_endpoint)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "Edit Transaction" }

                @if transaction.category_id.is_none() && transaction.category_name != UNCATEGORIZED {
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Previously filed under \"" (transaction.category_name) "\"."
                    }
                }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (spinner)
                    }
                    " Update Transaction"
                }
            }
        }
    };

    base("Edit Transaction", &[dollar_input_styles()], &content)
}

/// Renders the page for editing a transaction.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (transaction, available_categories) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let transaction =
            get_transaction(user_id, transaction_id, &connection).inspect_err(|error| {
                if *error != Error::NotFound {
                    tracing::error!("Failed to retrieve transaction {transaction_id}: {error}");
                }
            })?;

        let available_categories = get_all_categories(user_id, &connection).inspect_err(|error| {
            tracing::error!("Failed to retrieve categories for edit transaction page: {error}")
        })?;

        (transaction, available_categories)
    };

    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone)
    })?;

    let max_date = local_date(OffsetDateTime::now_utc(), local_timezone);

    Ok(edit_transaction_view(&transaction, max_date, &available_categories).into_response())
}

/// A route handler for updating a transaction, redirects to transactions view on success.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
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

    match update_transaction(user_id, transaction_id, transaction, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::InvalidAmount(_)
            | Error::InvalidCategory(_)
            | Error::UpdateMissingTransaction),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not update transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod edit_transaction_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::Form;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        Error,
        auth::UserID,
        category::{CategoryName, Color, create_category, delete_category},
        endpoints::{self, format_endpoint},
        test_utils::{
            assert_form_input_with_value, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
        transaction::{
            NewTransaction, TransactionKind, create_transaction, form::TransactionForm,
            get_transaction,
        },
    };

    use super::{EditTransactionState, get_edit_transaction_page, update_transaction_endpoint};

    fn get_state() -> (EditTransactionState, UserID, i64) {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let transaction = create_transaction(
            user_id,
            NewTransaction {
                kind: TransactionKind::Expense,
                amount: 12.3,
                category_id: None,
                description: "Coffee".to_owned(),
                date: date!(2025 - 01 - 10),
            },
            &connection,
        )
        .unwrap();

        (
            EditTransactionState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id,
            transaction.id,
        )
    }

    #[tokio::test]
    async fn render_edit_page_with_current_values() {
        let (state, user_id, transaction_id) = get_state();

        let response =
            get_edit_transaction_page(Path(transaction_id), State(state), Extension(user_id))
                .await
                .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &format_endpoint(endpoints::TRANSACTION, transaction_id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "amount", "number", "12.30");
        assert_form_input_with_value(&form, "date", "date", "2025-01-10");
        let description = form
            .select(&Selector::parse("input[name=description]").unwrap())
            .next()
            .and_then(|input| input.value().attr("value"));
        assert_eq!(description, Some("Coffee"));
    }

    #[tokio::test]
    async fn edit_page_for_other_users_transaction_is_not_found() {
        let (state, _, transaction_id) = get_state();
        let other_user = create_test_user("bob@example.com", &state.db_connection.lock().unwrap());

        let result =
            get_edit_transaction_page(Path(transaction_id), State(state), Extension(other_user))
                .await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn edit_page_shows_label_of_deleted_category() {
        let (state, user_id, _) = get_state();
        let (category_id, transaction_id) = {
            let connection = state.db_connection.lock().unwrap();
            let category = create_category(
                user_id,
                CategoryName::new_unchecked("Holidays"),
                Color::default(),
                &connection,
            )
            .unwrap();
            let transaction = create_transaction(
                user_id,
                NewTransaction {
                    kind: TransactionKind::Expense,
                    amount: 100.0,
                    category_id: Some(category.id),
                    description: String::new(),
                    date: date!(2025 - 01 - 10),
                },
                &connection,
            )
            .unwrap();
            (category.id, transaction.id)
        };
        delete_category(user_id, category_id, &state.db_connection.lock().unwrap()).unwrap();

        let response =
            get_edit_transaction_page(Path(transaction_id), State(state), Extension(user_id))
                .await
                .unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Previously filed under \"Holidays\"."));
    }

    #[tokio::test]
    async fn update_transaction_succeeds() {
        let (state, user_id, transaction_id) = get_state();

        let response = update_transaction_endpoint(
            Path(transaction_id),
            State(state.clone()),
            Extension(user_id),
            Form(TransactionForm {
                kind: "income".to_owned(),
                amount: 99.0,
                date: date!(2025 - 01 - 11),
                description: "Refund".to_owned(),
                category_id: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::TRANSACTIONS_VIEW);
        let transaction =
            get_transaction(user_id, transaction_id, &state.db_connection.lock().unwrap())
                .unwrap();
        assert_eq!(transaction.kind, TransactionKind::Income);
        assert_eq!(transaction.amount, 99.0);
        assert_eq!(transaction.description, "Refund");
        assert_eq!(transaction.date, date!(2025 - 01 - 11));
    }

    #[tokio::test]
    async fn update_other_users_transaction_is_not_found() {
        let (state, _, transaction_id) = get_state();
        let other_user = create_test_user("bob@example.com", &state.db_connection.lock().unwrap());

        let response = update_transaction_endpoint(
            Path(transaction_id),
            State(state),
            Extension(other_user),
            Form(TransactionForm {
                kind: "expense".to_owned(),
                amount: 1.0,
                date: date!(2025 - 01 - 11),
                description: String::new(),
                category_id: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
