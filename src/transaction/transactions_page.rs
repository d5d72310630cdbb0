//! Defines the route handler for the page that displays transactions as a table.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::get_all_categories,
    database_id::CategoryId,
    endpoints::{self, format_endpoint},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, category_badge, edit_delete_action_links, format_currency,
    },
    navigation::NavBar,
    transaction::core::{Transaction, TransactionKind, get_all_transactions},
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

struct TransactionTableRow {
    transaction: Transaction,
    /// The color of the transaction's category, if it still has one.
    category_color: Option<String>,
    edit_url: String,
    delete_url: String,
}

/// Render the user's transactions, newest first.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_all_transactions(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    let colors: HashMap<CategoryId, String> = get_all_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?
        .into_iter()
        .map(|category| (category.id, category.color.to_string()))
        .collect();

    let rows: Vec<TransactionTableRow> = transactions
        .into_iter()
        .map(|transaction| TransactionTableRow {
            category_color: transaction
                .category_id
                .and_then(|id| colors.get(&id).cloned()),
            edit_url: format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id),
            delete_url: format_endpoint(endpoints::TRANSACTION, transaction.id),
            transaction,
        })
        .collect();

    Ok(transactions_view(&rows).into_response())
}

fn signed_amount(transaction: &Transaction) -> (String, &'static str) {
    match transaction.kind {
        TransactionKind::Income => (
            format_currency(transaction.amount),
            "text-green-700 dark:text-green-400",
        ),
        TransactionKind::Expense => (format_currency(-transaction.amount), ""),
        TransactionKind::Transfer => (
            format_currency(transaction.amount),
            "text-gray-500 dark:text-gray-400",
        ),
    }
}

fn transactions_view(rows: &[TransactionTableRow]) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let table_row = |row: &TransactionTableRow| {
        let transaction = &row.transaction;
        let (amount, amount_style) = signed_amount(transaction);

        html!(
            tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                td class=(TABLE_CELL_STYLE) { (transaction.kind.label()) }
                td class=(TABLE_CELL_STYLE) { (transaction.description) }
                td class=(TABLE_CELL_STYLE)
                {
                    @match &row.category_color {
                        Some(color) => { (category_badge(&transaction.category_name, color)) }
                        None => { (transaction.category_name) }
                    }
                }
                td class={ (TABLE_CELL_STYLE) " text-right " (amount_style) } { (amount) }
                td class=(TABLE_CELL_STYLE)
                {
                    (edit_delete_action_links(
                        &row.edit_url,
                        &row.delete_url,
                        "Are you sure you want to delete this transaction?",
                    ))
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                    {
                        "Create Transaction"
                    }
                }

                section class="dark:bg-gray-800 lg:max-w-5xl lg:w-full lg:mx-auto overflow-x-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in rows {
                                (table_row(row))
                            }

                            @if rows.is_empty() {
                                tr
                                {
                                    td
                                        colspan="6"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions recorded yet. "
                                        a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                                        {
                                            "Record your first transaction"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Transactions", &[], &content)
}

#[cfg(test)]
mod transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        category::{CategoryName, Color, create_category},
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
        },
        transaction::{NewTransaction, TransactionKind, create_transaction},
    };

    use super::{TransactionsViewState, get_transactions_page};

    fn table_rows(html: &Html) -> Vec<Vec<String>> {
        html.select(&Selector::parse("tbody tr").unwrap())
            .map(|row| {
                row.select(&Selector::parse("td").unwrap())
                    .map(|cell| cell.text().collect::<String>().trim().to_owned())
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn lists_own_transactions_newest_first() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let other_user = create_test_user("bob@example.com", &connection);
        let food = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            Color::default(),
            &connection,
        )
        .unwrap();
        create_transaction(
            user_id,
            NewTransaction {
                kind: TransactionKind::Expense,
                amount: 5000.0,
                category_id: Some(food.id),
                description: "Groceries".to_owned(),
                date: date!(2025 - 01 - 10),
            },
            &connection,
        )
        .unwrap();
        create_transaction(
            user_id,
            NewTransaction {
                kind: TransactionKind::Income,
                amount: 20000.0,
                category_id: None,
                description: "Salary".to_owned(),
                date: date!(2025 - 01 - 05),
            },
            &connection,
        )
        .unwrap();
        create_transaction(
            other_user,
            NewTransaction {
                kind: TransactionKind::Income,
                amount: 1.0,
                category_id: None,
                description: "Not mine".to_owned(),
                date: date!(2025 - 01 - 20),
            },
            &connection,
        )
        .unwrap();
        let state = TransactionsViewState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_transactions_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let rows = table_rows(&html);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0][..5],
            ["2025-01-10", "Expense", "Groceries", "Food", "-$5,000.00"]
        );
        assert_eq!(
            rows[1][..5],
            [
                "2025-01-05",
                "Income",
                "Salary",
                "Uncategorized",
                "$20,000.00"
            ]
        );
    }

    #[tokio::test]
    async fn shows_empty_state() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let state = TransactionsViewState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_transactions_page(State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let rows = table_rows(&html);
        assert_eq!(rows.len(), 1);
        assert!(rows[0][0].starts_with("No transactions recorded yet."));
    }
}
