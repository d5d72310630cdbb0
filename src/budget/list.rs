//! The page listing a user's budgets and how much of each has been spent.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    budget::{
        core::{Budget, get_all_budgets},
        evaluation::{BudgetEvaluation, evaluate_budget},
    },
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, format_percentage,
        progress_bar,
    },
    navigation::NavBar,
    timezone::{get_local_offset, local_date},
    transaction::get_all_transactions,
};

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

struct BudgetTableRow {
    budget: Budget,
    evaluation: BudgetEvaluation,
    delete_url: String,
}

/// Render the user's budgets alongside their spending so far.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;
    let today = local_date(OffsetDateTime::now_utc(), local_timezone);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = get_all_budgets(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve budgets: {error}"))?;
    let transactions = get_all_transactions(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    let rows = budgets
        .into_iter()
        .map(|budget| {
            let evaluation = evaluate_budget(&budget, &transactions, today).inspect_err(
                |error| tracing::error!("Could not evaluate budget {}: {error}", budget.id),
            )?;

            Ok(BudgetTableRow {
                delete_url: format_endpoint(endpoints::BUDGET, budget.id),
                budget,
                evaluation,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(budgets_view(&rows).into_response())
}

fn budget_row(row: &BudgetTableRow) -> Markup {
    let BudgetTableRow {
        budget,
        evaluation,
        delete_url,
    } = row;

    let remaining_style = if evaluation.over_budget {
        "text-red-600 dark:text-red-400"
    } else {
        ""
    };

    html!(
        tr class=(TABLE_ROW_STYLE) data-budget-id=(budget.id)
        {
            td class=(TABLE_CELL_STYLE)
            {
                p class="font-medium text-gray-900 dark:text-white" { (budget.period.label()) }
                p class="text-xs" { (evaluation.period_start) " to " (evaluation.period_end) }
            }
            td class=(TABLE_CELL_STYLE)
            {
                (budget.category_name.as_deref().unwrap_or("All categories"))
            }
            td class={ (TABLE_CELL_STYLE) " text-right" } { (format_currency(evaluation.amount)) }
            td class={ (TABLE_CELL_STYLE) " text-right" } { (format_currency(evaluation.spent)) }
            td class={ (TABLE_CELL_STYLE) " text-right " (remaining_style) }
            {
                (format_currency(evaluation.remaining))
            }
            td class={ (TABLE_CELL_STYLE) " min-w-40" }
            {
                div class="flex items-center gap-2"
                {
                    (progress_bar(evaluation.percentage))
                    span class="text-xs" { (format_percentage(evaluation.percentage)) }
                }

                @if evaluation.over_budget {
                    span
                        class="mt-1 inline-block text-xs font-medium px-2 py-0.5 rounded
                            bg-red-100 text-red-800 dark:bg-red-900 dark:text-red-300"
                    {
                        "Over budget"
                    }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                button
                    hx-delete=(delete_url)
                    hx-confirm="Are you sure you want to delete this budget?"
                    hx-target="closest tr"
                    hx-target-error="#alert-container"
                    hx-swap="delete"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }
        }
    )
}

fn budgets_view(rows: &[BudgetTableRow]) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Budgets" }

                    a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE) { "Create Budget" }
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Period" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Budget" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Spent" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Remaining" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Progress" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in rows {
                                (budget_row(row))
                            }

                            @if rows.is_empty() {
                                tr
                                {
                                    td
                                        colspan="7"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No budgets yet. "
                                        a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE)
                                        {
                                            "Set your first budget"
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

    base("Budgets", &[], &content)
}

#[cfg(test)]
mod budgets_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        budget::core::{BudgetPeriod, NewBudget, create_budget},
        category::{CategoryName, Color, create_category},
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
        },
        transaction::{NewTransaction, TransactionKind, create_transaction},
    };

    use super::{BudgetsPageState, get_budgets_page};

    fn table_rows(html: &Html) -> Vec<Vec<String>> {
        html.select(&Selector::parse("tbody tr").unwrap())
            .map(|row| {
                row.select(&Selector::parse("td").unwrap())
                    .map(|cell| {
                        cell.text()
                            .map(str::trim)
                            .filter(|text| !text.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn shows_spending_against_budget() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let food = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            Color::default(),
            &connection,
        )
        .unwrap();
        create_budget(
            user_id,
            NewBudget {
                amount: 100.0,
                period: BudgetPeriod::Monthly,
                start_date: date!(2025 - 01 - 01),
                end_date: None,
                category_id: Some(food.id),
            },
            &connection,
        )
        .unwrap();
        create_transaction(
            user_id,
            NewTransaction {
                kind: TransactionKind::Expense,
                amount: 150.0,
                category_id: Some(food.id),
                description: "Feast".to_owned(),
                date: date!(2025 - 01 - 15),
            },
            &connection,
        )
        .unwrap();
        let state = BudgetsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_budgets_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let rows = table_rows(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "Monthly 2025-01-01 to 2025-01-31");
        assert_eq!(rows[0][1], "Food");
        assert_eq!(rows[0][2], "$100.00");
        assert_eq!(rows[0][3], "$150.00");
        assert_eq!(rows[0][4], "-$50.00");
        assert_eq!(rows[0][5], "150.0% Over budget");
    }

    #[tokio::test]
    async fn shows_empty_state() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let state = BudgetsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_budgets_page(State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let rows = table_rows(&html);
        assert_eq!(rows.len(), 1);
        assert!(rows[0][0].starts_with("No budgets yet."));
    }
}
