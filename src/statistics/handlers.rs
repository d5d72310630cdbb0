//! The dashboard page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    budget::{Budget, BudgetEvaluation, evaluate_budget, get_all_budgets},
    endpoints,
    html::{HeadElement, base, link},
    navigation::NavBar,
    statistics::{
        aggregation::{DEFAULT_WINDOW_SIZE, Summary, aggregate, format_month_label, top_categories},
        charts::{DashboardChart, charts_script, charts_view, income_expenses_chart},
        tables::{budget_status_table, summary_cards_view, top_categories_table},
    },
    subscription::{Subscription, get_subscription, subscription_summary},
    timezone::{get_local_offset, local_date},
    transaction::{Transaction, get_all_transactions},
};

/// The number of categories listed in the top expenses table.
const TOP_CATEGORY_COUNT: usize = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions and budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    today: Date,
    current_month: Summary,
    overall: Summary,
    current_budgets: Vec<(Budget, BudgetEvaluation)>,
}

/// Display a page with an overview of the user's finances.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;
    let now = OffsetDateTime::now_utc();
    let today = local_date(now, local_timezone);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?;
    let subscription = get_subscription(user_id, now, &connection).inspect_err(|error| {
        tracing::error!("could not get subscription for user {user_id}: {error}")
    })?;

    let transactions = get_all_transactions(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get transactions: {error}"))?;

    if transactions.is_empty() {
        return Ok(dashboard_no_data_view(&subscription, user.is_admin).into_response());
    }

    let budgets = get_all_budgets(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get budgets: {error}"))?;

    let data = build_dashboard_data(&transactions, &budgets, today)?;

    Ok(dashboard_view(&data, &subscription, user.is_admin).into_response())
}

/// Aggregates the transactions for the current month and overall, and
/// evaluates the budgets whose period includes `today`.
fn build_dashboard_data(
    transactions: &[Transaction],
    budgets: &[Budget],
    today: Date,
) -> Result<DashboardData, Error> {
    let this_month: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| {
            transaction.date.year() == today.year() && transaction.date.month() == today.month()
        })
        .cloned()
        .collect();

    let current_month = aggregate(&this_month, today, 1)
        .inspect_err(|error| tracing::error!("Could not aggregate this month: {error}"))?;
    let overall = aggregate(transactions, today, DEFAULT_WINDOW_SIZE)
        .inspect_err(|error| tracing::error!("Could not aggregate transactions: {error}"))?;

    let mut current_budgets = Vec::new();

    for budget in budgets {
        let evaluation = evaluate_budget(budget, transactions, today).inspect_err(|error| {
            tracing::error!("Could not evaluate budget {}: {error}", budget.id)
        })?;

        if evaluation.is_current {
            current_budgets.push((budget.clone(), evaluation));
        }
    }

    Ok(DashboardData {
        today,
        current_month,
        overall,
        current_budgets,
    })
}

fn subscription_header(subscription: &Subscription) -> Markup {
    html!(
        div class="w-full flex flex-wrap justify-between items-center gap-4 mb-4"
        {
            div class="flex gap-4 text-sm"
            {
                (link(endpoints::EXPORT_TRANSACTIONS_CSV, "Export transactions (CSV)"))
                (link(endpoints::EXPORT_REPORT_JSON, "Download report (JSON)"))
            }

            a href=(endpoints::SUBSCRIPTION_VIEW) { (subscription_summary(subscription)) }
        }
    )
}

/// Renders the dashboard page when no transaction data exists.
fn dashboard_no_data_view(subscription: &Subscription, is_admin: bool) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW)
        .with_admin_link(is_admin, endpoints::DASHBOARD_VIEW)
        .into_html();
    let new_transaction_link = link(endpoints::NEW_TRANSACTION_VIEW, "recording a transaction");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            (subscription_header(subscription))

            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Your summary and charts will show up here once you start by "
                (new_transaction_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn dashboard_view(data: &DashboardData, subscription: &Subscription, is_admin: bool) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW)
        .with_admin_link(is_admin, endpoints::DASHBOARD_VIEW)
        .into_html();
    let charts = [DashboardChart {
        id: "income-expenses-chart",
        options: income_expenses_chart(&data.overall.window).to_string(),
    }];
    let top = top_categories(&data.overall.category_totals, TOP_CATEGORY_COUNT);
    let month_label = format_month_label(data.today);

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (subscription_header(subscription))

            (summary_cards_view(&data.current_month, &month_label))

            (charts_view(&charts))

            div class="grid grid-cols-1 xl:grid-cols-2 gap-4 w-full"
            {
                (top_categories_table(&top, data.overall.total_expenses))
                (budget_status_table(&data.current_budgets))
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(&charts),
    ];

    base("Dashboard", &scripts, &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::{Html, Selector};
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{Email, PasswordHash, create_user},
        budget::{BudgetPeriod, NewBudget, create_budget},
        category::{CategoryName, Color, create_category},
        endpoints,
        test_utils::{
            assert_valid_html, create_test_user, get_test_connection, parse_html_document,
        },
        transaction::{NewTransaction, TransactionKind, create_transaction},
    };

    use super::{DashboardState, get_dashboard_page};

    fn card_values(html: &Html) -> Vec<String> {
        html.select(&Selector::parse("[data-card] div").unwrap())
            .map(|value| value.text().collect())
            .collect()
    }

    #[tokio::test]
    async fn shows_empty_state_without_transactions() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let heading = html
            .select(&Selector::parse("h2").unwrap())
            .next()
            .map(|heading| heading.text().collect::<String>());
        assert_eq!(heading.as_deref(), Some("Nothing here yet..."));
    }

    #[tokio::test]
    async fn admin_link_only_shown_to_admins() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let admin_id = create_user(
            Email::new_unchecked("admin@bar.baz"),
            PasswordHash::new_unchecked("hunter2"),
            true,
            &connection,
        )
        .unwrap()
        .id;
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };
        let admin_link = Selector::parse(&format!("a[href='{}']", endpoints::ADMIN_USERS_VIEW))
            .unwrap();

        for (id, want_link) in [(user_id, false), (admin_id, true)] {
            let response = get_dashboard_page(State(state.clone()), Extension(id))
                .await
                .unwrap();

            let html = parse_html_document(response).await;
            assert_eq!(html.select(&admin_link).next().is_some(), want_link);
        }
    }

    #[tokio::test]
    async fn shows_current_month_summary_and_budgets() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let today = OffsetDateTime::now_utc().date();
        let first_of_month = today.replace_day(1).unwrap();
        let last_month = first_of_month - Duration::days(1);
        let food = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            Color::default(),
            &connection,
        )
        .unwrap();
        let transactions = [
            (TransactionKind::Income, 20000.0, None, first_of_month),
            (TransactionKind::Expense, 5000.0, Some(food.id), first_of_month),
            (TransactionKind::Expense, 999.0, Some(food.id), last_month),
        ];
        for (kind, amount, category_id, date) in transactions {
            create_transaction(
                user_id,
                NewTransaction {
                    kind,
                    amount,
                    category_id,
                    description: String::new(),
                    date,
                },
                &connection,
            )
            .unwrap();
        }
        create_budget(
            user_id,
            NewBudget {
                amount: 10000.0,
                period: BudgetPeriod::Monthly,
                start_date: first_of_month,
                end_date: None,
                category_id: Some(food.id),
            },
            &connection,
        )
        .unwrap();
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            card_values(&html),
            ["$20,000.00", "$5,000.00", "$15,000.00", "75.0%"]
        );
        assert!(
            html.select(&Selector::parse("#income-expenses-chart").unwrap())
                .next()
                .is_some()
        );
        let budget_rows = html
            .select(&Selector::parse("#current-budgets tbody tr th").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(budget_rows, ["Food (Monthly)"]);
        let top_category = html
            .select(&Selector::parse("#top-categories tbody tr th").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(top_category, ["Food"]);
    }
}
