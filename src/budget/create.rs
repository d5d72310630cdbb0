//! The page and endpoint for creating budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    budget::core::{BudgetPeriod, NewBudget, create_budget},
    category::{Category, get_all_categories},
    database_id::CategoryId,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        dollar_input_styles, loading_spinner,
    },
    navigation::NavBar,
    timezone::{get_local_offset, local_date},
};

/// The state needed for the new budget page and endpoint.
#[derive(Debug, Clone)]
pub struct CreateBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    pub amount: f64,
    /// One of "weekly", "monthly" or "yearly".
    pub period: String,
    pub start_date: Date,
    #[serde(default)]
    pub end_date: Option<Date>,
    /// Leave empty for a budget that covers every category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Renders the page for creating a budget.
pub async fn get_new_budget_page(
    State(state): State<CreateBudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let available_categories = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_categories(user_id, &connection).inspect_err(|error| {
            tracing::error!("Failed to retrieve categories for new budget page: {error}")
        })?
    };

    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone)
    })?;

    let today = local_date(OffsetDateTime::now_utc(), local_timezone);
    let start_date = BudgetPeriod::Monthly.normalize_start(today);

    Ok(new_budget_view(start_date, &available_categories).into_response())
}

fn new_budget_view(start_date: Date, available_categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_BUDGET_VIEW).into_html();
    let spinner = loading_spinner();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(endpoints::BUDGETS_API)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "New Budget" }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    div class="input-wrapper w-full"
                    {
                        input
                            name="amount"
                            id="amount"
                            type="number"
                            step="0.01"
                            min="0.01"
                            placeholder="0.00"
                            required
                            autofocus
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }

                div
                {
                    label for="period" class=(FORM_LABEL_STYLE) { "Period" }

                    select name="period" id="period" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for period in BudgetPeriod::ALL {
                            option value=(period.as_str()) { (period.label()) }
                        }
                    }
                }

                div
                {
                    label for="start_date" class=(FORM_LABEL_STYLE) { "Start Date" }

                    input
                        name="start_date"
                        id="start_date"
                        type="date"
                        value=(start_date)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);

                    p class="mt-1 text-xs text-gray-500 dark:text-gray-400"
                    {
                        "Monthly budgets start on the first of the month, yearly budgets on the first of January."
                    }
                }

                div
                {
                    label for="end_date" class=(FORM_LABEL_STYLE) { "End Date (optional)" }

                    input
                        name="end_date"
                        id="end_date"
                        type="date"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                    select name="category_id" id="category_id" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value="" { "All categories" }

                        @for category in available_categories {
                            option value=(category.id) { (category.name) }
                        }
                    }
                }

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span id="indicator" class="inline htmx-indicator" { (spinner) }
                    " Create Budget"
                }
            }
        }
    };

    base("Create Budget", &[dollar_input_styles()], &content)
}

/// A route handler for creating a budget, redirects to the budgets view on success.
pub async fn create_budget_endpoint(
    State(state): State<CreateBudgetState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let period = match form.period.parse::<BudgetPeriod>() {
        Ok(period) => period,
        Err(error) => return error.into_alert_response(),
    };

    let budget = NewBudget {
        amount: form.amount,
        period,
        start_date: form.start_date,
        end_date: form.end_date,
        category_id: form.category_id,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_budget(user_id, budget, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::InvalidAmount(_)
            | Error::InvalidPeriod(_)
            | Error::InvalidCategory(_)
            | Error::DuplicateBudget),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a budget: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod new_budget_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            create_test_user, get_test_connection, must_get_form, parse_html_document,
        },
    };

    use super::{CreateBudgetState, get_new_budget_page};

    #[tokio::test]
    async fn render_page() {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let state = CreateBudgetState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_new_budget_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::BUDGETS_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "start_date", "date");
        assert_form_submit_button(&form);
    }
}
