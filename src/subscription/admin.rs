//! The admin page for managing every user's subscription.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Deserializer};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    subscription::{
        Plan, SubscriptionStatus, update_subscription,
        db::{UserSubscription, get_all_subscriptions},
    },
};

/// How long a subscription set to active lasts when no duration is given.
const DEFAULT_DURATION_DAYS: i64 = 30;

const ALL_PLANS: [Plan; 4] = [Plan::Legacy, Plan::Pro, Plan::Business, Plan::Enterprise];

const ALL_STATUSES: [SubscriptionStatus; 3] = [
    SubscriptionStatus::Active,
    SubscriptionStatus::Pending,
    SubscriptionStatus::Expired,
];

/// The state needed for the admin pages.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display all users with their plan, stored and effective status.
pub async fn get_admin_users_page(State(state): State<AdminState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let subscriptions = get_all_subscriptions(OffsetDateTime::now_utc(), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve subscriptions: {error}"))?;

    Ok(admin_users_view(&subscriptions).into_response())
}

fn subscription_form(row: &UserSubscription) -> Markup {
    let subscription = &row.subscription;
    let endpoint = format_endpoint(
        endpoints::ADMIN_USER_SUBSCRIPTION,
        subscription.user_id.as_i64(),
    );

    html! {
        form
            hx-put=(endpoint)
            hx-target-error="#alert-container"
            class="flex flex-row gap-2 items-center"
        {
            select name="plan" class=(FORM_TEXT_INPUT_STYLE) aria-label="Plan"
            {
                @for plan in ALL_PLANS {
                    option value=(plan.as_str()) selected[plan == subscription.plan]
                    {
                        (plan.display_name())
                    }
                }
            }

            select name="status" class=(FORM_TEXT_INPUT_STYLE) aria-label="Status"
            {
                @for status in ALL_STATUSES {
                    option value=(status.as_str()) selected[status == subscription.status]
                    {
                        (status.as_str())
                    }
                }
            }

            input
                type="number"
                name="duration_days"
                min="1"
                value=(DEFAULT_DURATION_DAYS)
                aria-label="Duration in days"
                class=(FORM_TEXT_INPUT_STYLE);

            button
                type="submit"
                class="px-3 py-2 text-sm text-white bg-blue-600 rounded hover:bg-blue-700"
            {
                "Save"
            }
        }
    }
}

fn admin_users_view(subscriptions: &[UserSubscription]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_USERS_VIEW)
        .with_admin_link(true, endpoints::ADMIN_USERS_VIEW)
        .into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            h2 class="text-2xl font-bold mb-4" { "Users" }

            div class="relative overflow-x-auto shadow-md sm:rounded-lg w-full"
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Plan" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Stored Status" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Effective Status" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Ends" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Change" }
                        }
                    }

                    tbody
                    {
                        @for row in subscriptions {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (row.email)
                                    @if row.is_admin {
                                        " (admin)"
                                    }
                                }
                                td class=(TABLE_CELL_STYLE) { (row.subscription.plan.display_name()) }
                                td class=(TABLE_CELL_STYLE) { (row.stored_status) }
                                td class=(TABLE_CELL_STYLE) { (row.subscription.status) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @match row.subscription.ends_at {
                                        Some(ends_at) => { (ends_at.date()) }
                                        None => { "-" }
                                    }
                                }
                                td class=(TABLE_CELL_STYLE) { (subscription_form(row)) }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Manage Users", &[], &content)
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionFormData {
    pub plan: String,
    pub status: String,
    /// Left empty when the admin clears the duration input.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub duration_days: Option<i64>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(days) => days.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// The end of a subscription set by an admin at `now`.
///
/// Active subscriptions run for `duration_days` from `now`. Expired ones
/// end at `now`. Pending and legacy subscriptions have no end.
fn subscription_period(
    plan: Plan,
    status: SubscriptionStatus,
    duration_days: Option<i64>,
    now: OffsetDateTime,
) -> Result<Option<OffsetDateTime>, Error> {
    if plan == Plan::Legacy {
        return Ok(None);
    }

    match status {
        SubscriptionStatus::Active => {
            let days = duration_days.unwrap_or(DEFAULT_DURATION_DAYS);
            if days <= 0 {
                return Err(Error::InvalidSubscription(days.to_string()));
            }

            now.checked_add(Duration::days(days))
                .map(Some)
                .ok_or_else(|| Error::InvalidSubscription(days.to_string()))
        }
        SubscriptionStatus::Expired => Ok(Some(now)),
        SubscriptionStatus::Pending => Ok(None),
    }
}

/// Set the plan, status, and duration of a user's subscription.
pub async fn update_user_subscription_endpoint(
    Path(user_id): Path<i64>,
    State(state): State<AdminState>,
    Form(form): Form<SubscriptionFormData>,
) -> Response {
    let user_id = UserID::new(user_id);
    let plan = match form.plan.parse::<Plan>() {
        Ok(plan) => plan,
        Err(error) => return error.into_alert_response(),
    };
    let status = match form.status.parse::<SubscriptionStatus>() {
        Ok(status) => status,
        Err(error) => return error.into_alert_response(),
    };

    let now = OffsetDateTime::now_utc();
    let ends_at = match subscription_period(plan, status, form.duration_days, now) {
        Ok(ends_at) => ends_at,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_subscription(user_id, plan, status, now, ends_at, &connection) {
        Ok(()) => {
            tracing::info!("Set subscription of user {user_id} to {plan} ({status})");

            (
                HxRedirect(endpoints::ADMIN_USERS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not update subscription of user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
