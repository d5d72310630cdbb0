//! The subscription page and the endpoint for choosing a plan.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, base, format_currency},
    navigation::NavBar,
    subscription::{
        Plan, Subscription, SubscriptionStatus, get_subscription,
        plans::{PLAN_CATALOGUE, PlanOffer, get_plan_offer, payment_link, payment_reference},
        set_pending_plan,
    },
};

/// The state needed for the subscription page.
#[derive(Debug, Clone)]
pub struct SubscriptionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SubscriptionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the user's subscription and the plans on offer.
pub async fn get_subscription_page(
    State(state): State<SubscriptionPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?;
    let subscription = get_subscription(user_id, OffsetDateTime::now_utc(), &connection)
        .inspect_err(|error| {
            tracing::error!("could not get subscription for user {user_id}: {error}")
        })?;

    Ok(subscription_view(&subscription, user.is_admin).into_response())
}

fn status_badge(status: SubscriptionStatus) -> Markup {
    let style = match status {
        SubscriptionStatus::Active => {
            "px-2.5 py-0.5 rounded text-xs font-medium bg-green-100 text-green-800 \
            dark:bg-green-900 dark:text-green-300"
        }
        SubscriptionStatus::Pending => {
            "px-2.5 py-0.5 rounded text-xs font-medium bg-yellow-100 text-yellow-800 \
            dark:bg-yellow-900 dark:text-yellow-300"
        }
        SubscriptionStatus::Expired => {
            "px-2.5 py-0.5 rounded text-xs font-medium bg-red-100 text-red-800 \
            dark:bg-red-900 dark:text-red-300"
        }
    };

    html! {
        span class=(style) data-status=(status.as_str()) { (status.as_str()) }
    }
}

/// A short summary of a subscription for use on other pages.
pub fn subscription_summary(subscription: &Subscription) -> Markup {
    html! {
        div class="flex items-center gap-2"
        {
            span class="font-semibold" { (subscription.plan.display_name()) " plan" }
            (status_badge(subscription.status))

            @if let Some(ends_at) = subscription.ends_at {
                span class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "until " (ends_at.date())
                }
            }
        }
    }
}

fn plan_card(offer: &PlanOffer, is_current: bool) -> Markup {
    html! {
        div class="flex flex-col p-6 rounded-lg border border-gray-200 bg-white \
            dark:bg-gray-800 dark:border-gray-700"
        {
            h3 class="text-xl font-semibold" { (offer.plan.display_name()) }

            p class="my-4"
            {
                span class="text-3xl font-bold" { (format_currency(offer.monthly_price)) }
                span class="text-gray-500 dark:text-gray-400" { " / month" }
            }

            ul class="mb-6 space-y-2 text-sm"
            {
                @for feature in offer.features {
                    li { (feature) }
                }
            }

            form
                hx-post=(endpoints::SUBSCRIPTION_API)
                hx-target-error="#alert-container"
                class="mt-auto"
            {
                input type="hidden" name="plan" value=(offer.plan.as_str());

                button type="submit" class=(BUTTON_PRIMARY_STYLE)
                {
                    @if is_current { "Renew" } @else { "Choose " (offer.plan.display_name()) }
                }
            }
        }
    }
}

fn subscription_view(subscription: &Subscription, is_admin: bool) -> Markup {
    let nav_bar = NavBar::new(endpoints::SUBSCRIPTION_VIEW)
        .with_admin_link(is_admin, endpoints::SUBSCRIPTION_VIEW)
        .into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full mb-8"
            {
                h2 class="text-2xl font-bold mb-4" { "Your Subscription" }

                (subscription_summary(subscription))

                @if subscription.status == SubscriptionStatus::Pending {
                    p class="mt-2 text-sm text-gray-500 dark:text-gray-400"
                    {
                        "We are waiting on your payment. Your plan will be activated once it clears."
                    }
                }
            }

            @if subscription.plan != Plan::Legacy {
                section class="w-full"
                {
                    h2 class="text-2xl font-bold mb-4" { "Plans" }

                    div class="grid gap-6 md:grid-cols-3"
                    {
                        @for offer in &PLAN_CATALOGUE {
                            (plan_card(offer, offer.plan == subscription.plan))
                        }
                    }
                }
            }
        }
    };

    base("Subscription", &[], &content)
}

/// The state needed to choose a plan.
#[derive(Debug, Clone)]
pub struct ChoosePlanState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The checkout page of the payment provider.
    pub payment_url: String,
}

impl FromRef<AppState> for ChoosePlanState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            payment_url: state.payment_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChoosePlanForm {
    pub plan: String,
}

/// Mark the chosen plan as pending and send the user to the payment provider.
pub async fn choose_plan_endpoint(
    State(state): State<ChoosePlanState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ChoosePlanForm>,
) -> Response {
    let plan = match form.plan.parse::<Plan>() {
        Ok(plan) if get_plan_offer(plan).is_some() => plan,
        Ok(_) | Err(_) => return Error::InvalidSubscription(form.plan).into_alert_response(),
    };

    let now = OffsetDateTime::now_utc();
    let reference = payment_reference(user_id, now);

    let link = match payment_link(&state.payment_url, plan, &reference) {
        Ok(link) => link,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match set_pending_plan(user_id, plan, &reference, now, &connection) {
        Ok(()) => {
            tracing::info!("User {user_id} chose the {plan} plan, payment reference {reference}");

            (HxRedirect(link), StatusCode::SEE_OTHER).into_response()
        }
        Err(error) => {
            tracing::error!("Could not set pending plan for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
