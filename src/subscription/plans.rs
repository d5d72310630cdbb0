//! The plans users can buy and the links that send them off to pay.

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, subscription::Plan};

/// A plan that can be bought, with its price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanOffer {
    pub plan: Plan,
    pub monthly_price: f64,
    pub features: &'static [&'static str],
}

/// The purchasable plans, cheapest first. Legacy plans cannot be bought.
pub const PLAN_CATALOGUE: [PlanOffer; 3] = [
    PlanOffer {
        plan: Plan::Pro,
        monthly_price: 9.99,
        features: &["Unlimited transactions", "Budgets", "CSV export"],
    },
    PlanOffer {
        plan: Plan::Business,
        monthly_price: 29.99,
        features: &[
            "Everything in Pro",
            "JSON statistics reports",
            "Priority support",
        ],
    },
    PlanOffer {
        plan: Plan::Enterprise,
        monthly_price: 99.99,
        features: &[
            "Everything in Business",
            "Dedicated account manager",
            "Custom onboarding",
        ],
    },
];

/// Look up the catalogue entry for `plan`.
pub fn get_plan_offer(plan: Plan) -> Option<&'static PlanOffer> {
    PLAN_CATALOGUE.iter().find(|offer| offer.plan == plan)
}

/// A hex encoded SHA-256 reference for a payment made by `user_id` at `now`.
pub fn payment_reference(user_id: UserID, now: OffsetDateTime) -> String {
    let digest = Sha256::digest(format!("{}:{}", user_id, now.unix_timestamp_nanos()));

    format!("{digest:x}")
}

/// The URL of the payment provider's checkout for `plan`.
pub fn payment_link(payment_url: &str, plan: Plan, reference: &str) -> Result<String, Error> {
    let query = serde_urlencoded::to_string([("plan", plan.as_str()), ("reference", reference)])
        .map_err(|error| {
            tracing::error!("could not encode payment link query: {error}");
            Error::InvalidSubscription(plan.to_string())
        })?;

    Ok(format!("{payment_url}?{query}"))
}
