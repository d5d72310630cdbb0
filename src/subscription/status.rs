//! Subscription plans, statuses, and the rule for the effective status.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Error;

/// The plan a user is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Accounts that predate paid plans. Never expires.
    Legacy,
    Pro,
    Business,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Legacy => "legacy",
            Plan::Pro => "pro",
            Plan::Business => "business",
            Plan::Enterprise => "enterprise",
        }
    }

    /// The name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Legacy => "Legacy",
            Plan::Pro => "Pro",
            Plan::Business => "Business",
            Plan::Enterprise => "Enterprise",
        }
    }
}

impl FromStr for Plan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(Plan::Legacy),
            "pro" => Ok(Plan::Pro),
            "business" => Ok(Plan::Business),
            "enterprise" => Ok(Plan::Enterprise),
            _ => Err(Error::InvalidSubscription(s.to_owned())),
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a subscription is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    /// Waiting on payment for a chosen plan.
    Pending,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "pending" => Ok(SubscriptionStatus::Pending),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(Error::InvalidSubscription(s.to_owned())),
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Work out the status a subscription actually has at `now`.
///
/// Legacy accounts are always active. Any other plan whose end date is
/// strictly before `now` has expired, whatever the stored status says.
/// Otherwise the stored status stands.
pub fn resolve_subscription_status(
    plan: Plan,
    status: SubscriptionStatus,
    ends_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> SubscriptionStatus {
    if plan == Plan::Legacy {
        return SubscriptionStatus::Active;
    }

    match ends_at {
        Some(ends_at) if ends_at < now => SubscriptionStatus::Expired,
        _ => status,
    }
}
