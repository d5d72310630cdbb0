//! Subscription plans, the paywall, and the admin tools for managing them.

mod admin;
mod db;
mod page;
mod paywall;
pub mod plans;
mod status;

pub use admin::{get_admin_users_page, update_user_subscription_endpoint};
pub use db::{
    Subscription, create_subscription, create_subscription_table, get_subscription,
    set_pending_plan, update_subscription,
};
pub use page::{choose_plan_endpoint, get_subscription_page, subscription_summary};
pub use paywall::paywall;
pub use status::{Plan, SubscriptionStatus, resolve_subscription_status};
