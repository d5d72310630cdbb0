//! Middleware that keeps paid features behind an active subscription.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    subscription::{SubscriptionStatus, get_subscription},
};

/// The state needed for the paywall middleware.
#[derive(Debug, Clone)]
pub struct PaywallState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PaywallState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware that responds with 402 Payment Required unless the user's
/// subscription is effectively active.
///
/// **Note**: Must run after [crate::auth::auth_guard], which provides the [UserID].
pub async fn paywall(
    State(state): State<PaywallState>,
    Extension(user_id): Extension<UserID>,
    request: Request,
    next: Next,
) -> Response {
    let status = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_subscription(user_id, OffsetDateTime::now_utc(), &connection) {
            Ok(subscription) => subscription.status,
            Err(error) => {
                tracing::error!("Could not get subscription for user {user_id}: {error}");
                return error.into_response();
            }
        }
    };

    if status != SubscriptionStatus::Active {
        tracing::info!(
            "User {user_id} with a {status} subscription was refused {}",
            request.uri().path()
        );
        return Error::SubscriptionRequired.into_response();
    }

    next.run(request).await
}
