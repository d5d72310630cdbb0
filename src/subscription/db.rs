//! Database operations for subscriptions.
//!
//! Every read resolves the effective status and writes it back when the
//! stored status has gone stale.

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    subscription::{Plan, SubscriptionStatus, resolve_subscription_status},
};

/// A user's subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub user_id: UserID,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub started_at: OffsetDateTime,
    pub ends_at: Option<OffsetDateTime>,
    /// The reference sent to the payment provider when a plan was chosen.
    pub payment_reference: Option<String>,
}

impl Subscription {
    /// The status after applying the expiry rule at `now`.
    pub fn effective_status(&self, now: OffsetDateTime) -> SubscriptionStatus {
        resolve_subscription_status(self.plan, self.status, self.ends_at, now)
    }
}

/// A row of the admin overview: a user and their subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSubscription {
    pub email: String,
    pub is_admin: bool,
    /// The status as it was stored before resolving.
    pub stored_status: SubscriptionStatus,
    pub subscription: Subscription,
}

impl ToSql for Plan {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Plan {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for SubscriptionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for SubscriptionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Initialize the subscription table.
///
/// Each user has at most one subscription, removed along with the user.
pub fn create_subscription_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS subscription (
            user_id INTEGER PRIMARY KEY,
            plan TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ends_at TEXT,
            payment_reference TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create a subscription with no end date for `user_id`.
pub fn create_subscription(
    user_id: UserID,
    plan: Plan,
    status: SubscriptionStatus,
    started_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Subscription, Error> {
    connection.execute(
        "INSERT INTO subscription (user_id, plan, status, started_at) VALUES (?1, ?2, ?3, ?4)",
        (user_id.as_i64(), plan, status, started_at),
    )?;

    Ok(Subscription {
        user_id,
        plan,
        status,
        started_at,
        ends_at: None,
        payment_reference: None,
    })
}

/// Get the subscription for `user_id` with its effective status at `now`.
///
/// A user without a subscription row is treated as expired on the pro plan.
pub fn get_subscription(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Subscription, Error> {
    let stored = connection
        .prepare(
            "SELECT user_id, plan, status, started_at, ends_at, payment_reference
            FROM subscription WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row)
        .optional()?;

    let Some(mut subscription) = stored else {
        return Ok(Subscription {
            user_id,
            plan: Plan::Pro,
            status: SubscriptionStatus::Expired,
            started_at: now,
            ends_at: None,
            payment_reference: None,
        });
    };

    persist_effective_status(&mut subscription, now, connection)?;

    Ok(subscription)
}

/// Get every user with their subscription, ordered by email.
///
/// Stale statuses are corrected as they are read.
pub fn get_all_subscriptions(
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<UserSubscription>, Error> {
    let rows = connection
        .prepare(
            "SELECT s.user_id, s.plan, s.status, s.started_at, s.ends_at, s.payment_reference,
                u.email, u.is_admin
            FROM subscription s
            INNER JOIN user u ON u.id = s.user_id
            ORDER BY u.email ASC",
        )?
        .query_map([], |row| {
            let subscription = map_row(row)?;
            let email: String = row.get(6)?;
            let is_admin: bool = row.get(7)?;

            Ok((subscription, email, is_admin))
        })?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    rows.into_iter()
        .map(|(mut subscription, email, is_admin)| {
            let stored_status = subscription.status;
            persist_effective_status(&mut subscription, now, connection)?;

            Ok(UserSubscription {
                email,
                is_admin,
                stored_status,
                subscription,
            })
        })
        .collect()
}

/// Set a user's plan, status, and active period.
///
/// Creates the subscription if the user does not have one yet.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if `user_id` does not refer to a user.
pub fn update_subscription(
    user_id: UserID,
    plan: Plan,
    status: SubscriptionStatus,
    started_at: OffsetDateTime,
    ends_at: Option<OffsetDateTime>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "INSERT INTO subscription (user_id, plan, status, started_at, ends_at)
        SELECT id, ?2, ?3, ?4, ?5 FROM user WHERE id = ?1
        ON CONFLICT(user_id) DO UPDATE SET
            plan = excluded.plan,
            status = excluded.status,
            started_at = excluded.started_at,
            ends_at = excluded.ends_at",
        (user_id.as_i64(), plan, status, started_at, ends_at),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Record that a user chose `plan` and is waiting on payment.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if `user_id` does not refer to a user.
pub fn set_pending_plan(
    user_id: UserID,
    plan: Plan,
    payment_reference: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "INSERT INTO subscription (user_id, plan, status, started_at, payment_reference)
        SELECT id, ?2, ?3, ?4, ?5 FROM user WHERE id = ?1
        ON CONFLICT(user_id) DO UPDATE SET
            plan = excluded.plan,
            status = excluded.status,
            started_at = excluded.started_at,
            ends_at = NULL,
            payment_reference = excluded.payment_reference",
        (
            user_id.as_i64(),
            plan,
            SubscriptionStatus::Pending,
            now,
            payment_reference,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

fn persist_effective_status(
    subscription: &mut Subscription,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let effective_status = subscription.effective_status(now);

    if effective_status != subscription.status {
        tracing::info!(
            "Correcting subscription status for user {} from {} to {}",
            subscription.user_id,
            subscription.status,
            effective_status
        );

        connection.execute(
            "UPDATE subscription SET status = ?1 WHERE user_id = ?2",
            (effective_status, subscription.user_id.as_i64()),
        )?;
        subscription.status = effective_status;
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Subscription, rusqlite::Error> {
    Ok(Subscription {
        user_id: UserID::new(row.get(0)?),
        plan: row.get(1)?,
        status: row.get(2)?,
        started_at: row.get(3)?,
        ends_at: row.get(4)?,
        payment_reference: row.get(5)?,
    })
}
