//! Accounts, passwords, and the cookie-based session that guards the app.

pub mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
pub mod redirect;
mod register_user;
pub mod token;
mod user;

pub use cookie::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AdminGuardState, AuthState, admin_guard, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::{get_register_page, register_user};
pub use user::{
    Email, User, UserID, create_user, create_user_table, get_all_users, get_user_by_email,
    get_user_by_id,
};
