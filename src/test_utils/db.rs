use rusqlite::Connection;

use crate::{
    auth::{Email, PasswordHash, UserID, create_user},
    db::initialize,
};

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Create a non-admin user with a dummy password hash.
pub(crate) fn create_test_user(email: &str, connection: &Connection) -> UserID {
    create_user(
        Email::new_unchecked(email),
        PasswordHash::new_unchecked("hunter2"),
        false,
        connection,
    )
    .expect("Could not create test user")
    .id
}
