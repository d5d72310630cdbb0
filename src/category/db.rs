//! Database operations for categories.
//!
//! Every query is scoped to the owning user, so a category ID belonging to
//! another user behaves as if it does not exist.

use std::collections::HashMap;

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryName, Color},
    database_id::CategoryId,
};

// Code 2067 occurs when a UNIQUE constraint failed.
fn map_duplicate_name(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 2067 => {
            Error::DuplicateCategoryName(name.to_string())
        }
        error => error.into(),
    }
}

/// Create a category and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if the user already has a category called `name`.
pub fn create_category(
    user_id: UserID,
    name: CategoryName,
    color: Color,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (user_id, name, color) VALUES (?1, ?2, ?3);",
            (user_id.as_i64(), name.as_ref(), color.as_ref()),
        )
        .map_err(|error| map_duplicate_name(error, &name))?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name,
        color,
    })
}

/// Retrieve a single category owned by `user_id`.
pub fn get_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, color FROM category WHERE id = :id AND user_id = :user_id;",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories ordered alphabetically by name.
pub fn get_all_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, color FROM category
            WHERE user_id = :user_id ORDER BY name ASC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Update a category's name and color. Returns an error if the category doesn't exist.
pub fn update_category(
    user_id: UserID,
    category_id: CategoryId,
    new_name: CategoryName,
    new_color: Color,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1, color = ?2 WHERE id = ?3 AND user_id = ?4",
            (
                new_name.as_ref(),
                new_color.as_ref(),
                category_id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| map_duplicate_name(error, &new_name))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category, keeping its name on its transactions as a plain label.
///
/// Returns an error if the category doesn't exist.
pub fn delete_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    transaction.execute(
        "UPDATE \"transaction\"
        SET category_label = (SELECT name FROM category WHERE id = ?1 AND user_id = ?2)
        WHERE category_id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    let rows_affected = transaction.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    transaction.commit()?;

    Ok(())
}

/// Count how many of a user's transactions are in each category.
pub fn count_transactions_per_category(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<CategoryId, u32>, Error> {
    let result: Result<HashMap<CategoryId, u32>, rusqlite::Error> = connection
        .prepare(
            "SELECT category_id, COUNT(1) FROM \"transaction\"
            WHERE user_id = ?1 AND category_id IS NOT NULL GROUP BY category_id",
        )?
        .query_map([user_id.as_i64()], |row| {
            let category_id = row.get(0)?;
            let count = row.get(1)?;

            Ok((category_id, count))
        })?
        .collect();

    result.map_err(Error::from)
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_category_user_name ON category(user_id, name);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let raw_name: String = row.get(2)?;
    let raw_color: String = row.get(3)?;

    Ok(Category {
        id,
        user_id,
        name: CategoryName::new_unchecked(&raw_name),
        color: Color::new_unchecked(&raw_color),
    })
}
