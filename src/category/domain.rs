//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID, database_id::CategoryId};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A display color in the form `#rrggbb`, stored in lowercase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Color(String);

impl Color {
    /// The color given to categories when none is chosen.
    pub const DEFAULT: &str = "#3b82f6";

    /// Create a color from a hex string like `#A1B2C3`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidColor] if `raw_color` is not a '#' followed by six hex digits.
    pub fn new(raw_color: &str) -> Result<Self, Error> {
        let color = raw_color.trim();

        match color.strip_prefix('#') {
            Some(digits) if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(Self(color.to_lowercase()))
            }
            _ => Err(Error::InvalidColor(raw_color.to_owned())),
        }
    }

    pub fn new_unchecked(raw_color: &str) -> Self {
        Self(raw_color.to_owned())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl AsRef<str> for Color {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user defined category for grouping transactions (e.g., 'Food', 'Salary').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserID,
    pub name: CategoryName,
    pub color: Color,
}

/// Form data for category creation and editing.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryFormData {
    pub name: String,
    pub color: String,
}


#[cfg(test)]
mod color_tests {
    use crate::{Error, category::Color};

    #[test]
    fn accepts_hex_colors() {
        assert_eq!(Color::new("#A1b2C3"), Ok(Color::new_unchecked("#a1b2c3")));
        assert_eq!(Color::new(" #000000 "), Ok(Color::new_unchecked("#000000")));
    }

    #[test]
    fn rejects_malformed_colors() {
        for raw in ["", "red", "#fff", "a1b2c3", "#a1b2c3d", "#gggggg"] {
            assert_eq!(Color::new(raw), Err(Error::InvalidColor(raw.to_owned())));
        }
    }
}
