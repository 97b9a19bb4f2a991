//! User model for Gator.

use chrono::{DateTime, Utc};

/// A registered user. Users own feeds and follow them.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// User ID.
    pub id: i64,
    /// Unique user name.
    pub name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New user for creation.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique user name.
    pub name: String,
}

impl NewUser {
    /// Create a new user.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = NewUser::new("kahya");
        assert_eq!(user.name, "kahya");
    }
}
