//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user; accounts are owned by usernames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            username: "alice".to_string(),
            hashed_password: "c2FsdA==$aGFzaA==".to_string(),
            full_name: "Alice Liddell".to_string(),
            email: "alice@example.com".to_string(),
            password_changed_at: now,
            created_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice@example.com"));
        assert!(!json.contains("hashed_password"));
    }
}
