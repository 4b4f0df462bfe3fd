use sqlx::FromRow;
use uuid::Uuid;

/// Active (non-deleted) user record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[sqlx(rename = "fullname")]
    pub full_name: String,
    pub password_hash: String, // Argon2 PHC string
}

/// Exact-match filters for listing; empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl UserFilter {
    pub fn new(email: Option<String>, full_name: Option<String>) -> Self {
        Self {
            email: email.filter(|s| !s.is_empty()),
            full_name: full_name.filter(|s| !s.is_empty()),
        }
    }
}

/// 1-based page of `size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// A page or size below 1 selects nothing.
    pub fn is_empty(&self) -> bool {
        self.page < 1 || self.size < 1
    }

    pub fn limit(&self) -> i64 {
        self.size.max(0)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.size.max(0))
    }
}
