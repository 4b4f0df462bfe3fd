use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::repo_types::{PageRequest, User, UserFilter};
use crate::response::FieldError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

// Each field validator stops at its first failing rule, so a field yields at
// most one error.

fn required_field(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn email_field(value: &str) -> Result<(), ValidationError> {
    required_field(value)?;
    if !is_valid_email(value) {
        return Err(ValidationError::new("email"));
    }
    Ok(())
}

fn password_field(value: &str) -> Result<(), ValidationError> {
    required_field(value)?;
    let len = value.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(ValidationError::new("min"));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ValidationError::new("max"));
    }
    Ok(())
}

fn message_for(code: &str) -> &'static str {
    match code {
        "required" => "required",
        "email" => "invalid format email",
        "min" => "minimum value is not exceed",
        "max" => "max value is exceed",
        _ => "invalid value",
    }
}

/// Flattens validator output into `[{field, message}]`, sorted by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter()
                .map(move |e| FieldError::new(field.clone(), message_for(&e.code)))
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Request body for registration. Missing fields decode as empty strings
/// and are reported as `required`. The wire name `fullname` is an alias so
/// validation errors still name the field `full_name`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateUserRequest {
    #[validate(custom(function = "email_field"))]
    pub email: String,
    #[serde(alias = "fullname")]
    #[validate(custom(function = "required_field"))]
    pub full_name: String,
    #[validate(custom(function = "password_field"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(custom(function = "email_field"))]
    pub email: String,
    #[validate(custom(function = "required_field"))]
    pub password: String,
}

/// Both fields are mandatory; there is no partial update.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[serde(alias = "fullname")]
    #[validate(custom(function = "required_field"))]
    pub full_name: String,
    #[validate(custom(function = "password_field"))]
    pub password: String,
}

/// Raw listing query; numbers stay strings so junk can fall back to zero.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub email: Option<String>,
    pub fullname: Option<String>,
}

fn int_or_zero(value: Option<&str>) -> i64 {
    value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0)
}

impl ListUsersQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: int_or_zero(self.page.as_deref()),
            size: int_or_zero(self.size.as_deref()),
        }
    }

    /// Emails are stored trimmed and lowercased, so the filter is too.
    pub fn filter(&self) -> UserFilter {
        UserFilter::new(
            self.email.as_deref().map(|e| e.trim().to_lowercase()),
            self.fullname.clone(),
        )
    }
}

/// User as returned by the API; `password` carries the stored hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            fullname: u.full_name,
            email: u.email,
            password: u.password_hash,
        }
    }
}
