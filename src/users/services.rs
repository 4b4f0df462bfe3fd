use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{
    dto::{field_errors, CreateUserRequest, ListUsersQuery, LoginRequest, UpdateUserRequest},
    repo::StoreError,
    repo_types::User,
};
use crate::{
    auth::{
        jwt::TokenError,
        password::{is_strong_password, verify_password},
    },
    response::FieldError,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Forbidden,
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("bad request")]
    Validation(Vec<FieldError>),
    #[error("email already in use")]
    EmailTaken,
    #[error("password must contain upper and lower case letters, a digit and a symbol")]
    WeakPassword,
    #[error("invalid email")]
    UnknownEmail,
    #[error("invalid email or password")]
    WrongPassword,
    #[error("cannot delete yourself")]
    SelfDelete,
    #[error("user not found")]
    NotFound,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => UserError::EmailTaken,
            other => UserError::Store(other),
        }
    }
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::Validation(_) => ErrorKind::Validation,
            UserError::EmailTaken => ErrorKind::Conflict,
            UserError::WeakPassword
            | UserError::UnknownEmail
            | UserError::WrongPassword
            | UserError::SelfDelete => ErrorKind::Forbidden,
            UserError::NotFound => ErrorKind::NotFound,
            UserError::Hashing(_) | UserError::Token(_) | UserError::Store(_) => {
                ErrorKind::Internal
            }
        }
    }
}

fn validate<T: Validate>(payload: &T) -> Result<(), UserError> {
    payload
        .validate()
        .map_err(|e| UserError::Validation(field_errors(&e)))
}

fn hash(st: &AppState, plain: &str) -> Result<String, UserError> {
    st.hasher.hash(plain).map_err(|e| {
        error!(error = %e, "password hashing failed");
        UserError::Hashing(e.to_string())
    })
}

pub struct UserPage {
    pub users: Vec<User>,
    pub page: i64,
    pub total: i64,
}

pub async fn register(st: &AppState, mut payload: CreateUserRequest) -> Result<(), UserError> {
    payload.email = payload.email.trim().to_lowercase();
    validate(&payload)?;

    if st.store.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(UserError::EmailTaken);
    }

    if !is_strong_password(&payload.password) {
        warn!(email = %payload.email, "weak password");
        return Err(UserError::WeakPassword);
    }

    let password_hash = hash(st, &payload.password)?;
    let user = st
        .store
        .create(&payload.email, &payload.full_name, &password_hash)
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(())
}

pub async fn login(st: &AppState, mut payload: LoginRequest) -> Result<String, UserError> {
    payload.email = payload.email.trim().to_lowercase();
    validate(&payload)?;

    let Some(user) = st.store.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(UserError::UnknownEmail);
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "stored hash unreadable");
        UserError::Hashing(e.to_string())
    })?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(UserError::WrongPassword);
    }

    let token = st.jwt.sign_access(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(token)
}

/// The total counts every active user; listing filters do not apply to it.
pub async fn list(st: &AppState, query: &ListUsersQuery) -> Result<UserPage, UserError> {
    let page = query.page_request();
    let filter = query.filter();

    let users = if page.is_empty() {
        debug!(page = page.page, size = page.size, "empty page requested");
        Vec::new()
    } else {
        st.store.list(&filter, page).await?
    };
    let total = st.store.count_active().await?;

    Ok(UserPage {
        users,
        page: page.page,
        total,
    })
}

pub async fn get_by_id(st: &AppState, id: Uuid) -> Result<User, UserError> {
    st.store.find_by_id(id).await?.ok_or(UserError::NotFound)
}

pub async fn update(st: &AppState, id: Uuid, payload: UpdateUserRequest) -> Result<(), UserError> {
    validate(&payload)?;

    // A failed hash aborts before anything is written.
    let password_hash = hash(st, &payload.password)?;
    let updated = st
        .store
        .update(id, &payload.full_name, &password_hash)
        .await?;

    if updated {
        info!(user_id = %id, "user updated");
    } else {
        debug!(user_id = %id, "update matched no active user");
    }
    Ok(())
}

pub async fn delete(st: &AppState, caller: Uuid, id: Uuid) -> Result<(), UserError> {
    if caller == id {
        warn!(user_id = %id, "attempt to delete self");
        return Err(UserError::SelfDelete);
    }

    if st.store.soft_delete(id).await? {
        info!(user_id = %id, deleted_by = %caller, "user deleted");
    } else {
        debug!(user_id = %id, "delete matched no active user");
    }
    Ok(())
}
