use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateUserRequest, ListUsersQuery, LoginRequest, UpdateUserRequest, UserView},
    services::{self, ErrorKind, UserError},
};
use crate::{
    auth::extractors::{AuthUser, ClientAuth},
    response::{service, ApiError, ApiResponse, FieldError, Paging},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/login", post(login))
        .route("/users/create", post(register))
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn api_error(service: &'static str, code: &'static str, err: UserError) -> ApiError {
    if let UserError::Validation(fields) = err {
        return ApiError::bad_request(service, code, fields);
    }
    match err.kind() {
        ErrorKind::Validation => ApiError::bad_request(service, code, Vec::new()),
        ErrorKind::Forbidden | ErrorKind::Conflict => {
            ApiError::forbidden(service, code, err.to_string())
        }
        ErrorKind::NotFound => ApiError::not_found(service, code, err.to_string()),
        ErrorKind::Internal => ApiError::internal(service, code, err),
    }
}

fn body<T>(
    service: &'static str,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    match payload {
        Ok(Json(v)) => Ok(v),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unreadable request body");
            Err(ApiError::malformed_body(service, "01", rejection.body_text()))
        }
    }
}

fn parse_id(service: &'static str, code: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::bad_request(service, code, vec![FieldError::new("id", "invalid format id")])
    })
}

// --- call-site codes ---

fn register_code(e: &UserError) -> &'static str {
    match e {
        UserError::Validation(_) => "01",
        UserError::EmailTaken => "02",
        UserError::WeakPassword | UserError::Store(_) => "03",
        _ => "04",
    }
}

fn login_code(e: &UserError) -> &'static str {
    match e {
        UserError::Validation(_) => "01",
        UserError::UnknownEmail => "02",
        UserError::WrongPassword => "03",
        UserError::Store(_) => "05",
        _ => "04",
    }
}

fn get_code(e: &UserError) -> &'static str {
    match e {
        UserError::NotFound => "03",
        _ => "01",
    }
}

fn update_code(e: &UserError) -> &'static str {
    match e {
        UserError::Validation(_) => "01",
        UserError::Hashing(_) => "02",
        _ => "03",
    }
}

fn delete_code(e: &UserError) -> &'static str {
    match e {
        UserError::SelfDelete => "01",
        _ => "02",
    }
}

// --- handlers ---

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    _client: ClientAuth,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let req = body(service::REGISTER, payload)?;
    services::register(&state, req)
        .await
        .map_err(|e| api_error(service::REGISTER, register_code(&e), e))?;
    Ok(ApiResponse::empty(service::REGISTER, "04"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    _client: ClientAuth,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<String>, ApiError> {
    let req = body(service::LOGIN, payload)?;
    let token = services::login(&state, req)
        .await
        .map_err(|e| api_error(service::LOGIN, login_code(&e), e))?;
    Ok(ApiResponse::ok(service::LOGIN, "05", token))
}

/// `paging.size` carries the total number of active users.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<ApiResponse<Vec<UserView>>, ApiError> {
    let page = services::list(&state, &query)
        .await
        .map_err(|e| api_error(service::LIST, "01", e))?;
    let users = page.users.into_iter().map(UserView::from).collect();
    Ok(ApiResponse::page(
        service::LIST,
        "02",
        users,
        Paging {
            page: page.page,
            size: page.total,
        },
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserView>, ApiError> {
    let id = parse_id(service::GET, "03", &id)?;
    let user = services::get_by_id(&state, id)
        .await
        .map_err(|e| api_error(service::GET, get_code(&e), e))?;
    Ok(ApiResponse::ok(service::GET, "02", UserView::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = parse_id(service::UPDATE, "01", &id)?;
    let req = body(service::UPDATE, payload)?;
    services::update(&state, id, req)
        .await
        .map_err(|e| api_error(service::UPDATE, update_code(&e), e))?;
    Ok(ApiResponse::empty(service::UPDATE, "02"))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = parse_id(service::DELETE, "04", &id)?;
    services::delete(&state, caller, id)
        .await
        .map_err(|e| api_error(service::DELETE, delete_code(&e), e))?;
    Ok(ApiResponse::empty(service::DELETE, "03"))
}
