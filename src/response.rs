//! JSON envelope shared by every endpoint.
//!
//! `responseCode` is the HTTP status followed by a two-digit service code and
//! a two-digit code naming the call site, e.g. `4030602`.

use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub mod service {
    pub const REGISTER: &str = "01";
    pub const LOGIN: &str = "02";
    pub const AUTH: &str = "02";
    pub const LIST: &str = "03";
    pub const GET: &str = "04";
    pub const UPDATE: &str = "05";
    pub const DELETE: &str = "06";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub page: i64,
    pub size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub response_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_description: Vec<FieldError>,
}

fn response_code(status: StatusCode, service: &str, code: &str) -> String {
    format!("{}{}{}", status.as_u16(), service, code)
}

/// Successful (200) envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    service: &'static str,
    code: &'static str,
    data: Option<T>,
    paging: Option<Paging>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(service: &'static str, code: &'static str, data: T) -> Self {
        Self {
            service,
            code,
            data: Some(data),
            paging: None,
        }
    }

    pub fn page(service: &'static str, code: &'static str, data: T, paging: Paging) -> Self {
        Self {
            service,
            code,
            data: Some(data),
            paging: Some(paging),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty(service: &'static str, code: &'static str) -> Self {
        Self {
            service,
            code,
            data: None,
            paging: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            response_code: response_code(StatusCode::OK, self.service, self.code),
            message: "success".into(),
            data: self.data,
            paging: self.paging,
            error: None,
            error_description: Vec::new(),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Failure envelope; the status decides the first three digits of the code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    service: &'static str,
    code: &'static str,
    message: String,
    error: Option<String>,
    fields: Vec<FieldError>,
}

impl ApiError {
    fn new(status: StatusCode, service: &'static str, code: &'static str, message: String) -> Self {
        Self {
            status,
            service,
            code,
            message,
            error: None,
            fields: Vec::new(),
        }
    }

    pub fn bad_request(service: &'static str, code: &'static str, fields: Vec<FieldError>) -> Self {
        Self {
            fields,
            ..Self::new(StatusCode::BAD_REQUEST, service, code, "bad request".into())
        }
    }

    /// Body that could not be decoded at all, so there is no field to blame.
    pub fn malformed_body(service: &'static str, code: &'static str, cause: impl Into<String>) -> Self {
        Self {
            error: Some(cause.into()),
            ..Self::new(StatusCode::BAD_REQUEST, service, code, "bad request".into())
        }
    }

    pub fn unauthorized(service: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, service, code, message.into())
    }

    pub fn forbidden(service: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, service, code, message.into())
    }

    pub fn not_found(service: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, service, code, message.into())
    }

    pub fn internal(service: &'static str, code: &'static str, cause: impl Display) -> Self {
        Self {
            error: Some(cause.to_string()),
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                service,
                code,
                "internal server error".into(),
            )
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn response_code(&self) -> String {
        response_code(self.status, self.service, self.code)
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response_code = self.response_code();
        if self.status.is_server_error() {
            error!(
                code = %response_code,
                error = self.error.as_deref().unwrap_or_default(),
                "request failed"
            );
        }
        let body: Envelope<()> = Envelope {
            response_code,
            message: self.message,
            data: None,
            paging: None,
            error: self.error,
            error_description: self.fields,
        };
        (self.status, Json(body)).into_response()
    }
}
