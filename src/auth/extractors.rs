use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::config::ClientConfig;
use crate::response::{service, ApiError};

const GUARD_CODE: &str = "01";

fn reject(message: &str) -> ApiError {
    warn!(reason = message, "request rejected by auth guard");
    ApiError::unauthorized(service::AUTH, GUARD_CODE, message)
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Subject of a valid bearer token.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = authorization(parts)
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| reject("Invalid Token"))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims.sub)),
            Err(e) => {
                warn!(error = %e, "bearer token rejected");
                Err(ApiError::unauthorized(service::AUTH, GUARD_CODE, "Invalid Token"))
            }
        }
    }
}

/// Passes only requests carrying the configured client id and secret as
/// HTTP Basic credentials.
#[derive(Debug)]
pub struct ClientAuth;

#[async_trait]
impl<S> FromRequestParts<S> for ClientAuth
where
    S: Send + Sync,
    ClientConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let client = ClientConfig::from_ref(state);

        let header = authorization(parts).ok_or_else(|| reject("Authorization header is required"))?;
        let encoded = header
            .strip_prefix("Basic ")
            .ok_or_else(|| reject("Invalid authorization header"))?;

        let decoded = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
            .ok_or_else(|| reject("Failed to decode authorization header"))?;

        let (id, secret) = decoded
            .split_once(':')
            .ok_or_else(|| reject("Invalid authorization format"))?;

        if id != client.id || secret != client.secret {
            return Err(reject("Invalid credentials"));
        }
        Ok(ClientAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{Request, StatusCode};

    fn parts(auth: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/");
        if let Some(v) = auth {
            req = req.header(header::AUTHORIZATION, v);
        }
        req.body(()).unwrap().into_parts().0
    }

    fn basic(id: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
    }

    async fn client_auth(st: &AppState, auth: Option<&str>) -> Result<ClientAuth, ApiError> {
        ClientAuth::from_request_parts(&mut parts(auth), st).await
    }

    async fn auth_user(st: &AppState, auth: Option<&str>) -> Result<AuthUser, ApiError> {
        AuthUser::from_request_parts(&mut parts(auth), st).await
    }

    #[tokio::test]
    async fn basic_accepts_configured_client() {
        let st = AppState::fake();
        let header = basic("test-client", "test-client-secret");
        assert!(client_auth(&st, Some(&header)).await.is_ok());
    }

    #[tokio::test]
    async fn basic_rejections_name_the_problem() {
        let st = AppState::fake();
        let no_colon = format!("Basic {}", STANDARD.encode("test-client"));
        let wrong = basic("test-client", "nope");
        let cases = [
            (None, "Authorization header is required"),
            (Some("Bearer abc"), "Invalid authorization header"),
            (Some("Basic !!!"), "Failed to decode authorization header"),
            (Some(no_colon.as_str()), "Invalid authorization format"),
            (Some(wrong.as_str()), "Invalid credentials"),
        ];
        for (header, message) in cases {
            let err = client_auth(&st, header).await.err().expect(message);
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.response_code(), "4010201");
            assert_eq!(err.message(), message);
        }
    }

    #[tokio::test]
    async fn bearer_yields_subject() {
        let st = AppState::fake();
        let id = Uuid::new_v4();
        let token = st.jwt.sign_access(id).unwrap();
        let AuthUser(sub) = auth_user(&st, Some(&format!("Bearer {token}")))
            .await
            .ok()
            .unwrap();
        assert_eq!(sub, id);
    }

    #[tokio::test]
    async fn bearer_rejects_missing_or_foreign_tokens() {
        let st = AppState::fake();
        let foreign = JwtKeys::new(&crate::config::JwtConfig {
            secret: "other-secret".into(),
            issuer: "test-issuer".into(),
            ttl_minutes: 3,
        })
        .sign_access(Uuid::new_v4())
        .unwrap();
        let foreign = format!("Bearer {foreign}");

        for header in [None, Some("Basic abc"), Some("Bearer junk"), Some(foreign.as_str())] {
            let err = auth_user(&st, header).await.err().unwrap();
            assert_eq!(err.response_code(), "4010201");
            assert_eq!(err.message(), "Invalid Token");
        }
    }
}
