use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{Argon2Hasher, CredentialHasher};
use crate::config::{AppConfig, ClientConfig};
use crate::db;
use crate::users::repo::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let pool = db::connect(&config.database).await?;
        db::migrate(&pool).await;

        let store = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;
        Ok(Self::from_parts(store, Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            store,
            config,
            jwt,
            hasher: Arc::new(Argon2Hasher),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{DbConfig, JwtConfig};
        use crate::users::memory::MemoryUserStore;
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database: DbConfig {
                url: None,
                host: "localhost".into(),
                port: 5432,
                user: "postgres".into(),
                password: "postgres".into(),
                name: "users".into(),
                max_connections: 1,
                min_idle: 0,
                max_lifetime: Duration::from_secs(60),
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                ttl_minutes: 3,
            },
            client: ClientConfig {
                id: "test-client".into(),
                secret: "test-client-secret".into(),
            },
        });

        Self::from_parts(Arc::new(MemoryUserStore::new()), config)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for ClientConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.client.clone()
    }
}
