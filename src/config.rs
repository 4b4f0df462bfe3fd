use std::{str::FromStr, time::Duration};

use anyhow::Context;
use serde::Deserialize;

/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

/// Static client pair checked by the Basic guard on login/registration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// Full connection string; takes precedence over the individual parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub min_idle: u32,
    pub max_lifetime: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DbConfig,
    pub jwt: JwtConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| get(key).with_context(|| format!("{key} is not set"));

        let url = get("DATABASE_URL");
        // The individual parts are only mandatory when no DATABASE_URL is given.
        let part = |key: &str| -> anyhow::Result<String> {
            if url.is_some() {
                Ok(get(key).unwrap_or_default())
            } else {
                required(key)
            }
        };

        let max_lifetime = match get("DB_MAX_LIFETIME") {
            Some(v) => humantime::parse_duration(&v)
                .with_context(|| format!("DB_MAX_LIFETIME is not a duration: {v}"))?,
            None => Duration::from_secs(30 * 60),
        };

        let database = DbConfig {
            host: part("DB_HOST")?,
            port: parse_or(&get, "DB_PORT", 5432)?,
            user: part("DB_USER")?,
            password: part("DB_PASS")?,
            name: part("DB_NAME")?,
            max_connections: parse_or(&get, "DB_MAX_CONN", 10)?,
            min_idle: parse_or(&get, "DB_MAX_IDLE", 2)?,
            max_lifetime,
            url,
        };

        let ttl_minutes: i64 = parse_or(&get, "JWT_TTL_MINUTES", 3)?;
        anyhow::ensure!(
            (1..=MAX_TOKEN_TTL_MINUTES).contains(&ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {ttl_minutes}"
        );

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "users-api".into()),
            ttl_minutes,
        };

        let client = ClientConfig {
            id: required("CLIENT_ID")?,
            secret: required("CLIENT_SECRET")?,
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 8080)?,
            database,
            jwt,
            client,
        })
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {v}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DB_HOST", "db"),
        ("DB_USER", "app"),
        ("DB_PASS", "pw"),
        ("DB_NAME", "users"),
        ("JWT_SECRET", "s3cret"),
        ("CLIENT_ID", "client"),
        ("CLIENT_SECRET", "client-secret"),
    ];

    #[test]
    fn applies_defaults() {
        let cfg = AppConfig::from_lookup(lookup(BASE)).expect("config");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.database.port, 5432);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.database.min_idle, 2);
        assert_eq!(cfg.database.max_lifetime, Duration::from_secs(1800));
        assert_eq!(cfg.jwt.issuer, "users-api");
        assert_eq!(cfg.jwt.ttl_minutes, 3);
        assert_eq!(cfg.client.id, "client");
        assert!(cfg.database.url.is_none());
    }

    #[test]
    fn parses_overrides() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("APP_PORT", "9000"),
            ("DB_MAX_CONN", "25"),
            ("DB_MAX_LIFETIME", "1h"),
            ("JWT_ISSUER", "incubation"),
        ]);
        let cfg = AppConfig::from_lookup(lookup(&pairs)).expect("config");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.database.max_connections, 25);
        assert_eq!(cfg.database.max_lifetime, Duration::from_secs(3600));
        assert_eq!(cfg.jwt.issuer, "incubation");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let pairs: Vec<_> = BASE.iter().filter(|(k, _)| *k != "JWT_SECRET").copied().collect();
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn database_url_makes_parts_optional() {
        let pairs = [
            ("DATABASE_URL", "postgres://app:pw@db/users"),
            ("JWT_SECRET", "s3cret"),
            ("CLIENT_ID", "client"),
            ("CLIENT_SECRET", "client-secret"),
        ];
        let cfg = AppConfig::from_lookup(lookup(&pairs)).expect("config");
        assert_eq!(cfg.database.url.as_deref(), Some("postgres://app:pw@db/users"));
        assert!(cfg.database.host.is_empty());
    }

    #[test]
    fn rejects_garbage_numbers() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DB_MAX_CONN", "lots"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn token_ttl_must_be_in_range() {
        for bad in ["0", "-5", "525601", "9223372036854775807"] {
            let mut pairs = BASE.to_vec();
            pairs.push(("JWT_TTL_MINUTES", bad));
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(err.to_string().contains("JWT_TTL_MINUTES"), "{bad}: {err}");
        }

        let mut pairs = BASE.to_vec();
        pairs.push(("JWT_TTL_MINUTES", "525600"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).expect("config");
        assert_eq!(cfg.jwt.ttl_minutes, MAX_TOKEN_TTL_MINUTES);
    }
}
