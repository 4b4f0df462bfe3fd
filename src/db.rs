use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::config::DbConfig;

pub fn connect_options(cfg: &DbConfig) -> anyhow::Result<PgConnectOptions> {
    if let Some(url) = &cfg.url {
        return url.parse().context("parse DATABASE_URL");
    }
    Ok(PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.name))
}

pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    tracing::info!(host = %cfg.host, database = %cfg.name, "connecting to database");
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_idle.min(cfg.max_connections))
        .max_lifetime(cfg.max_lifetime)
        .connect_with(connect_options(cfg)?)
        .await
        .context("connect to database")?;
    tracing::info!("connected to database");
    Ok(db)
}

pub async fn migrate(db: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
}
