use anyhow::Context;
use sqlx::{migrate::MigrateDatabase, postgres::PgPoolOptions, PgPool, Postgres};
use tracing::info;

use crate::config::AppConfig;

/// Creates the database when missing, connects a pool and applies the
/// embedded migrations.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let exists = Postgres::database_exists(&config.database_url)
        .await
        .context("check database exists")?;
    if !exists {
        Postgres::create_database(&config.database_url)
            .await
            .context("create database")?;
        info!("database created");
    }

    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    info!("database connected");

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("migrations applied");

    Ok(db)
}
