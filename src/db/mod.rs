//! Postgres storage.
//!
//! `Db` wraps the pool; each submodule adds the queries for one area of the
//! schema. Rows are read with runtime-checked `query_as` into `FromRow` structs
//! and converted into domain types at this boundary.

mod catalog;
mod customers;
mod landing;
mod orders;
mod settings;

pub use catalog::ProductFilter;
pub use orders::OrderFilter;

use anyhow::Context;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to the database")?;
        MIGRATOR.run(&pool).await.context("failed to run migrations")?;
        Ok(Self { pool })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
