//! Storage plumbing: backend selection, pools, schemas and the watermark store.
//!
//! Exactly one SQL backend is compiled in. `postgres` takes precedence when
//! both features are enabled; `sqlite` is the default for local development
//! and tests.

use sea_query::SchemaStatementBuilder;
use sea_query_binder::{SqlxBinder, SqlxValues};
use tracing::info;

use crate::error::Result;

pub mod mock;
pub mod schema;
pub mod source;
pub mod sql;
mod watermark_store;

pub use sql::SqlWatermarkStore;
pub use watermark_store::{default_epoch, WatermarkStore, DEFAULT_EPOCH_SECS};

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable one of the `sqlite` or `postgres` features");

#[cfg(feature = "postgres")]
mod backend {
    use sea_query::PostgresQueryBuilder;

    pub type Db = sqlx::Postgres;
    pub type DbRow = sqlx::postgres::PgRow;
    pub const NAME: &str = "postgres";

    pub fn query_builder() -> PostgresQueryBuilder {
        PostgresQueryBuilder
    }
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
mod backend {
    use sea_query::SqliteQueryBuilder;

    pub type Db = sqlx::Sqlite;
    pub type DbRow = sqlx::sqlite::SqliteRow;
    pub const NAME: &str = "sqlite";

    pub fn query_builder() -> SqliteQueryBuilder {
        SqliteQueryBuilder
    }
}

pub use backend::{Db, DbRow};

/// Connection pool for the compiled-in backend.
pub type Pool = sqlx::Pool<Db>;

/// Open transaction on the compiled-in backend.
pub type Transaction = sqlx::Transaction<'static, Db>;

/// Name of the compiled-in backend, for logging.
pub fn backend_name() -> &'static str {
    backend::NAME
}

/// Build a DML statement into SQL text plus bound values.
pub fn build_query<T: SqlxBinder>(stmt: &T) -> (String, SqlxValues) {
    stmt.build_sqlx(backend::query_builder())
}

/// Build a DDL statement into SQL text.
pub fn build_schema<T: SchemaStatementBuilder>(stmt: &T) -> String {
    stmt.to_string(backend::query_builder())
}

/// Open a pool without retry. Binaries go through
/// [`crate::utils::bootstrap::connect_with_retry`] instead.
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<Pool> {
    let pool = sqlx::pool::PoolOptions::<Db>::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

/// Create every warehouse table and index that does not exist yet.
///
/// Dimensions are created before facts so fact foreign keys resolve.
pub async fn init_warehouse(pool: &Pool) -> Result<()> {
    for table in schema::warehouse_tables() {
        sqlx::query(&build_schema(&table)).execute(pool).await?;
    }
    for index in schema::warehouse_indexes() {
        sqlx::query(&build_schema(&index)).execute(pool).await?;
    }
    info!(backend = backend_name(), "Warehouse schema initialized");
    Ok(())
}
