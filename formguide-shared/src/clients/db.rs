use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::errors::{AppError, AppResult};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str, max_size: u32) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(2))
        .test_on_check_out(true)
        .build(manager)?;

    tracing::info!(max_size, "database connection pool created");
    Ok(pool)
}

/// Checks a connection out of the pool, surfacing exhaustion as a server error.
pub fn checkout(pool: &DbPool) -> AppResult<DbConn> {
    pool.get()
        .map_err(|e| AppError::internal(format!("database pool unavailable: {e}")))
}
