//! PostgreSQL pool construction.
//!
//! The pool is built once by the process entry point and handed to
//! [`crate::store::postgres::PgStore`]; nothing here caches it globally.

use std::time::Duration;

use sqlx::Connection;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Time to wait for a connection from the pool.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while establishing connectivity.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Gave up after {attempts} connection attempts: {last}")]
    Exhausted { attempts: u32, last: sqlx::Error },
}

/// Build a pool that connects on first use.
pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy(database_url)?;
    Ok(pool)
}

/// Connect and run `SELECT 1`, retrying a fixed number of times with a fixed delay.
/// Returns the attempt that succeeded.
///
/// Operator tooling only; request handling never retries.
pub async fn wait_for_database(
    database_url: &str,
    attempts: u32,
    delay: Duration,
) -> Result<u32, DbError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = async {
            let mut conn = PgConnection::connect(database_url).await?;
            sqlx::query("SELECT 1").execute(&mut conn).await?;
            conn.close().await
        }
        .await;

        match result {
            Ok(()) => {
                info!(attempt, "database reachable");
                return Ok(attempt);
            }
            Err(e) if attempt >= attempts => {
                return Err(DbError::Exhausted { attempts, last: e });
            }
            Err(e) => {
                warn!(attempt, attempts, "database connection failed: {e}");
                attempt += 1;
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lazy_pool_does_not_connect_eagerly() {
        // Nothing listens on port 1; a lazy pool must still construct.
        let pool = connect_lazy("postgres://nobody@127.0.0.1:1/none", 2).unwrap();
        assert_eq!(pool.size(), 0);
    }

    #[tokio::test]
    async fn retry_gives_up_after_fixed_attempts() {
        let err = wait_for_database(
            "postgres://nobody@127.0.0.1:1/none",
            2,
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn malformed_url_is_rejected_up_front() {
        assert!(connect_lazy("not a url", 1).is_err());
    }
}
