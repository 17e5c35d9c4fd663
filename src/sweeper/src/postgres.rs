use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, query};

use common::Flavor;

use crate::catalog::{
    DATABASES_QUERY, IDENTITY_QUERY, SessionCatalog, namespaces_query, sessions_query,
};
use crate::error::{SweepError, SweepResult};
use crate::session::{ActiveSession, BackendIdentity};

/// Parse a DSN, optionally retargeting it at another database.
pub fn connect_options(dsn: &str, database: Option<&str>) -> SweepResult<PgConnectOptions> {
    let options = PgConnectOptions::from_str(dsn).map_err(|e| {
        log::error!("Failed to parse connection string: {e}");
        SweepError::InvalidDsn(e.to_string())
    })?;
    Ok(match database {
        Some(db) => options.database(db),
        None => options,
    })
}

/// Database a DSN connects to when none is named explicitly.
pub fn default_database(dsn: &str) -> SweepResult<String> {
    let options = connect_options(dsn, None)?;
    Ok(options
        .get_database()
        .unwrap_or_else(|| options.get_username())
        .to_string())
}

/// Catalog access over one pinned PostgreSQL or Greenplum backend.
pub struct PgSessionCatalog {
    conn: PoolConnection<Postgres>,
    pool: PgPool,
    flavor: Flavor,
}

impl PgSessionCatalog {
    /// Open a connection and pin one backend for the lifetime of the value.
    pub async fn connect(
        options: PgConnectOptions,
        flavor: Flavor,
        timeout: Duration,
    ) -> SweepResult<Self> {
        let database = options.get_database().unwrap_or_default().to_string();
        log::debug!("Connecting to database {database} ({flavor})");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                log::error!("Failed to connect to database {database}: {e}");
                e
            })?;
        let conn = pool.acquire().await?;

        Ok(Self { conn, pool, flavor })
    }

    /// Databases that accept connections, `template0` excluded.
    pub async fn list_databases(&mut self) -> SweepResult<Vec<String>> {
        let rows = query(DATABASES_QUERY).fetch_all(&mut *self.conn).await?;
        Ok(rows.iter().map(|row| row.get("datname")).collect())
    }

    /// Release the backend and shut the pool down.
    pub async fn close(self) {
        let Self { conn, pool, .. } = self;
        drop(conn);
        pool.close().await;
    }
}

#[async_trait]
impl SessionCatalog for PgSessionCatalog {
    async fn backend_identity(&mut self) -> SweepResult<BackendIdentity> {
        let row = query(IDENTITY_QUERY).fetch_one(&mut *self.conn).await?;
        Ok(BackendIdentity {
            pid: row.get("pid"),
            database: row.get("datname"),
        })
    }

    async fn temp_namespaces(&mut self) -> SweepResult<Vec<String>> {
        let rows = query(namespaces_query(self.flavor))
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get::<Option<String>, _>("nspname"))
            .collect())
    }

    async fn active_sessions(&mut self) -> SweepResult<Vec<ActiveSession>> {
        let rows = query(sessions_query(self.flavor))
            .fetch_all(&mut *self.conn)
            .await?;
        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            // A NULL key never satisfies the join.
            let Some(session_id) = row.try_get::<Option<i32>, _>("sess_id")? else {
                continue;
            };
            sessions.push(ActiveSession {
                session_id,
                database: row.try_get("datname")?,
                backend_type: row.try_get("backend_type")?,
                pid: row.try_get("pid")?,
            });
        }
        Ok(sessions)
    }

    async fn execute(&mut self, sql: &str) -> SweepResult<()> {
        query(sql).execute(&mut *self.conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_from_dsn() {
        assert_eq!(
            default_database("postgres://gpadmin@mdw:5432/sales").unwrap(),
            "sales"
        );
    }

    #[test]
    fn test_default_database_falls_back_to_user() {
        assert_eq!(
            default_database("postgres://gpadmin@mdw:5432").unwrap(),
            "gpadmin"
        );
    }

    #[test]
    fn test_connect_options_retarget_database() {
        let options = connect_options("postgres://gpadmin@mdw:5432/sales", Some("hr")).unwrap();
        assert_eq!(options.get_database(), Some("hr"));
    }

    #[test]
    fn test_invalid_dsn() {
        let err = connect_options("postgres://gpadmin@mdw:notaport/sales", None).unwrap_err();
        assert!(matches!(err, SweepError::InvalidDsn(_)));
    }
}
