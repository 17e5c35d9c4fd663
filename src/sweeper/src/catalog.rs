use async_trait::async_trait;

use common::Flavor;

use crate::error::SweepResult;
use crate::orphan::{self, OrphanSet};
use crate::session::{ActiveSession, BackendIdentity};

/// A single backend connection able to read the cluster catalog and run DDL.
///
/// Every call on one value must run on the same backend, otherwise the
/// self-exclusion rule compares against the wrong pid.
#[async_trait]
pub trait SessionCatalog: Send {
    /// Pid and current database of the backend behind this handle.
    async fn backend_identity(&mut self) -> SweepResult<BackendIdentity>;

    /// Names matching the temp pattern, unioned across coordinator and segments.
    async fn temp_namespaces(&mut self) -> SweepResult<Vec<String>>;

    /// Sessions currently reported by the activity view.
    async fn active_sessions(&mut self) -> SweepResult<Vec<ActiveSession>>;

    /// Execute a DDL statement.
    async fn execute(&mut self, sql: &str) -> SweepResult<()>;
}

/// Compute the orphaned temp namespaces visible through `catalog`.
pub async fn find_orphans<C>(catalog: &mut C) -> SweepResult<OrphanSet>
where
    C: SessionCatalog + ?Sized,
{
    let checker = catalog.backend_identity().await?;
    find_orphans_as(catalog, &checker).await
}

/// Like [`find_orphans`], with the identity of the catalog's backend already known.
pub async fn find_orphans_as<C>(
    catalog: &mut C,
    checker: &BackendIdentity,
) -> SweepResult<OrphanSet>
where
    C: SessionCatalog + ?Sized,
{
    // Namespaces must be listed before sessions: a session starting in
    // between would otherwise own a namespace that has no session row.
    let candidates = catalog.temp_namespaces().await?;
    let sessions = catalog.active_sessions().await?;

    log::debug!(
        "Checking {} temp namespaces against {} sessions in {} (pid {})",
        candidates.len(),
        sessions.len(),
        checker.database,
        checker.pid
    );

    let orphans = orphan::classify(candidates.iter().map(String::as_str), &sessions, checker);
    for orphan in orphans.iter() {
        log::debug!("Orphaned temp namespace {}: {}", orphan.name, orphan.reason);
    }
    Ok(orphans)
}

pub(crate) const IDENTITY_QUERY: &str =
    "SELECT pg_backend_pid() AS pid, current_database()::text AS datname";

pub(crate) const DATABASES_QUERY: &str = r#"
    SELECT datname::text AS datname
    FROM pg_catalog.pg_database
    WHERE datallowconn AND datname <> 'template0'
    ORDER BY datname
"#;

/// Temp namespace names for the given flavor.
pub(crate) fn namespaces_query(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::Greenplum => {
            r#"
            SELECT nspname::text AS nspname
            FROM gp_dist_random('pg_catalog.pg_namespace')
            WHERE nspname ~ '^pg_t(emp|oast_temp)_\d+'
            UNION
            SELECT nspname::text AS nspname
            FROM pg_catalog.pg_namespace
            WHERE nspname ~ '^pg_t(emp|oast_temp)_\d+'
            "#
        }
        Flavor::Postgres => {
            r#"
            SELECT nspname::text AS nspname
            FROM pg_catalog.pg_namespace
            WHERE nspname ~ '^pg_t(emp|oast_temp)_\d+'
            "#
        }
    }
}

/// Active sessions keyed the way the flavor names its temp namespaces.
pub(crate) fn sessions_query(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::Greenplum => {
            r#"
            SELECT sess_id, datname::text AS datname, backend_type, pid
            FROM pg_stat_activity
            "#
        }
        // Temp namespaces carry the backend id, not the pid.
        Flavor::Postgres => {
            r#"
            SELECT b.id AS sess_id,
                   d.datname::text AS datname,
                   a.backend_type,
                   pg_stat_get_backend_pid(b.id) AS pid
            FROM pg_stat_get_backend_idset() AS b(id)
            LEFT JOIN pg_catalog.pg_database d ON d.oid = pg_stat_get_backend_dbid(b.id)
            LEFT JOIN pg_stat_activity a ON a.pid = pg_stat_get_backend_pid(b.id)
            "#
        }
    }
}
