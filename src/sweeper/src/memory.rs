//! In-memory catalog for exercising the sweep without a cluster.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;

use crate::catalog::SessionCatalog;
use crate::error::{SweepError, SweepResult};
use crate::namespace::{drop_statement, is_temp_namespace};
use crate::session::{ActiveSession, BackendIdentity};

/// A fake cluster: a coordinator catalog, segment catalogs and an activity view.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    identity: BackendIdentity,
    coordinator: Vec<String>,
    segments: Vec<String>,
    sessions: Vec<ActiveSession>,
    failing: HashSet<String>,
    executed: Vec<String>,
    identity_lookups: usize,
}

impl InMemoryCatalog {
    /// A catalog checked from backend `pid` connected to `database`.
    pub fn new(database: &str, pid: i32) -> Self {
        Self {
            identity: BackendIdentity {
                pid,
                database: database.to_string(),
            },
            coordinator: Vec::new(),
            segments: Vec::new(),
            sessions: Vec::new(),
            failing: HashSet::new(),
            executed: Vec::new(),
            identity_lookups: 0,
        }
    }

    pub fn with_coordinator_namespaces(mut self, names: &[&str]) -> Self {
        self.coordinator.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Namespaces only present on segments.
    pub fn with_segment_namespaces(mut self, names: &[&str]) -> Self {
        self.segments.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_session(mut self, session: ActiveSession) -> Self {
        self.sessions.push(session);
        self
    }

    /// Make the drop of `name` fail.
    pub fn failing_drop(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Every namespace still present anywhere in the cluster, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        self.coordinator
            .iter()
            .chain(&self.segments)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// How many times the backend identity was queried.
    pub fn identity_lookups(&self) -> usize {
        self.identity_lookups
    }
}

#[async_trait]
impl SessionCatalog for InMemoryCatalog {
    async fn backend_identity(&mut self) -> SweepResult<BackendIdentity> {
        self.identity_lookups += 1;
        Ok(self.identity.clone())
    }

    async fn temp_namespaces(&mut self) -> SweepResult<Vec<String>> {
        Ok(self
            .namespaces()
            .into_iter()
            .filter(|n| is_temp_namespace(n))
            .collect())
    }

    async fn active_sessions(&mut self) -> SweepResult<Vec<ActiveSession>> {
        Ok(self.sessions.clone())
    }

    async fn execute(&mut self, sql: &str) -> SweepResult<()> {
        let target = self.namespaces().into_iter().find(|n| drop_statement(n) == sql);
        if let Some(name) = target.as_ref().filter(|n| self.failing.contains(*n)) {
            return Err(SweepError::Database(sqlx::Error::Protocol(format!(
                "cannot drop schema {name}"
            ))));
        }
        self.executed.push(sql.to_string());
        if let Some(name) = target {
            self.coordinator.retain(|n| *n != name);
            self.segments.retain(|n| *n != name);
        }
        Ok(())
    }
}
