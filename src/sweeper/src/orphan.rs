//! Orphan classification.
//!
//! A temp namespace is joined against every active session sharing its
//! session id. It is orphaned when nothing joins, or when any joined session
//! is disqualified from owning it.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::namespace::TempNamespace;
use crate::session::{ActiveSession, BackendIdentity};

/// Why a namespace was classified as orphaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// No active session carries the namespace's session id
    NoSession,
    /// The matching backend is an autovacuum launcher or worker
    Autovacuum,
    /// The matching backend is not attached to any database
    NoDatabase,
    /// The matching backend is connected to another database
    OtherDatabase,
    /// The matching backend is the one running this check
    SelfBackend,
}

impl std::fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrphanReason::NoSession => "no active session",
            OrphanReason::Autovacuum => "autovacuum backend",
            OrphanReason::NoDatabase => "session has no database",
            OrphanReason::OtherDatabase => "session in another database",
            OrphanReason::SelfBackend => "checking backend",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    pub name: String,
    pub reason: OrphanReason,
}

/// Distinct orphaned namespaces, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrphanSet(Vec<Orphan>);

impl OrphanSet {
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|o| o.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Orphan> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|o| o.name == name)
    }
}

impl FromIterator<Orphan> for OrphanSet {
    fn from_iter<I: IntoIterator<Item = Orphan>>(iter: I) -> Self {
        let mut by_name = BTreeMap::new();
        for orphan in iter {
            by_name.entry(orphan.name.clone()).or_insert(orphan);
        }
        OrphanSet(by_name.into_values().collect())
    }
}

/// Reason a matching session cannot be the namespace's owner, if any.
fn disqualify(session: &ActiveSession, checker: &BackendIdentity) -> Option<OrphanReason> {
    if session.is_autovacuum() {
        return Some(OrphanReason::Autovacuum);
    }
    match session.database.as_deref() {
        None => return Some(OrphanReason::NoDatabase),
        Some(db) if db != checker.database => return Some(OrphanReason::OtherDatabase),
        Some(_) => {}
    }
    if session.pid == Some(checker.pid) {
        return Some(OrphanReason::SelfBackend);
    }
    None
}

/// Classify candidate names against the active sessions.
///
/// Names outside the reserved pattern are ignored even if nothing owns them.
pub fn classify<'a, I>(
    candidates: I,
    sessions: &[ActiveSession],
    checker: &BackendIdentity,
) -> OrphanSet
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_session: HashMap<i32, Vec<&ActiveSession>> = HashMap::new();
    for session in sessions {
        by_session.entry(session.session_id).or_default().push(session);
    }

    candidates
        .into_iter()
        .filter_map(TempNamespace::parse)
        .filter_map(|ns| {
            let matches = ns
                .session_id
                .and_then(|id| by_session.get(&id))
                .filter(|m| !m.is_empty());
            let reason = match matches {
                None => Some(OrphanReason::NoSession),
                Some(matches) => matches.iter().find_map(|s| disqualify(s, checker)),
            }?;
            Some(Orphan {
                name: ns.name,
                reason,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> BackendIdentity {
        BackendIdentity {
            pid: 1000,
            database: "sales".to_string(),
        }
    }

    #[test]
    fn test_unmatched_namespace_is_orphaned() {
        let orphans = classify(["pg_temp_42"], &[], &checker());
        assert_eq!(orphans.names(), vec!["pg_temp_42"]);
        assert_eq!(orphans.iter().next().unwrap().reason, OrphanReason::NoSession);
    }

    #[test]
    fn test_live_session_in_same_database_keeps_namespace() {
        let sessions = [ActiveSession::new(7, "sales", "client backend", 2000)];
        let orphans = classify(["pg_temp_7"], &sessions, &checker());
        assert!(orphans.is_empty());
    }

    #[test]
    fn test_autovacuum_session_does_not_own_namespace() {
        let sessions = [ActiveSession::new(99, "sales", "autovacuum worker", 2000)];
        let orphans = classify(["pg_toast_temp_99"], &sessions, &checker());
        assert_eq!(orphans.names(), vec!["pg_toast_temp_99"]);
        assert_eq!(orphans.iter().next().unwrap().reason, OrphanReason::Autovacuum);
    }

    #[test]
    fn test_session_without_database() {
        let sessions = [ActiveSession {
            database: None,
            ..ActiveSession::new(5, "", "background worker", 2000)
        }];
        let orphans = classify(["pg_temp_5"], &sessions, &checker());
        assert_eq!(orphans.iter().next().unwrap().reason, OrphanReason::NoDatabase);
    }

    #[test]
    fn test_session_in_other_database() {
        let sessions = [ActiveSession::new(5, "hr", "client backend", 2000)];
        let orphans = classify(["pg_temp_5"], &sessions, &checker());
        assert_eq!(
            orphans.iter().next().unwrap().reason,
            OrphanReason::OtherDatabase
        );
    }

    #[test]
    fn test_checking_backend_is_excluded() {
        let sessions = [ActiveSession::new(3, "sales", "client backend", 1000)];
        let orphans = classify(["pg_temp_3", "pg_toast_temp_3"], &sessions, &checker());
        assert_eq!(orphans.names(), vec!["pg_temp_3", "pg_toast_temp_3"]);
        assert!(orphans.iter().all(|o| o.reason == OrphanReason::SelfBackend));
    }

    #[test]
    fn test_any_disqualified_match_orphans_namespace() {
        let sessions = [
            ActiveSession::new(8, "sales", "client backend", 2000),
            ActiveSession::new(8, "hr", "client backend", 3000),
        ];
        let orphans = classify(["pg_temp_8"], &sessions, &checker());
        assert_eq!(orphans.names(), vec!["pg_temp_8"]);
    }

    #[test]
    fn test_non_reserved_names_never_orphaned() {
        let orphans = classify(
            ["public", "pg_temp", "scratch_temp_1", "pg_toast"],
            &[],
            &checker(),
        );
        assert!(orphans.is_empty());
    }

    #[test]
    fn test_missing_backend_type_is_ordinary() {
        let sessions = [ActiveSession {
            backend_type: None,
            ..ActiveSession::new(11, "sales", "", 2000)
        }];
        assert!(classify(["pg_temp_11"], &sessions, &checker()).is_empty());
    }

    #[test]
    fn test_missing_pid_is_not_self() {
        let sessions = [ActiveSession {
            pid: None,
            ..ActiveSession::new(12, "sales", "client backend", 0)
        }];
        assert!(classify(["pg_temp_12"], &sessions, &checker()).is_empty());
    }

    #[test]
    fn test_duplicates_collapse_and_sort() {
        let orphans = classify(
            ["pg_temp_9", "pg_temp_10", "pg_temp_9", "pg_toast_temp_9"],
            &[],
            &checker(),
        );
        assert_eq!(
            orphans.names(),
            vec!["pg_temp_10", "pg_temp_9", "pg_toast_temp_9"]
        );
    }

    #[test]
    fn test_out_of_range_session_id_is_orphaned() {
        let sessions = [ActiveSession::new(i32::MAX, "sales", "client backend", 2000)];
        let orphans = classify(["pg_temp_99999999999"], &sessions, &checker());
        assert_eq!(orphans.len(), 1);
        assert!(orphans.contains("pg_temp_99999999999"));
    }
}
