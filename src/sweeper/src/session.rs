use serde::Serialize;

/// A live backend as reported by the activity view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub session_id: i32,
    pub database: Option<String>,
    pub backend_type: Option<String>,
    pub pid: Option<i32>,
}

impl ActiveSession {
    pub fn new(session_id: i32, database: &str, backend_type: &str, pid: i32) -> Self {
        Self {
            session_id,
            database: Some(database.to_string()),
            backend_type: Some(backend_type.to_string()),
            pid: Some(pid),
        }
    }

    /// Autovacuum launcher and workers never own temp namespaces.
    pub fn is_autovacuum(&self) -> bool {
        self.backend_type
            .as_deref()
            .is_some_and(|kind| kind.starts_with("autovacuum"))
    }
}

/// The backend running the check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendIdentity {
    pub pid: i32,
    pub database: String,
}
