//! Temporary namespace names and their embedded session ids.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// Reserved naming pattern for per-session temp and toast-temp namespaces.
///
/// Prefix match only, like the catalog query: `pg_temp_12abc` qualifies.
pub const TEMP_NAMESPACE_PATTERN: &str = r"^pg_t(emp|oast_temp)_\d+";

// ASCII `\d`, so every name the pattern accepts yields its digits to `session_id_of`.
static TEMP_NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(TEMP_NAMESPACE_PATTERN)
        .unicode(false)
        .build()
        .expect("temp namespace pattern is valid")
});

/// A namespace named after the session that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TempNamespace {
    pub name: String,
    /// `None` when the digits do not fit an int4, so no live session can own it.
    pub session_id: Option<i32>,
}

impl TempNamespace {
    /// Parse a namespace name, returning `None` unless it carries the reserved prefix.
    pub fn parse(name: &str) -> Option<Self> {
        if !is_temp_namespace(name) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            session_id: session_id_of(name),
        })
    }
}

pub fn is_temp_namespace(name: &str) -> bool {
    TEMP_NAMESPACE_RE.is_match(name)
}

/// Every digit in the name, in order, read as one integer.
fn session_id_of(name: &str) -> Option<i32> {
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Quote an identifier for interpolation into DDL, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The statement that removes a namespace and everything in it.
pub fn drop_statement(name: &str) -> String {
    format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(name))
}
