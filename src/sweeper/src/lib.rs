//! Detection and removal of orphaned temporary schemas.
//!
//! Sessions that crash or disconnect without cleanup leave their
//! `pg_temp_N` / `pg_toast_temp_N` namespaces behind on the coordinator and
//! on segments. [`find_orphans`] identifies them and [`drop_orphans`]
//! removes them, both over a single [`SessionCatalog`] backend.

pub mod catalog;
pub mod dropper;
pub mod error;
pub mod namespace;
pub mod orphan;
pub mod postgres;
pub mod repair;
pub mod session;
pub mod sweep;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use catalog::{SessionCatalog, find_orphans, find_orphans_as};
pub use dropper::drop_orphans;
pub use error::{SweepError, SweepResult};
pub use orphan::{Orphan, OrphanReason, OrphanSet};
pub use postgres::PgSessionCatalog;
pub use session::{ActiveSession, BackendIdentity};
pub use sweep::{DatabaseReport, SweepMode, Sweeper};
