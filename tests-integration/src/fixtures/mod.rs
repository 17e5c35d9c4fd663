//! Test fixtures for integration testing
//!
//! Every scenario starts from a freshly initialised local cluster so leaked
//! namespaces from one test never show up in another.

mod cluster_context;

pub use cluster_context::ClusterTestContext;
