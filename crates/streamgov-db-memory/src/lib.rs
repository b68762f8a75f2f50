//! In-memory declared-state store.
//!
//! Default backend for tests and single-node deployments. Lock-free
//! concurrent maps keyed `cluster/name` (access control entries:
//! `grantor/name`); a `create` is immediately visible to a subsequent
//! `find_by_name` in the same process.

mod store;

pub use store::InMemoryStore;
