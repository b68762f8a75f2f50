//! Access control resolution engine.
//!
//! Computes grants, derived ownership and visibility over the access
//! control entries of a cluster. The engine never creates or deletes
//! resources other than the entries themselves; every other component
//! consults it before touching a resource name.

mod engine;

pub use engine::{AccessControlService, AclScope};
