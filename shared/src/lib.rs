//! Shared types for printflow
//!
//! Print data model passed by value between the resolver, the surface
//! provisioner, the operation controller and external collaborators
//! (dialogs, renderers, viewers).

pub mod models;

// Re-exports
pub use models::*;
pub use serde::{Deserialize, Serialize};
