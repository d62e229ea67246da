//! Shared types for the preschool portal
//!
//! Domain types for the access model (roles, modules, permission sets,
//! memberships) and the unified error system used by every crate.

pub mod error;
pub mod models;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    AccessDenied, Action, Membership, MembershipUpsert, Module, ModuleEntry, ModulePermission,
    PermissionSet, Principal, Role, get_action,
};
