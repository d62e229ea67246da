//! Domain models for the access layer

pub mod membership;
pub mod module;
pub mod permission;
pub mod principal;
pub mod role;

pub use membership::{Membership, MembershipUpsert};
pub use module::{Action, Module, ModuleEntry};
pub use permission::{AccessDenied, ModulePermission, PermissionSet, get_action};
pub use principal::Principal;
pub use role::Role;
