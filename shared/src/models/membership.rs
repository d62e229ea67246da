//! Organization Membership Model

use serde::{Deserialize, Serialize};

use super::permission::PermissionSet;
use super::role::Role;

/// Membership record of a principal in one organization
///
/// `role` is kept exactly as stored so that values outside the known role
/// set can be detected instead of silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub organization_id: String,
    pub principal_id: String,
    pub role: String,
    /// Per-member override; replaces (never merges with) the role defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
    /// Last write timestamp (millis)
    #[serde(default)]
    pub updated_at: i64,
}

impl Membership {
    pub fn new(
        organization_id: impl Into<String>,
        principal_id: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            principal_id: principal_id.into(),
            role: role.as_str().to_string(),
            permissions: None,
            updated_at: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Parsed role, `None` when the stored value is not a known role
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Override that actually carries grants
    ///
    /// An empty map counts as "no override".
    pub fn effective_override(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref().filter(|p| !p.is_empty())
    }
}

/// Upsert membership payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipUpsert {
    pub role: String,
    #[serde(default)]
    pub permissions: Option<PermissionSet>,
}
