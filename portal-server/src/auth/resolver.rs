//! Permission Resolver
//!
//! 根据 (主体, 成员记录) 计算有效权限。
//!
//! # 解析顺序
//!
//! 1. 无主体 → 全部拒绝
//! 2. 邮箱命中管理员白名单 → admin（优先级最高，短路）
//! 3. 无成员记录 → 全部拒绝
//! 4. 未知角色 → 全部拒绝 + 数据一致性告警（绝不回退到 admin）
//! 5. 有效覆盖（非空）→ 覆盖表，完全替代角色默认值
//! 6. 否则 → 角色默认值
//!
//! 解析是纯函数：不抛错、无副作用（日志除外）、相同输入得到相同输出。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::models::{
    AccessDenied, Action, Membership, Module, PermissionSet, Principal, Role, get_action,
};

use super::policy::AccessPolicy;
use crate::registry::ModuleRegistry;
use crate::security_log;

/// Which rule produced a [`ResolvedAccess`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// No principal
    Anonymous,
    /// Email matched the admin allowlist
    AdminAllowlist,
    /// Principal without membership in the organization
    NoMembership,
    /// Stored role outside the known set
    UnknownRole,
    /// Per-member override replaced the role defaults
    Override,
    /// Role defaults
    RoleDefaults,
}

/// Effective role and permissions for one (principal, organization)
///
/// Immutable snapshot; recomputation produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccess {
    pub role: Option<Role>,
    pub permissions: Arc<PermissionSet>,
    pub source: AccessSource,
}

impl ResolvedAccess {
    /// Fully denied state
    pub fn denied(source: AccessSource) -> Self {
        Self {
            role: None,
            permissions: Arc::new(PermissionSet::new()),
            source,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Point query, total over arbitrary strings
    ///
    /// Admin bypasses the map entirely; everything else is a default-deny
    /// lookup.
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        get_action(&self.permissions, module, action)
    }

    /// Typed variant of [`has_permission`](Self::has_permission)
    pub fn can(&self, module: Module, action: Action) -> bool {
        self.has_permission(module.as_str(), action.as_str())
    }

    /// Guard check producing the Access Denied panel payload
    pub fn check(&self, module: Module, action: Action) -> Result<(), AccessDenied> {
        if self.can(module, action) {
            Ok(())
        } else {
            Err(AccessDenied::new(module.as_str(), action.as_str()))
        }
    }

    /// Modules to show in navigation, in registry order
    pub fn visible_modules(&self, registry: &ModuleRegistry) -> Vec<Module> {
        registry
            .entries()
            .iter()
            .filter(|entry| entry.always_visible || self.can(entry.module, Action::View))
            .map(|entry| entry.module)
            .collect()
    }
}

impl Default for ResolvedAccess {
    fn default() -> Self {
        Self::denied(AccessSource::Anonymous)
    }
}

/// Computes [`ResolvedAccess`] from an injected [`AccessPolicy`]
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    policy: Arc<AccessPolicy>,
}

impl PermissionResolver {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Default permissions of a role
    pub fn role_defaults(&self, role: Role) -> PermissionSet {
        self.policy.role_defaults.get(role)
    }

    pub fn resolve(
        &self,
        principal: Option<&Principal>,
        membership: Option<&Membership>,
    ) -> ResolvedAccess {
        let Some(principal) = principal else {
            return ResolvedAccess::denied(AccessSource::Anonymous);
        };

        if self.policy.admin_allowlist.matches(&principal.email) {
            security_log!(
                INFO,
                "admin_allowlist_grant",
                principal_id = %principal.id,
                email = %principal.email
            );
            return ResolvedAccess {
                role: Some(Role::Admin),
                permissions: Arc::new(self.policy.role_defaults.get(Role::Admin)),
                source: AccessSource::AdminAllowlist,
            };
        }

        let Some(membership) = membership else {
            return ResolvedAccess::denied(AccessSource::NoMembership);
        };

        let Some(role) = membership.role() else {
            tracing::warn!(
                principal_id = %principal.id,
                organization_id = %membership.organization_id,
                role = %membership.role,
                "Membership carries unknown role, denying all access"
            );
            return ResolvedAccess::denied(AccessSource::UnknownRole);
        };

        match membership.effective_override() {
            Some(permissions) => ResolvedAccess {
                role: Some(role),
                permissions: Arc::new(permissions.clone()),
                source: AccessSource::Override,
            },
            None => ResolvedAccess {
                role: Some(role),
                permissions: Arc::new(self.policy.role_defaults.get(role)),
                source: AccessSource::RoleDefaults,
            },
        }
    }
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new(Arc::new(AccessPolicy::standard()))
    }
}
