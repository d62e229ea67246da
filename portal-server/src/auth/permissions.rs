//! Role Default Permissions
//!
//! 每个角色的默认权限表。
//!
//! ## 设计原则
//! - 启动时构建一次，运行期不可变
//! - 仅在成员记录没有有效覆盖 (override) 时使用
//! - admin 拥有全部模块的全部操作

use std::collections::HashMap;

use shared::models::{Action, Module, ModulePermission, PermissionSet, Role};

use Action::{Create, Delete, Edit, View};

/// Teacher defaults: classroom-facing modules
const TEACHER_DEFAULTS: &[(Module, &[Action])] = &[
    (Module::Dashboard, &[View]),
    (Module::Students, &[View, Create, Edit]),
    (Module::Programs, &[View]),
    (Module::Guardians, &[View, Edit]),
    (Module::Attendance, &[View, Create, Edit]),
    (Module::Documents, &[View, Create]),
    (Module::Reports, &[View]),
    (Module::Help, &[View]),
];

/// Staff defaults: front-office modules
const STAFF_DEFAULTS: &[(Module, &[Action])] = &[
    (Module::Dashboard, &[View]),
    (Module::Students, &[View]),
    (Module::Staff, &[View]),
    (Module::Programs, &[View, Create, Edit]),
    (Module::Guardians, &[View, Create, Edit]),
    (Module::Attendance, &[View, Create, Edit]),
    (Module::Billing, &[View, Create, Edit]),
    (Module::Documents, &[View, Create, Edit]),
    (Module::Reports, &[View]),
    (Module::Help, &[View]),
];

/// Parent defaults: parent portal, read only
const PARENT_DEFAULTS: &[(Module, &[Action])] = &[
    (Module::Dashboard, &[View]),
    (Module::Students, &[View]),
    (Module::Attendance, &[View]),
    (Module::Billing, &[View]),
    (Module::Documents, &[View]),
    (Module::Help, &[View]),
];

fn build(table: &[(Module, &[Action])]) -> PermissionSet {
    table
        .iter()
        .map(|(module, actions)| (*module, ModulePermission::of(actions)))
        .collect()
}

/// Immutable role → default permission table
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDefaults {
    table: HashMap<Role, PermissionSet>,
}

impl RoleDefaults {
    /// Built-in defaults of the portal
    pub fn standard() -> Self {
        let admin: PermissionSet = Module::ALL
            .into_iter()
            .map(|m| (m, ModulePermission::all()))
            .collect();

        let mut table = HashMap::with_capacity(Role::ALL.len());
        table.insert(Role::Admin, admin);
        table.insert(Role::Teacher, build(TEACHER_DEFAULTS));
        table.insert(Role::Staff, build(STAFF_DEFAULTS));
        table.insert(Role::Parent, build(PARENT_DEFAULTS));
        Self { table }
    }

    /// Custom table (tests, alternate deployments); roles left out resolve
    /// to an empty set
    pub fn from_table(table: HashMap<Role, PermissionSet>) -> Self {
        Self { table }
    }

    /// Default permission set of a role
    pub fn get(&self, role: Role) -> PermissionSet {
        self.table.get(&role).cloned().unwrap_or_default()
    }
}

impl Default for RoleDefaults {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::get_action;

    #[test]
    fn test_admin_has_everything() {
        let defaults = RoleDefaults::standard();
        let admin = defaults.get(Role::Admin);
        assert_eq!(admin.len(), Module::ALL.len());
        for module in Module::ALL {
            for action in Action::ALL {
                assert!(get_action(&admin, module.as_str(), action.as_str()));
            }
        }
    }

    #[test]
    fn test_parent_defaults() {
        let parent = RoleDefaults::standard().get(Role::Parent);
        assert!(get_action(&parent, "billing", "view"));
        assert!(!get_action(&parent, "billing", "create"));
        assert!(!get_action(&parent, "settings", "view"));
        assert!(parent.get("settings").is_none());
    }

    #[test]
    fn test_no_default_role_touches_settings_or_permissions() {
        let defaults = RoleDefaults::standard();
        for role in [Role::Teacher, Role::Staff, Role::Parent] {
            let set = defaults.get(role);
            assert!(set.get("settings").is_none(), "{role} has settings");
            assert!(set.get("permissions").is_none(), "{role} has permissions");
        }
    }

    #[test]
    fn test_from_table_missing_role_is_empty() {
        let defaults = RoleDefaults::from_table(HashMap::new());
        assert!(defaults.get(Role::Teacher).is_empty());
    }
}
