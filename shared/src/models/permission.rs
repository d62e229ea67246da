//! Permission Model
//!
//! ## 默认拒绝 (default-deny)
//! - 模块不在权限表中 → 该模块所有操作均拒绝
//! - 操作未设置 → 拒绝
//! - 所有缺省路径统一经过 [`get_action`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::module::{Action, Module};

/// Per-module grants, absent actions deserialize to `false`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModulePermission {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
}

impl ModulePermission {
    pub const fn none() -> Self {
        Self {
            view: false,
            create: false,
            edit: false,
            delete: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            view: true,
            create: true,
            edit: true,
            delete: true,
        }
    }

    pub const fn read_only() -> Self {
        Self {
            view: true,
            create: false,
            edit: false,
            delete: false,
        }
    }

    /// Grant exactly the listed actions
    pub fn of(actions: &[Action]) -> Self {
        let mut perm = Self::none();
        for action in actions {
            perm.set(*action, true);
        }
        perm
    }

    pub const fn get(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
        }
    }

    pub fn set(&mut self, action: Action, granted: bool) {
        match action {
            Action::View => self.view = granted,
            Action::Create => self.create = granted,
            Action::Edit => self.edit = granted,
            Action::Delete => self.delete = granted,
        }
    }

    /// No action granted
    pub fn is_empty(&self) -> bool {
        !(self.view || self.create || self.edit || self.delete)
    }

    /// Granted actions in canonical order
    pub fn granted(&self) -> Vec<Action> {
        Action::ALL.into_iter().filter(|a| self.get(*a)).collect()
    }
}

/// Module name → grants
///
/// Keyed by module name rather than [`Module`] so stored override documents
/// with unknown keys still load; such keys are never matched by a known
/// module and are rejected only on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<String, ModulePermission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module, permission: ModulePermission) {
        self.0.insert(module.as_str().to_string(), permission);
    }

    /// Builder-style insert
    pub fn with(mut self, module: Module, permission: ModulePermission) -> Self {
        self.insert(module, permission);
        self
    }

    pub fn get(&self, module: &str) -> Option<&ModulePermission> {
        self.0.get(module)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Module names present in the map (including unknown ones)
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Keys that are not a known [`Module`]
    pub fn unknown_modules(&self) -> Vec<String> {
        self.0
            .keys()
            .filter(|k| Module::parse(k).is_none())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModulePermission)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(Module, ModulePermission)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (Module, ModulePermission)>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        for (module, perm) in iter {
            set.insert(module, perm);
        }
        set
    }
}

/// Total default-deny lookup
///
/// Module missing, action name unknown or grant false all evaluate to `false`.
pub fn get_action(permissions: &PermissionSet, module: &str, action: &str) -> bool {
    let Some(action) = Action::parse(action) else {
        return false;
    };
    permissions
        .get(module)
        .map(|perm| perm.get(action))
        .unwrap_or(false)
}

/// Payload of the "Access Denied" panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDenied {
    pub module: String,
    pub action: String,
    pub message: String,
}

impl AccessDenied {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        let module = module.into();
        let action = action.into();
        let message = format!(
            "You do not have permission to {} in {}",
            action, module
        );
        Self {
            module,
            action,
            message,
        }
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Access denied: {}:{}", self.module, self.action)
    }
}

impl std::error::Error for AccessDenied {}
