//! Module / Action Model
//!
//! 功能模块与操作：权限控制的两个维度。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional area of the portal subject to independent permission control
///
/// Declaration order is the canonical navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Dashboard,
    Students,
    Staff,
    Programs,
    Guardians,
    Attendance,
    Billing,
    Documents,
    Reports,
    Settings,
    Permissions,
    Help,
}

impl Module {
    pub const ALL: [Module; 12] = [
        Module::Dashboard,
        Module::Students,
        Module::Staff,
        Module::Programs,
        Module::Guardians,
        Module::Attendance,
        Module::Billing,
        Module::Documents,
        Module::Reports,
        Module::Settings,
        Module::Permissions,
        Module::Help,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Students => "students",
            Module::Staff => "staff",
            Module::Programs => "programs",
            Module::Guardians => "guardians",
            Module::Attendance => "attendance",
            Module::Billing => "billing",
            Module::Documents => "documents",
            Module::Reports => "reports",
            Module::Settings => "settings",
            Module::Permissions => "permissions",
            Module::Help => "help",
        }
    }

    /// Exact module name lookup, `None` for unknown names
    pub fn parse(value: &str) -> Option<Module> {
        Module::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of permission granularity within a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == value)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub module: Module,
    /// Display label
    pub label: String,
    /// Front-end route
    pub path: String,
    /// Shown regardless of permission state (dashboard, help)
    #[serde(default)]
    pub always_visible: bool,
}

impl ModuleEntry {
    pub fn new(module: Module, label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            module,
            label: label.into(),
            path: path.into(),
            always_visible: false,
        }
    }

    pub fn always_visible(mut self) -> Self {
        self.always_visible = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_parse_roundtrip() {
        for module in Module::ALL {
            assert_eq!(Module::parse(module.as_str()), Some(module));
        }
        assert_eq!(Module::parse("payroll"), None);
        assert_eq!(Module::parse("Students"), None);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("view"), Some(Action::View));
        assert_eq!(Action::parse("delete"), Some(Action::Delete));
        assert_eq!(Action::parse("manage"), None);
    }

    #[test]
    fn test_module_entry_serde_default() {
        let entry: ModuleEntry =
            serde_json::from_str(r#"{"module":"billing","label":"Billing","path":"/billing"}"#)
                .unwrap();
        assert_eq!(entry.module, Module::Billing);
        assert!(!entry.always_visible);
    }
}
