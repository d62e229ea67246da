//! Module Registry
//!
//! 前端导航使用的静态模块列表（有序）。

use shared::models::{Module, ModuleEntry};

/// Ordered, static list of navigable modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRegistry {
    entries: Vec<ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new(entries: Vec<ModuleEntry>) -> Self {
        Self { entries }
    }

    /// Portal navigation; dashboard and help are always visible
    pub fn standard() -> Self {
        Self::new(vec![
            ModuleEntry::new(Module::Dashboard, "Dashboard", "/dashboard").always_visible(),
            ModuleEntry::new(Module::Students, "Students", "/students"),
            ModuleEntry::new(Module::Staff, "Staff", "/staff"),
            ModuleEntry::new(Module::Programs, "Programs & Classes", "/programs"),
            ModuleEntry::new(Module::Guardians, "Guardians", "/guardians"),
            ModuleEntry::new(Module::Attendance, "Attendance", "/attendance"),
            ModuleEntry::new(Module::Billing, "Billing", "/billing"),
            ModuleEntry::new(Module::Documents, "Documents", "/documents"),
            ModuleEntry::new(Module::Reports, "Reports", "/reports"),
            ModuleEntry::new(Module::Settings, "Settings", "/settings"),
            ModuleEntry::new(Module::Permissions, "Permissions", "/permissions"),
            ModuleEntry::new(Module::Help, "Help", "/help").always_visible(),
        ])
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn get(&self, module: Module) -> Option<&ModuleEntry> {
        self.entries.iter().find(|e| e.module == module)
    }

    /// Entries for the given modules, in registry order
    pub fn select(&self, modules: &[Module]) -> Vec<ModuleEntry> {
        self.entries
            .iter()
            .filter(|e| modules.contains(&e.module))
            .cloned()
            .collect()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_covers_every_module_in_order() {
        let registry = ModuleRegistry::standard();
        let modules: Vec<Module> = registry.entries().iter().map(|e| e.module).collect();
        assert_eq!(modules, Module::ALL.to_vec());
    }

    #[test]
    fn test_always_visible_entries() {
        let registry = ModuleRegistry::standard();
        let always: Vec<Module> = registry
            .entries()
            .iter()
            .filter(|e| e.always_visible)
            .map(|e| e.module)
            .collect();
        assert_eq!(always, vec![Module::Dashboard, Module::Help]);
    }

    #[test]
    fn test_select_preserves_registry_order() {
        let registry = ModuleRegistry::standard();
        let selected = registry.select(&[Module::Help, Module::Billing, Module::Dashboard]);
        let modules: Vec<Module> = selected.iter().map(|e| e.module).collect();
        assert_eq!(modules, vec![Module::Dashboard, Module::Billing, Module::Help]);
    }
}
