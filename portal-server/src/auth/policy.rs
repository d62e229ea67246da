//! Access Policy
//!
//! 注入式、不可变的访问策略：角色默认权限表 + 管理员邮箱白名单。

use std::collections::HashSet;

use super::permissions::RoleDefaults;
use crate::core::Config;

/// Default support address granted admin access
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@preschoolpro.com";

/// Default substring rule: any address containing `admin@`
pub const DEFAULT_ADMIN_PATTERN: &str = "admin@";

/// Admin email allowlist
///
/// Operational escape hatch: a match force-resolves the principal to admin
/// regardless of stored role or override. Matching is exact: an email in the
/// list, or an email containing one of the patterns, compared as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
    patterns: Vec<String>,
}

impl AdminAllowlist {
    /// Empty allowlist, matches nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<E, P>(emails: E, patterns: P) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { emails, patterns }
    }

    /// `admin@preschoolpro.com` plus the `admin@` substring rule
    pub fn standard() -> Self {
        Self::new([DEFAULT_ADMIN_EMAIL], [DEFAULT_ADMIN_PATTERN])
    }

    pub fn matches(&self, email: &str) -> bool {
        if email.is_empty() {
            return false;
        }
        self.emails.contains(email) || self.patterns.iter().any(|p| email.contains(p.as_str()))
    }

    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Immutable access configuration injected into the resolver
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub role_defaults: RoleDefaults,
    pub admin_allowlist: AdminAllowlist,
}

impl AccessPolicy {
    pub fn new(role_defaults: RoleDefaults, admin_allowlist: AdminAllowlist) -> Self {
        Self {
            role_defaults,
            admin_allowlist,
        }
    }

    /// Built-in defaults and the standard allowlist
    pub fn standard() -> Self {
        Self::new(RoleDefaults::standard(), AdminAllowlist::standard())
    }

    /// Standard role defaults with the allowlist from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RoleDefaults::standard(),
            AdminAllowlist::new(&config.admin_emails, &config.admin_email_patterns),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_allowlist() {
        let list = AdminAllowlist::standard();
        assert!(list.matches("admin@preschoolpro.com"));
        // substring rule
        assert!(list.matches("schooladmin@example.org"));
        assert!(list.matches("admin@example.org"));
        assert!(!list.matches("teacher@preschoolpro.com"));
        assert!(!list.matches("administrator@example.org"));
        assert!(!list.matches(""));
    }

    #[test]
    fn test_allowlist_does_not_fold_case_or_trim() {
        let list = AdminAllowlist::standard();
        assert!(!list.matches("Admin@PreschoolPro.com"));
        assert!(!list.matches("School.ADMIN@x.org"));
        assert!(!list.matches(" admin@preschoolpro.com"));
        // still caught by the substring rule
        assert!(list.matches("school.admin@x.org"));
    }

    #[test]
    fn test_custom_allowlist_without_pattern() {
        let list = AdminAllowlist::new(["ops@example.org"], Vec::<String>::new());
        assert!(list.matches("ops@example.org"));
        assert!(!list.matches("admin@example.org"));
    }

    #[test]
    fn test_empty_allowlist_matches_nothing() {
        let list = AdminAllowlist::empty();
        assert!(!list.matches("admin@preschoolpro.com"));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let list = AdminAllowlist::new(["", "  "], [""]);
        assert_eq!(list.emails().count(), 0);
        assert!(list.patterns().is_empty());
        assert!(!list.matches("anyone@example.org"));
    }
}
