//! Role Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Organization role (RBAC 角色)
///
/// Closed set: exactly one role is active per (principal, organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Staff,
    Parent,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Teacher, Role::Staff, Role::Parent];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Staff => "staff",
            Role::Parent => "parent",
        }
    }

    /// Parse a stored role string
    ///
    /// Exact match on the wire name; anything else (including case or
    /// whitespace variants) is `None` so it resolves as an unknown role.
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == value)
    }

    /// Parse user input (request payloads, path segments)
    ///
    /// Case-insensitive, surrounding whitespace ignored. Only for input that
    /// is normalized through [`as_str`](Self::as_str) before it is stored.
    pub fn parse_input(value: &str) -> Option<Role> {
        let value = value.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(value))
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_parse_stored_role_is_exact() {
        assert_eq!(Role::parse("ADMIN "), None);
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse(" staff"), None);
    }

    #[test]
    fn test_parse_input_is_lenient() {
        assert_eq!(Role::parse_input("Teacher"), Some(Role::Teacher));
        assert_eq!(Role::parse_input(" staff "), Some(Role::Staff));
        assert_eq!(Role::parse_input("PARENT"), Some(Role::Parent));
        assert_eq!(Role::parse_input("owner"), None);
    }

    #[test]
    fn test_parse_unknown_role() {
        assert_eq!(Role::parse("owner"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("admins"), None);
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Teacher).unwrap();
        assert_eq!(json, "\"teacher\"");
        let role: Role = serde_json::from_str("\"parent\"").unwrap();
        assert_eq!(role, Role::Parent);
    }
}
