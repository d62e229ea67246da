//! Membership Store

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use shared::models::{Membership, MembershipUpsert, Role};
use shared::{AppError, AppResult};

/// Organization membership store
///
/// Reads are tolerant and never validate; `None` means confirmed absent.
/// Writes are last-write-wins on the whole record.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Membership of `principal_id` in `organization_id`
    async fn get(
        &self,
        organization_id: &str,
        principal_id: &str,
    ) -> AppResult<Option<Membership>>;

    /// Insert or replace, stamping `updated_at`
    async fn put(&self, membership: Membership) -> AppResult<Membership>;

    /// Remove a membership, returns whether it existed
    async fn remove(&self, organization_id: &str, principal_id: &str) -> AppResult<bool>;

    /// All memberships of an organization, ordered by principal id
    async fn list(&self, organization_id: &str) -> AppResult<Vec<Membership>>;
}

/// Validate an upsert payload
///
/// Role must be one of the known roles and override keys must be known
/// modules.
pub fn validate_upsert(payload: &MembershipUpsert) -> AppResult<Role> {
    let role = Role::parse_input(&payload.role).ok_or_else(|| AppError::unknown_role(&payload.role))?;
    if let Some(permissions) = &payload.permissions
        && let Some(unknown) = permissions.unknown_modules().into_iter().next()
    {
        return Err(AppError::unknown_module(unknown));
    }
    Ok(role)
}

type MembershipKey = (String, String);

/// DashMap-backed store keyed by (organization, principal)
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    memberships: DashMap<MembershipKey, Membership>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    fn key(organization_id: &str, principal_id: &str) -> MembershipKey {
        (organization_id.to_string(), principal_id.to_string())
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn get(
        &self,
        organization_id: &str,
        principal_id: &str,
    ) -> AppResult<Option<Membership>> {
        Ok(self
            .memberships
            .get(&Self::key(organization_id, principal_id))
            .map(|m| m.value().clone()))
    }

    async fn put(&self, mut membership: Membership) -> AppResult<Membership> {
        membership.updated_at = Utc::now().timestamp_millis();
        let key = Self::key(&membership.organization_id, &membership.principal_id);
        self.memberships.insert(key, membership.clone());

        tracing::debug!(
            organization_id = %membership.organization_id,
            principal_id = %membership.principal_id,
            role = %membership.role,
            has_override = membership.permissions.is_some(),
            "Membership stored"
        );
        Ok(membership)
    }

    async fn remove(&self, organization_id: &str, principal_id: &str) -> AppResult<bool> {
        Ok(self
            .memberships
            .remove(&Self::key(organization_id, principal_id))
            .is_some())
    }

    async fn list(&self, organization_id: &str) -> AppResult<Vec<Membership>> {
        let mut members: Vec<Membership> = self
            .memberships
            .iter()
            .filter(|entry| entry.key().0 == organization_id)
            .map(|entry| entry.value().clone())
            .collect();
        members.sort_by(|a, b| a.principal_id.cmp(&b.principal_id));
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;
    use shared::models::{Module, ModulePermission, PermissionSet};

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = InMemoryMembershipStore::new();
        assert!(store.get("org-1", "u-1").await.unwrap().is_none());

        let stored = store
            .put(Membership::new("org-1", "u-1", Role::Teacher))
            .await
            .unwrap();
        assert!(stored.updated_at > 0);

        let loaded = store.get("org-1", "u-1").await.unwrap().unwrap();
        assert_eq!(loaded.role(), Some(Role::Teacher));
        assert!(store.get("org-2", "u-1").await.unwrap().is_none());

        assert!(store.remove("org-1", "u-1").await.unwrap());
        assert!(!store.remove("org-1", "u-1").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryMembershipStore::new();
        store
            .put(Membership::new("org-1", "u-1", Role::Teacher))
            .await
            .unwrap();
        store
            .put(Membership::new("org-1", "u-1", Role::Parent))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.get("org-1", "u-1").await.unwrap().unwrap();
        assert_eq!(loaded.role(), Some(Role::Parent));
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_ordered() {
        let store = InMemoryMembershipStore::new();
        for (org, id) in [("org-1", "u-3"), ("org-1", "u-1"), ("org-2", "u-2")] {
            store
                .put(Membership::new(org, id, Role::Staff))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .list("org-1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.principal_id)
            .collect();
        assert_eq!(ids, vec!["u-1".to_string(), "u-3".to_string()]);
    }

    #[test]
    fn test_validate_upsert() {
        let ok = MembershipUpsert {
            role: "Teacher".to_string(),
            permissions: Some(
                PermissionSet::new().with(Module::Students, ModulePermission::read_only()),
            ),
        };
        assert_eq!(validate_upsert(&ok).unwrap(), Role::Teacher);

        let bad_role = MembershipUpsert {
            role: "owner".to_string(),
            permissions: None,
        };
        assert_eq!(
            validate_upsert(&bad_role).unwrap_err().code,
            ErrorCode::UnknownRole
        );

        let bad_module: MembershipUpsert = serde_json::from_str(
            r#"{"role":"staff","permissions":{"payroll":{"view":true}}}"#,
        )
        .unwrap();
        assert_eq!(
            validate_upsert(&bad_module).unwrap_err().code,
            ErrorCode::UnknownModule
        );
    }
}
