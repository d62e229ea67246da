//! Access Session
//!
//! 前端会话侧的权限状态：持有当前主体与成员记录，变更时整体重算
//! [`ResolvedAccess`] 并通知订阅者。
//!
//! # 状态
//!
//! ```text
//! principal:  Loading ──▶ Ready(Some | None)
//! membership: Loading ──▶ Ready(Some | None) | Failed(msg)
//! ```
//!
//! 任一槽位处于 Loading 时 `loading() == true`，所有权限查询返回 false。
//!
//! # 过期加载
//!
//! 每次重置成员槽位都会递增 generation。[`LoadTicket`] 记录发起时的
//! generation，完成时不匹配则丢弃结果（后发起者获胜）。
//!
//! # 通知顺序
//!
//! 监听器在锁外调用。多个线程并发更新时，快照可能乱序到达；
//! 监听器应忽略 `generation` 小于已见值的快照。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use shared::models::{Action, Membership, Module, PermissionSet, Principal, Role};
use shared::AppError;

use super::resolver::{AccessSource, PermissionResolver, ResolvedAccess};
use crate::registry::ModuleRegistry;
use crate::store::MembershipStore;

type Listener = Arc<dyn Fn(&AccessSnapshot) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
enum PrincipalSlot {
    Loading,
    Ready(Option<Principal>),
}

#[derive(Debug, Clone, PartialEq)]
enum MembershipSlot {
    Loading,
    Ready(Option<Membership>),
    Failed(String),
}

#[derive(Debug)]
struct SessionState {
    principal: PrincipalSlot,
    membership: MembershipSlot,
    resolved: Arc<ResolvedAccess>,
    generation: u64,
}

impl SessionState {
    fn loading(&self) -> bool {
        matches!(self.principal, PrincipalSlot::Loading)
            || matches!(self.membership, MembershipSlot::Loading)
    }
}

/// Handle returned by [`AccessSession::begin_membership_load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// Point-in-time view handed to listeners and the UI
///
/// Listeners run outside the state lock, so with concurrent updaters two
/// snapshots can arrive out of order. `generation` strictly increases with each
/// recomputation; a snapshot older than one already seen is superseded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessSnapshot {
    pub generation: u64,
    pub loading: bool,
    pub role: Option<Role>,
    pub source: AccessSource,
    pub permissions: PermissionSet,
    pub visible_modules: Vec<Module>,
    /// Surfaced membership load failure ("couldn't load your access level")
    pub error: Option<String>,
}

struct SessionInner {
    resolver: PermissionResolver,
    registry: Arc<ModuleRegistry>,
    state: RwLock<SessionState>,
    listeners: DashMap<u64, Listener>,
    next_listener_id: AtomicU64,
}

/// Reactive access state of one signed-in client
#[derive(Clone)]
pub struct AccessSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for AccessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessSession")
            .field("state", &*self.inner.state.read())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl AccessSession {
    pub fn new(resolver: PermissionResolver, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                resolver,
                registry,
                state: RwLock::new(SessionState {
                    principal: PrincipalSlot::Loading,
                    membership: MembershipSlot::Loading,
                    resolved: Arc::new(ResolvedAccess::default()),
                    generation: 0,
                }),
                listeners: DashMap::new(),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    // ========== Queries ==========

    /// Principal or membership not yet known
    pub fn loading(&self) -> bool {
        self.inner.state.read().loading()
    }

    /// Effective role, `None` while loading
    pub fn role(&self) -> Option<Role> {
        let state = self.inner.state.read();
        if state.loading() {
            return None;
        }
        state.resolved.role
    }

    pub fn principal(&self) -> Option<Principal> {
        match &self.inner.state.read().principal {
            PrincipalSlot::Ready(p) => p.clone(),
            PrincipalSlot::Loading => None,
        }
    }

    /// Membership load failure, if any
    pub fn error(&self) -> Option<String> {
        match &self.inner.state.read().membership {
            MembershipSlot::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// Current resolved state (fully denied while loading)
    pub fn resolved(&self) -> Arc<ResolvedAccess> {
        self.inner.state.read().resolved.clone()
    }

    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        self.resolved().has_permission(module, action)
    }

    pub fn can(&self, module: Module, action: Action) -> bool {
        self.resolved().can(module, action)
    }

    pub fn visible_modules(&self) -> Vec<Module> {
        self.resolved().visible_modules(&self.inner.registry)
    }

    pub fn snapshot(&self) -> AccessSnapshot {
        let state = self.inner.state.read();
        self.build_snapshot(&state)
    }

    // ========== Updates ==========

    /// Auth provider emitted a principal change (sign-in / sign-out)
    ///
    /// A new principal invalidates the membership: it goes back to loading
    /// and in-flight loads become stale. Re-emitting the current principal is
    /// a no-op.
    pub fn set_principal(&self, principal: Option<Principal>) {
        self.update(|state| {
            if state.principal == PrincipalSlot::Ready(principal.clone()) {
                return false;
            }
            state.membership = if principal.is_some() {
                MembershipSlot::Loading
            } else {
                MembershipSlot::Ready(None)
            };
            state.principal = PrincipalSlot::Ready(principal);
            state.generation += 1;
            true
        });
    }

    /// Start loading a membership (sign-in, organization switch)
    pub fn begin_membership_load(&self) -> LoadTicket {
        let mut ticket = LoadTicket { generation: 0 };
        self.update(|state| {
            state.generation += 1;
            state.membership = MembershipSlot::Loading;
            ticket.generation = state.generation;
            true
        });
        ticket
    }

    /// Finish a load started with [`begin_membership_load`](Self::begin_membership_load)
    ///
    /// Returns `false` when the ticket is stale and the result was dropped.
    /// A failed fetch resolves to "no membership" with the error surfaced.
    pub fn complete_membership_load(
        &self,
        ticket: LoadTicket,
        result: Result<Option<Membership>, AppError>,
    ) -> bool {
        let mut applied = false;
        self.update(|state| {
            if state.generation != ticket.generation {
                tracing::debug!(
                    ticket = ticket.generation,
                    current = state.generation,
                    "Discarding stale membership load"
                );
                return false;
            }
            state.membership = match result {
                Ok(membership) => MembershipSlot::Ready(membership),
                Err(e) => {
                    tracing::warn!(error = %e, "Membership load failed");
                    MembershipSlot::Failed(e.message)
                }
            };
            state.generation += 1;
            applied = true;
            true
        });
        applied
    }

    /// Live push from the membership store; supersedes in-flight loads
    pub fn apply_membership(&self, membership: Option<Membership>) {
        self.update(|state| {
            state.generation += 1;
            state.membership = MembershipSlot::Ready(membership);
            true
        });
    }

    /// Fetch the current principal's membership from a store
    ///
    /// The principal is read under the same lock that issues the ticket, so
    /// a sign-in change mid-fetch makes the result stale.
    /// Returns `false` when there is no principal or a newer update won.
    pub async fn load_membership(
        &self,
        store: &dyn MembershipStore,
        organization_id: &str,
    ) -> bool {
        let mut request = None;
        self.update(|state| {
            let PrincipalSlot::Ready(Some(principal)) = &state.principal else {
                return false;
            };
            let principal_id = principal.id.clone();
            state.generation += 1;
            state.membership = MembershipSlot::Loading;
            request = Some((
                LoadTicket {
                    generation: state.generation,
                },
                principal_id,
            ));
            true
        });
        let Some((ticket, principal_id)) = request else {
            return false;
        };
        let result = store.get(organization_id, &principal_id).await;
        self.complete_membership_load(ticket, result)
    }

    // ========== Subscription ==========

    /// Register a listener fired once per recomputation
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AccessSnapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            session: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ========== Internal ==========

    /// Apply a mutation; when it reports a change, recompute and notify
    fn update(&self, mutate: impl FnOnce(&mut SessionState) -> bool) {
        let snapshot = {
            let mut state = self.inner.state.write();
            if !mutate(&mut *state) {
                return;
            }
            state.resolved = Arc::new(self.recompute(&state));
            self.build_snapshot(&state)
        };

        // 在锁外通知，监听器可以回调会话
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn recompute(&self, state: &SessionState) -> ResolvedAccess {
        if state.loading() {
            return ResolvedAccess::default();
        }
        let principal = match &state.principal {
            PrincipalSlot::Ready(p) => p.as_ref(),
            PrincipalSlot::Loading => None,
        };
        let membership = match &state.membership {
            MembershipSlot::Ready(m) => m.as_ref(),
            _ => None,
        };
        self.inner.resolver.resolve(principal, membership)
    }

    fn build_snapshot(&self, state: &SessionState) -> AccessSnapshot {
        let loading = state.loading();
        let resolved = &state.resolved;
        AccessSnapshot {
            generation: state.generation,
            loading,
            role: if loading { None } else { resolved.role },
            source: resolved.source,
            permissions: (*resolved.permissions).clone(),
            visible_modules: resolved.visible_modules(&self.inner.registry),
            error: match &state.membership {
                MembershipSlot::Failed(msg) => Some(msg.clone()),
                _ => None,
            },
        }
    }
}

/// Listener registration; dropping it unsubscribes
pub struct Subscription {
    id: u64,
    session: Weak<SessionInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.session.upgrade() {
            inner.listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMembershipStore;
    use async_trait::async_trait;
    use shared::AppResult;
    use shared::models::ModulePermission;
    use std::sync::Mutex;

    fn session() -> AccessSession {
        AccessSession::new(
            PermissionResolver::default(),
            Arc::new(ModuleRegistry::standard()),
        )
    }

    fn teacher() -> Principal {
        Principal::new("u-1", "teacher@example.org")
    }

    fn membership(role: Role) -> Membership {
        Membership::new("org-1", "u-1", role)
    }

    #[test]
    fn test_initially_loading_and_denied() {
        let session = session();
        assert!(session.loading());
        assert_eq!(session.role(), None);
        assert!(!session.has_permission("dashboard", "view"));
        // always-visible entries still render during loading
        assert_eq!(session.visible_modules(), vec![Module::Dashboard, Module::Help]);
    }

    #[test]
    fn test_principal_then_membership_resolves() {
        let session = session();
        session.set_principal(Some(teacher()));
        assert!(session.loading());
        assert!(!session.has_permission("students", "view"));

        let ticket = session.begin_membership_load();
        assert!(session.complete_membership_load(ticket, Ok(Some(membership(Role::Teacher)))));

        assert!(!session.loading());
        assert_eq!(session.role(), Some(Role::Teacher));
        assert!(session.has_permission("students", "edit"));
        assert!(!session.has_permission("billing", "view"));
    }

    #[test]
    fn test_allowlisted_admin_waits_for_loading() {
        let session = session();
        session.set_principal(Some(Principal::new("u-9", "admin@preschoolpro.com")));
        // membership slot still loading
        assert!(!session.has_permission("settings", "view"));

        session.apply_membership(None);
        assert_eq!(session.role(), Some(Role::Admin));
        assert!(session.has_permission("settings", "delete"));
    }

    #[test]
    fn test_sign_out_denies_without_loading() {
        let session = session();
        session.set_principal(Some(teacher()));
        session.apply_membership(Some(membership(Role::Teacher)));
        assert!(session.has_permission("students", "view"));

        session.set_principal(None);
        assert!(!session.loading());
        assert_eq!(session.role(), None);
        assert!(!session.has_permission("students", "view"));
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let session = session();
        session.set_principal(Some(teacher()));

        let older = session.begin_membership_load();
        let newer = session.begin_membership_load();

        assert!(session.complete_membership_load(newer, Ok(Some(membership(Role::Parent)))));
        assert!(!session.complete_membership_load(older, Ok(Some(membership(Role::Staff)))));

        assert_eq!(session.role(), Some(Role::Parent));
    }

    #[test]
    fn test_live_push_supersedes_in_flight_load() {
        let session = session();
        session.set_principal(Some(teacher()));
        let ticket = session.begin_membership_load();

        session.apply_membership(Some(membership(Role::Staff)));
        assert!(!session.complete_membership_load(ticket, Ok(Some(membership(Role::Parent)))));
        assert_eq!(session.role(), Some(Role::Staff));
    }

    #[test]
    fn test_failed_load_denies_and_surfaces_error() {
        let session = session();
        session.set_principal(Some(teacher()));
        let ticket = session.begin_membership_load();

        assert!(session.complete_membership_load(ticket, Err(AppError::store("connection reset"))));

        assert!(!session.loading());
        assert_eq!(session.role(), None);
        assert_eq!(session.error().as_deref(), Some("connection reset"));
        assert!(!session.has_permission("students", "view"));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("connection reset"));
        assert_eq!(snapshot.source, AccessSource::NoMembership);
    }

    #[test]
    fn test_listener_fires_once_per_recomputation() {
        let session = session();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = session.subscribe(move |snapshot| {
            sink.lock().unwrap().push((snapshot.loading, snapshot.role));
        });

        session.set_principal(Some(teacher()));
        session.apply_membership(Some(membership(Role::Teacher)));
        // same principal again: no recomputation
        session.set_principal(Some(teacher()));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(true, None), (false, Some(Role::Teacher))]
        );

        subscription.unsubscribe();
        assert_eq!(session.listener_count(), 0);

        session.apply_membership(Some(membership(Role::Parent)));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_dropping_subscription_detaches() {
        let session = session();
        {
            let _subscription = session.subscribe(|_| {});
            assert_eq!(session.listener_count(), 1);
        }
        assert_eq!(session.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_query_session() {
        let session = session();
        let observer = session.clone();
        let roles = Arc::new(Mutex::new(Vec::new()));
        let sink = roles.clone();
        let _subscription = session.subscribe(move |_| {
            sink.lock().unwrap().push(observer.role());
        });

        session.set_principal(Some(teacher()));
        session.apply_membership(Some(membership(Role::Staff)));

        assert_eq!(*roles.lock().unwrap(), vec![None, Some(Role::Staff)]);
    }

    #[test]
    fn test_snapshot_reflects_override() {
        let session = session();
        session.set_principal(Some(teacher()));
        session.apply_membership(Some(membership(Role::Teacher).with_permissions(
            PermissionSet::new().with(Module::Reports, ModulePermission::read_only()),
        )));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.source, AccessSource::Override);
        assert_eq!(
            snapshot.visible_modules,
            vec![Module::Dashboard, Module::Reports, Module::Help]
        );
    }

    #[tokio::test]
    async fn test_load_membership_from_store() {
        let store = InMemoryMembershipStore::new();
        store.put(membership(Role::Staff)).await.unwrap();

        let session = session();
        assert!(!session.load_membership(&store, "org-1").await);

        session.set_principal(Some(teacher()));
        assert!(session.load_membership(&store, "org-1").await);
        assert_eq!(session.role(), Some(Role::Staff));

        // organization switch to one without membership
        assert!(session.load_membership(&store, "org-2").await);
        assert_eq!(session.role(), None);
        assert!(session.error().is_none());
    }

    /// Store whose fetch signs a different user in before answering
    struct SwitchingStore {
        session: AccessSession,
        inner: InMemoryMembershipStore,
    }

    #[async_trait]
    impl MembershipStore for SwitchingStore {
        async fn get(
            &self,
            organization_id: &str,
            principal_id: &str,
        ) -> AppResult<Option<Membership>> {
            self.session
                .set_principal(Some(Principal::new("u-2", "other@example.org")));
            self.inner.get(organization_id, principal_id).await
        }

        async fn put(&self, membership: Membership) -> AppResult<Membership> {
            self.inner.put(membership).await
        }

        async fn remove(&self, organization_id: &str, principal_id: &str) -> AppResult<bool> {
            self.inner.remove(organization_id, principal_id).await
        }

        async fn list(&self, organization_id: &str) -> AppResult<Vec<Membership>> {
            self.inner.list(organization_id).await
        }
    }

    #[tokio::test]
    async fn test_principal_change_during_fetch_drops_result() {
        let session = session();
        session.set_principal(Some(teacher()));

        let store = SwitchingStore {
            session: session.clone(),
            inner: InMemoryMembershipStore::new(),
        };
        store.put(membership(Role::Admin)).await.unwrap();

        // u-1's admin membership must not be applied to u-2
        assert!(!session.load_membership(&store, "org-1").await);
        assert_eq!(session.principal().unwrap().id, "u-2");
        assert!(session.loading());
        assert_eq!(session.role(), None);
        assert!(!session.has_permission("settings", "view"));
    }

    #[test]
    fn test_snapshot_generation_increases() {
        let session = session();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = session.subscribe(move |snapshot| {
            sink.lock().unwrap().push(snapshot.generation);
        });

        session.set_principal(Some(teacher()));
        let ticket = session.begin_membership_load();
        session.complete_membership_load(ticket, Ok(Some(membership(Role::Teacher))));
        session.apply_membership(Some(membership(Role::Staff)));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(*seen.last().unwrap(), session.snapshot().generation);
    }
}
