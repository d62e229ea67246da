//! 服务器状态

use std::sync::Arc;

use shared::models::Principal;

use super::Config;
use crate::auth::{AccessPolicy, CurrentAccess, JwtService, PermissionResolver};
use crate::registry::ModuleRegistry;
use crate::store::{InMemoryMembershipStore, MembershipStore};

/// 服务器状态 - 所有处理器共享
///
/// 所有字段均为 `Arc` 或可廉价克隆，`Clone` 只增加引用计数。
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub jwt: Arc<JwtService>,
    pub resolver: PermissionResolver,
    pub registry: Arc<ModuleRegistry>,
    pub memberships: Arc<dyn MembershipStore>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("jwt", &self.jwt)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    pub fn new(config: Config, memberships: Arc<dyn MembershipStore>) -> Self {
        let policy = Arc::new(AccessPolicy::from_config(&config));
        let jwt = Arc::new(JwtService::with_config(config.jwt.clone()));
        Self {
            config: Arc::new(config),
            jwt,
            resolver: PermissionResolver::new(policy),
            registry: Arc::new(ModuleRegistry::standard()),
            memberships,
        }
    }

    /// 使用内存成员存储初始化
    pub fn initialize(config: Config) -> Self {
        Self::new(config, Arc::new(InMemoryMembershipStore::new()))
    }

    /// 查询成员记录并解析权限
    ///
    /// 存储读取失败按无成员记录处理。
    pub async fn resolve_access(
        &self,
        principal: Principal,
        organization_id: Option<String>,
    ) -> CurrentAccess {
        let membership = match &organization_id {
            Some(org) => match self.memberships.get(org, &principal.id).await {
                Ok(membership) => membership,
                Err(e) => {
                    tracing::warn!(
                        organization_id = %org,
                        principal_id = %principal.id,
                        error = %e,
                        "Failed to load membership, resolving as none"
                    );
                    None
                }
            },
            None => None,
        };

        let access = self
            .resolver
            .resolve(Some(&principal), membership.as_ref());

        CurrentAccess {
            principal,
            organization_id,
            access,
        }
    }
}
