//! 当前用户权限接口
//!
//! | 路径 | 方法 | 说明 | 权限 |
//! |------|------|------|------|
//! | /api/access | GET | 已解析的角色与权限表 | 登录 |
//! | /api/access/check | GET | 单点查询 (module, action) | 登录 |
//! | /api/navigation | GET | 可见导航项 | 登录 |
//! | /api/modules | GET | 完整模块注册表 | 登录 |
//! | /api/roles/{role}/defaults | GET | 角色默认权限 | permissions:view |
//! | /api/admin/allowlist | GET | 管理员白名单规则 (审计) | admin |

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::get,
};
use serde::{Deserialize, Serialize};
use shared::models::{Action, Module, ModuleEntry, PermissionSet, Role};
use shared::{AppError, AppResult};

use crate::auth::{AccessSource, CurrentAccess, require_admin, require_permission};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    let own = Router::new()
        .route("/api/access", get(get_access))
        .route("/api/access/check", get(check))
        .route("/api/navigation", get(navigation))
        .route("/api/modules", get(modules));

    let defaults = Router::new()
        .route("/api/roles/{role}/defaults", get(role_defaults))
        .route_layer(middleware::from_fn(require_permission(
            Module::Permissions,
            Action::View,
        )));

    let admin = Router::new()
        .route("/api/admin/allowlist", get(admin_allowlist))
        .route_layer(middleware::from_fn(require_admin));

    own.merge(defaults).merge(admin)
}

/// Resolved access of the caller
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessView {
    pub principal_id: String,
    pub email: String,
    pub organization_id: Option<String>,
    pub role: Option<Role>,
    pub source: AccessSource,
    pub permissions: PermissionSet,
    pub visible_modules: Vec<Module>,
}

/// GET /api/access
async fn get_access(State(state): State<ServerState>, current: CurrentAccess) -> Json<AccessView> {
    let visible_modules = current.access.visible_modules(&state.registry);
    Json(AccessView {
        principal_id: current.principal.id,
        email: current.principal.email,
        organization_id: current.organization_id,
        role: current.access.role,
        source: current.access.source,
        permissions: (*current.access.permissions).clone(),
        visible_modules,
    })
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub module: String,
    pub action: String,
    pub allowed: bool,
}

/// GET /api/access/check?module=&action=
///
/// Total: unknown module or action answers `false`.
async fn check(current: CurrentAccess, Query(query): Query<CheckQuery>) -> Json<CheckResponse> {
    let allowed = current.has_permission(&query.module, &query.action);
    Json(CheckResponse {
        module: query.module,
        action: query.action,
        allowed,
    })
}

/// GET /api/navigation
async fn navigation(
    State(state): State<ServerState>,
    current: CurrentAccess,
) -> Json<Vec<ModuleEntry>> {
    let visible = current.access.visible_modules(&state.registry);
    Json(state.registry.select(&visible))
}

/// GET /api/modules
async fn modules(State(state): State<ServerState>) -> Json<Vec<ModuleEntry>> {
    Json(state.registry.entries().to_vec())
}

/// GET /api/roles/{role}/defaults
async fn role_defaults(
    State(state): State<ServerState>,
    Path(role): Path<String>,
) -> AppResult<Json<PermissionSet>> {
    let role = Role::parse_input(&role).ok_or_else(|| AppError::unknown_role(role.clone()))?;
    Ok(Json(state.resolver.role_defaults(role)))
}

/// Active admin allowlist rules
#[derive(Debug, Serialize, Deserialize)]
pub struct AllowlistView {
    pub emails: Vec<String>,
    pub patterns: Vec<String>,
}

/// GET /api/admin/allowlist
async fn admin_allowlist(State(state): State<ServerState>) -> Json<AllowlistView> {
    let allowlist = &state.resolver.policy().admin_allowlist;
    let mut emails: Vec<String> = allowlist.emails().map(str::to_string).collect();
    emails.sort();
    Json(AllowlistView {
        emails,
        patterns: allowlist.patterns().to_vec(),
    })
}
