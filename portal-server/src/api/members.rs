//! Organization Membership API
//!
//! 成员角色与权限覆盖的管理接口。写入遵循 "权限天花板"：
//! - 成员写入后的有效权限（非空覆盖，否则新角色默认值）必须是操作者自身权限的子集
//! - 只有 admin 可以授予 admin 角色
//! - 只有 admin 可以修改、清除或删除已有的 admin 成员

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::{delete, get, put},
};
use shared::models::{Action, Membership, MembershipUpsert, Module, PermissionSet, Role};
use shared::{AppError, AppResult, ErrorCode};

use crate::auth::{AccessSource, CurrentAccess, require_permission};
use crate::core::ServerState;
use crate::store::validate_upsert;

pub fn router() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/api/organizations/{org}/members", get(list))
        .route("/api/organizations/{org}/members/{principal}", get(get_member))
        .route_layer(middleware::from_fn(require_permission(
            Module::Permissions,
            Action::View,
        )));

    let write_routes = Router::new()
        .route("/api/organizations/{org}/members/{principal}", put(upsert))
        .route(
            "/api/organizations/{org}/members/{principal}/permissions",
            delete(clear_override),
        )
        .route_layer(middleware::from_fn(require_permission(
            Module::Permissions,
            Action::Edit,
        )));

    let delete_routes = Router::new()
        .route(
            "/api/organizations/{org}/members/{principal}",
            delete(remove),
        )
        .route_layer(middleware::from_fn(require_permission(
            Module::Permissions,
            Action::Delete,
        )));

    read_routes.merge(write_routes).merge(delete_routes)
}

/// Caller's permissions were resolved against its selected organization;
/// they only apply to that organization. Allowlisted admins are global.
fn ensure_same_organization(current: &CurrentAccess, org: &str) -> AppResult<()> {
    if current.access.source == AccessSource::AdminAllowlist
        || current.organization_id.as_deref() == Some(org)
    {
        return Ok(());
    }
    Err(
        AppError::permission_denied("Permissions were resolved for another organization")
            .with_detail("organization_id", org),
    )
}

/// 权限天花板校验
///
/// `effective` is what the member ends up with after the write.
fn validate_permission_ceiling(
    current: &CurrentAccess,
    role: Role,
    effective: &PermissionSet,
) -> AppResult<()> {
    if current.access.is_admin() {
        return Ok(());
    }
    if role == Role::Admin {
        return Err(AppError::admin_required());
    }
    for (module, grants) in effective.iter() {
        for action in grants.granted() {
            if !current.has_permission(module, action.as_str()) {
                return Err(AppError::permission_denied(format!(
                    "Cannot grant '{}:{}': you do not have it yourself",
                    module, action
                ))
                .with_detail("module", module)
                .with_detail("action", action.as_str()));
            }
        }
    }
    Ok(())
}

/// Effective grants of a membership: non-empty override, else role defaults
fn effective_grants(state: &ServerState, membership: &Membership) -> PermissionSet {
    match (membership.effective_override(), membership.role()) {
        (Some(permissions), _) => permissions.clone(),
        (None, Some(role)) => state.resolver.role_defaults(role),
        (None, None) => PermissionSet::new(),
    }
}

/// Existing admin memberships are only writable by admins
fn ensure_can_modify(current: &CurrentAccess, existing: Option<&Membership>) -> AppResult<()> {
    if current.access.is_admin() {
        return Ok(());
    }
    if existing.and_then(|m| m.role()) == Some(Role::Admin) {
        return Err(AppError::admin_required());
    }
    Ok(())
}

/// GET /api/organizations/{org}/members
async fn list(
    State(state): State<ServerState>,
    current: CurrentAccess,
    Path(org): Path<String>,
) -> AppResult<Json<Vec<Membership>>> {
    ensure_same_organization(&current, &org)?;
    Ok(Json(state.memberships.list(&org).await?))
}

/// GET /api/organizations/{org}/members/{principal}
async fn get_member(
    State(state): State<ServerState>,
    current: CurrentAccess,
    Path((org, principal)): Path<(String, String)>,
) -> AppResult<Json<Membership>> {
    ensure_same_organization(&current, &org)?;
    state
        .memberships
        .get(&org, &principal)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::new(ErrorCode::MembershipNotFound))
}

/// PUT /api/organizations/{org}/members/{principal}
async fn upsert(
    State(state): State<ServerState>,
    current: CurrentAccess,
    Path((org, principal)): Path<(String, String)>,
    Json(payload): Json<MembershipUpsert>,
) -> AppResult<Json<Membership>> {
    ensure_same_organization(&current, &org)?;
    let role = validate_upsert(&payload)?;

    let existing = state.memberships.get(&org, &principal).await?;
    ensure_can_modify(&current, existing.as_ref())?;

    let mut membership = Membership::new(org, principal, role);
    membership.permissions = payload.permissions;
    validate_permission_ceiling(&current, role, &effective_grants(&state, &membership))?;

    tracing::info!(
        operator_id = %current.principal.id,
        organization_id = %membership.organization_id,
        principal_id = %membership.principal_id,
        role = %role,
        has_override = membership.permissions.is_some(),
        "Updating membership"
    );

    Ok(Json(state.memberships.put(membership).await?))
}

/// DELETE /api/organizations/{org}/members/{principal}/permissions
///
/// Drops the override; the member falls back to role defaults.
async fn clear_override(
    State(state): State<ServerState>,
    current: CurrentAccess,
    Path((org, principal)): Path<(String, String)>,
) -> AppResult<Json<Membership>> {
    ensure_same_organization(&current, &org)?;
    let mut membership = state
        .memberships
        .get(&org, &principal)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MembershipNotFound))?;
    ensure_can_modify(&current, Some(&membership))?;

    // member falls back to role defaults, which must be within the ceiling too
    membership.permissions = None;
    if let Some(role) = membership.role() {
        validate_permission_ceiling(&current, role, &effective_grants(&state, &membership))?;
    }

    tracing::info!(
        operator_id = %current.principal.id,
        organization_id = %org,
        principal_id = %principal,
        "Clearing membership override"
    );

    Ok(Json(state.memberships.put(membership).await?))
}

/// DELETE /api/organizations/{org}/members/{principal}
async fn remove(
    State(state): State<ServerState>,
    current: CurrentAccess,
    Path((org, principal)): Path<(String, String)>,
) -> AppResult<Json<bool>> {
    ensure_same_organization(&current, &org)?;
    if principal == current.principal.id {
        return Err(AppError::validation("Cannot remove your own membership"));
    }
    let existing = state.memberships.get(&org, &principal).await?;
    ensure_can_modify(&current, existing.as_ref())?;

    tracing::info!(
        operator_id = %current.principal.id,
        organization_id = %org,
        principal_id = %principal,
        "Removing membership"
    );

    Ok(Json(state.memberships.remove(&org, &principal).await?))
}
