//! HTTP API
//!
//! - `access`  - 当前用户的权限、导航
//! - `members` - 组织成员角色与权限覆盖
//! - `health`  - 公共健康检查

pub mod access;
pub mod health;
pub mod members;

use axum::Router;

use crate::core::ServerState;

/// Routes that need an authenticated caller
pub fn protected_router() -> Router<ServerState> {
    Router::new()
        .merge(access::router())
        .merge(members::router())
}

/// Routes open to everyone
pub fn public_router() -> Router<ServerState> {
    health::router()
}
