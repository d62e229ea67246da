//! Access Extractor
//!
//! 请求级的已解析权限上下文

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::models::{Action, Module, Principal};
use shared::{AppError, AppResult};

use super::resolver::ResolvedAccess;

/// Request-scoped access context
///
/// Inserted by [`require_auth`](super::require_auth); handlers take it as an
/// extractor.
#[derive(Debug, Clone)]
pub struct CurrentAccess {
    pub principal: Principal,
    /// Organization selected by the client, if any
    pub organization_id: Option<String>,
    pub access: ResolvedAccess,
}

impl CurrentAccess {
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        self.access.has_permission(module, action)
    }

    /// Guard check as an [`AppError`] (403 Access Denied)
    pub fn require(&self, module: Module, action: Action) -> AppResult<()> {
        self.access.check(module, action).map_err(AppError::from)
    }
}

impl<S> FromRequestParts<S> for CurrentAccess
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAccess>()
            .cloned()
            .ok_or_else(AppError::unauthorized)
    }
}
