//! 认证与权限中间件
//!
//! 服务端的权威校验；前端 [`AccessSession`](super::AccessSession) 只负责界面显隐。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::AppError;
use shared::models::{Action, Module};

use super::extractor::CurrentAccess;
use super::jwt::{JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

/// Header carrying the selected organization
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// 认证中间件 - 要求用户登录并解析权限
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT，按
/// `X-Organization-Id` 查询成员记录并解析，将 [`CurrentAccess`] 注入请求扩展。
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 NotAuthenticated |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 TokenInvalid |
///
/// 成员记录读取失败不会中断请求：按 "无成员记录" 解析（全部拒绝）。
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 允许 CORS 预检的 OPTIONS 请求 (跳过认证)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!(WARN, "auth_missing", uri = %req.uri());
            return Err(AppError::unauthorized());
        }
    };

    let claims = match state.jwt.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            security_log!(WARN, "auth_failed", error = %e, uri = %req.uri());
            return Err(match e {
                JwtError::ExpiredToken => AppError::token_expired(),
                _ => AppError::invalid_token("Invalid token"),
            });
        }
    };
    let principal = claims.into();

    let organization_id = req
        .headers()
        .get(ORGANIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let current = state.resolve_access(principal, organization_id).await;
    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// 权限检查中间件 - 要求模块操作权限
///
/// 无权限返回 403，details 中携带 `module` / `action`（Access Denied 面板）。
///
/// ```ignore
/// Router::new()
///     .route("/api/organizations/{org}/members", get(list))
///     .route_layer(middleware::from_fn(require_permission(Module::Permissions, Action::View)));
/// ```
pub fn require_permission(
    module: Module,
    action: Action,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let current = req
                .extensions()
                .get::<CurrentAccess>()
                .ok_or_else(AppError::unauthorized)?;

            if let Err(denied) = current.access.check(module, action) {
                security_log!(
                    WARN,
                    "permission_denied",
                    principal_id = %current.principal.id,
                    organization_id = ?current.organization_id,
                    module = %module,
                    action = %action
                );
                return Err(AppError::from(denied));
            }

            Ok(next.run(req).await)
        })
    }
}

/// 管理员中间件 - 要求 admin 角色
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let current = req
        .extensions()
        .get::<CurrentAccess>()
        .ok_or_else(AppError::unauthorized)?;

    if !current.access.is_admin() {
        security_log!(
            WARN,
            "admin_required",
            principal_id = %current.principal.id,
            role = ?current.access.role
        );
        return Err(AppError::admin_required());
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PermissionResolver;
    use axum::{Extension, Router, body::Body, middleware, routing::get};
    use http::StatusCode;
    use shared::models::{Membership, Principal, Role};
    use tower::ServiceExt;

    fn current(role: Role) -> CurrentAccess {
        let principal = Principal::new("u-1", "someone@example.org");
        let membership = Membership::new("org-1", "u-1", role);
        CurrentAccess {
            access: PermissionResolver::default().resolve(Some(&principal), Some(&membership)),
            principal,
            organization_id: Some("org-1".to_string()),
        }
    }

    fn app(current: Option<CurrentAccess>) -> Router {
        let router = Router::new()
            .route(
                "/admin",
                get(|| async { "ok" }).route_layer(middleware::from_fn(require_admin)),
            )
            .route(
                "/billing",
                get(|| async { "ok" }).route_layer(middleware::from_fn(require_permission(
                    Module::Billing,
                    Action::Edit,
                ))),
            );
        match current {
            Some(current) => router.layer(Extension(current)),
            None => router,
        }
    }

    async fn status(app: Router, uri: &str) -> StatusCode {
        app.oneshot(
            http::Request::builder()
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_require_permission() {
        assert_eq!(status(app(Some(current(Role::Staff))), "/billing").await, StatusCode::OK);
        assert_eq!(
            status(app(Some(current(Role::Parent))), "/billing").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(status(app(None), "/billing").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin() {
        assert_eq!(status(app(Some(current(Role::Admin))), "/admin").await, StatusCode::OK);
        assert_eq!(
            status(app(Some(current(Role::Staff))), "/admin").await,
            StatusCode::FORBIDDEN
        );
    }
}
