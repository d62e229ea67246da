//! 认证授权模块
//!
//! 提供权限解析、会话状态、JWT 认证和中间件：
//! - [`PermissionResolver`] - (主体, 成员记录) → 角色 + 权限表
//! - [`AccessSession`] - 可订阅的会话权限状态
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentAccess`] - 请求级权限上下文
//! - [`require_auth`] / [`require_permission`] / [`require_admin`] - 中间件

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod permissions;
pub mod policy;
pub mod resolver;
pub mod session;

pub use extractor::CurrentAccess;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::{ORGANIZATION_HEADER, require_admin, require_auth, require_permission};
pub use permissions::RoleDefaults;
pub use policy::{AccessPolicy, AdminAllowlist};
pub use resolver::{AccessSource, PermissionResolver, ResolvedAccess};
pub use session::{AccessSession, AccessSnapshot, LoadTicket, Subscription};
