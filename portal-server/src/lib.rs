//! Preschool Portal Server - 权限解析与访问控制
//!
//! # 模块结构
//!
//! ```text
//! portal-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # 权限解析、会话、JWT、中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── store/         # 成员记录存储
//! ├── registry.rs    # 模块注册表 (导航)
//! └── utils/         # 日志
//! ```
//!
//! 权限解析是纯函数：`resolve(principal, membership)` 只依赖输入与
//! [`AccessPolicy`](auth::AccessPolicy)，不做 I/O，永不失败。

pub mod api;
pub mod auth;
pub mod core;
pub mod registry;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use auth::{AccessSession, CurrentAccess, JwtService, PermissionResolver, ResolvedAccess};
pub use core::{Config, Server, ServerState, build_app};
pub use registry::ModuleRegistry;
pub use store::{InMemoryMembershipStore, MembershipStore};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
