//! 工具模块 - 日志等通用工具
//!
//! 错误类型统一来自 `shared::error`。

pub mod logger;

pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
