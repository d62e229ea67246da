use shared::{AppError, AppResult, ErrorCode};

use crate::auth::JwtConfig;
use crate::auth::policy::{DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PATTERN};

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 日志 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | ADMIN_EMAILS | admin@preschoolpro.com | 管理员邮箱白名单 (逗号分隔) |
/// | ADMIN_EMAIL_PATTERNS | admin@ | 管理员邮箱子串规则 (逗号分隔) |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | JWT_SECRET 等 | - | 见 [`JwtConfig::from_env`] |
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 管理员邮箱白名单 (精确匹配)
    pub admin_emails: Vec<String>,
    /// 管理员邮箱子串规则
    pub admin_email_patterns: Vec<String>,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// JWT 认证配置
    pub jwt: JwtConfig,
}

fn env_list(name: &str, default: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的项使用默认值；JWT 密钥无效时报错。
    pub fn from_env() -> AppResult<Self> {
        let jwt = JwtConfig::from_env()
            .map_err(|e| AppError::with_message(ErrorCode::ConfigError, e.to_string()))?;

        Ok(Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            admin_emails: env_list("ADMIN_EMAILS", DEFAULT_ADMIN_EMAIL),
            admin_email_patterns: env_list("ADMIN_EMAIL_PATTERNS", DEFAULT_ADMIN_PATTERN),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            jwt,
        })
    }

    /// 测试用配置：固定密钥、默认白名单
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            http_port: 0,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            log_json: false,
            log_dir: None,
            admin_emails: vec![DEFAULT_ADMIN_EMAIL.to_string()],
            admin_email_patterns: vec![DEFAULT_ADMIN_PATTERN.to_string()],
            request_timeout_ms: 30000,
            jwt: JwtConfig::new(jwt_secret),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
