// 文件职责：
// 1) 定义 authd 与客户端共用的 HTTP 请求/响应结构。
// 2) 定义 token claims 结构与固定的客户端可见提示语。
// 3) 提供时间戳、身份键归一化等跨端一致的基础函数。

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 重复注册提示。
pub const MSG_USER_EXISTS: &str = "User already exists";
/// 登录失败提示（不区分“用户不存在”与“密码错误”）。
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid credentials";
/// 请求缺少 email/password。
pub const MSG_MISSING_FIELDS: &str = "Please provide email and password";
/// 密码超过 bcrypt 长度上限。
pub const MSG_PASSWORD_TOO_LONG: &str = "Password must be at most 71 bytes";
/// 未携带 token。
pub const MSG_NO_TOKEN: &str = "No token, authorization denied";
/// token 无效或已过期。
pub const MSG_TOKEN_INVALID: &str = "Token is not valid";
/// 受保护资源访问成功。
pub const MSG_PROTECTED_GRANTED: &str = "Protected data access granted!";
/// 服务端内部错误（不透出细节）。
pub const MSG_SERVER_ERROR: &str = "Server error";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    // 显示名称（不要求唯一）。
    #[serde(default)]
    pub name: String,
    // 登录邮箱（唯一身份键）。
    #[serde(default)]
    pub email: String,
    // 明文密码，仅在请求中出现。
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    // 登录邮箱。
    #[serde(default)]
    pub email: String,
    // 明文密码。
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    // 签发的 bearer token。
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    // 面向客户端的提示语。
    pub msg: String,
}

impl MessageResponse {
    /// 构造提示响应体。
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUser {
    // 身份记录 ID。
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    // 绑定的身份。
    pub user: TokenUser,
    // 签发时间（unix 秒）。
    pub iat: u64,
    // 过期时间（unix 秒）。
    pub exp: u64,
}

impl TokenClaims {
    /// 按签发时间与 TTL（秒）构造 claims。
    pub fn new(identity_id: impl Into<String>, iat: u64, ttl_sec: u64) -> Self {
        Self {
            user: TokenUser {
                id: identity_id.into(),
            },
            iat,
            exp: iat.saturating_add(ttl_sec),
        }
    }
}

/// 生成纳秒精度 UTC 时间戳（RFC3339）。
pub fn now_rfc3339_nanos() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// 归一化身份键（邮箱）：去除首尾空白并转小写。
pub fn normalize_identity_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
