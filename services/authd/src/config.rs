//! 配置模块职责：
//! 1. 启动时一次性读取 authd 运行所需的环境变量并提供默认值。
//! 2. 将签名密钥收敛进显式的 `TokenConfig`，token 服务不再自行读取环境。

use std::{fmt, path::PathBuf, time::Duration};

use anyhow::{Context, anyhow};

use crate::auth::{
    password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST},
    token::{DEFAULT_TOKEN_TTL, TokenConfig},
};

/// 默认监听地址。
pub(crate) const DEFAULT_ADDR: &str = "0.0.0.0:5000";
/// 默认 bcrypt 成本（普通硬件约 100ms/次）。
pub(crate) const DEFAULT_BCRYPT_COST: u32 = 10;
/// 签名密钥环境变量。
const SECRET_ENV: &str = "AUTHD_JWT_SECRET";
/// 兼容旧部署的签名密钥环境变量。
const LEGACY_SECRET_ENV: &str = "JWT_SECRET";

/// authd 运行时配置。
#[derive(Clone)]
pub(crate) struct Config {
    /// HTTP 监听地址。
    pub(crate) addr: String,
    /// 身份记录 JSON 文件路径。
    pub(crate) store_path: PathBuf,
    /// token 签名密钥。
    pub(crate) jwt_secret: String,
    /// 默认 token 有效期。
    pub(crate) token_ttl: Duration,
    /// bcrypt 成本。
    pub(crate) bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("store_path", &self.store_path)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Config {
    /// 从进程环境变量构建配置。
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源构建配置；缺少签名密钥时报错。
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let jwt_secret = value(SECRET_ENV)
            .or_else(|| value(LEGACY_SECRET_ENV))
            .ok_or_else(|| anyhow!("{SECRET_ENV} (or {LEGACY_SECRET_ENV}) must be set"))?;

        let token_ttl = match value("AUTHD_TOKEN_TTL_SEC") {
            Some(raw) => {
                let sec = raw
                    .parse::<u64>()
                    .with_context(|| format!("invalid AUTHD_TOKEN_TTL_SEC: {raw}"))?;
                if sec == 0 {
                    return Err(anyhow!("AUTHD_TOKEN_TTL_SEC must be greater than 0"));
                }
                Duration::from_secs(sec)
            }
            None => DEFAULT_TOKEN_TTL,
        };

        let bcrypt_cost = match value("AUTHD_BCRYPT_COST") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("invalid AUTHD_BCRYPT_COST: {raw}"))?
                .clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            None => DEFAULT_BCRYPT_COST,
        };

        let store_path = value("AUTHD_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_store_path(value("HOME")));

        Ok(Self {
            addr: value("AUTHD_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            store_path,
            jwt_secret,
            token_ttl,
            bcrypt_cost,
        })
    }

    /// 交给 token 服务的配置。
    pub(crate) fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.jwt_secret.clone(),
            ttl: self.token_ttl,
        }
    }
}

/// 默认存储路径：`$HOME/.config/tokengate/authd/users.json`。
fn default_store_path(home: Option<String>) -> PathBuf {
    PathBuf::from(home.unwrap_or_else(|| ".".to_string()))
        .join(".config")
        .join("tokengate")
        .join("authd")
        .join("users.json")
}
