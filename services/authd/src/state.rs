//! 服务共享状态：凭证存储与 token 服务句柄。

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::{
    auth::{backend::JsonFileBackend, store::CredentialStore, token::TokenService},
    config::Config,
};

/// 请求间共享的状态；凭证存储是唯一的可变共享资源。
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) credentials: Arc<CredentialStore>,
    pub(crate) tokens: Arc<TokenService>,
}

impl AppState {
    pub(crate) fn new(credentials: CredentialStore, tokens: TokenService) -> Self {
        Self {
            credentials: Arc::new(credentials),
            tokens: Arc::new(tokens),
        }
    }

    /// 按配置打开 JSON 文件存储并构建 token 服务。
    pub(crate) async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backend = Arc::new(JsonFileBackend::new(config.store_path.clone()));
        let credentials = CredentialStore::open(backend, config.bcrypt_cost)
            .await
            .with_context(|| {
                format!("open credential store: {}", config.store_path.display())
            })?;
        info!(
            "credential store ready: {} identities in {}",
            credentials.len().await,
            config.store_path.display()
        );
        Ok(Self::new(credentials, TokenService::new(config.token_config())))
    }
}

#[cfg(test)]
impl AppState {
    /// 测试辅助：内存存储 + 最低 bcrypt 成本。
    pub(crate) async fn for_test(
        backend: Arc<crate::auth::backend::MemoryBackend>,
        secret: &str,
    ) -> Self {
        let credentials =
            CredentialStore::open(backend, crate::auth::password::MIN_BCRYPT_COST)
                .await
                .expect("open test store");
        let tokens = TokenService::new(crate::auth::token::TokenConfig {
            secret: secret.to_string(),
            ttl: crate::auth::token::DEFAULT_TOKEN_TTL,
        });
        Self::new(credentials, tokens)
    }
}
