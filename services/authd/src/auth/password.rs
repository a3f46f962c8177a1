//! 密码哈希：bcrypt（随机盐），计算放在阻塞线程池。
//!
//! bcrypt 只使用前 72 字节（含结尾的 NUL，即密码最多 71 字节）；这里统一走不截断的接口，
//! 超长密码注册时直接拒绝。

use bcrypt::BcryptError;

use crate::auth::error::CredentialError;

/// bcrypt 允许的最小成本。
pub(crate) const MIN_BCRYPT_COST: u32 = 4;
/// bcrypt 允许的最大成本。
pub(crate) const MAX_BCRYPT_COST: u32 = 31;
/// bcrypt 可区分的密码最大字节数。
pub(crate) const MAX_SECRET_BYTES: usize = 71;

/// 计算密码哈希；每次调用生成新的随机盐。超过 71 字节返回 `SecretTooLong`。
pub(crate) async fn hash_secret(secret: &str, cost: u32) -> Result<String, CredentialError> {
    let secret = secret.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::non_truncating_hash(secret, cost))
        .await
        .map_err(|err| CredentialError::Hashing(format!("hash task failed: {err}")))?
        .map_err(|err| match err {
            BcryptError::Truncation(_) => CredentialError::SecretTooLong(MAX_SECRET_BYTES),
            other => CredentialError::Hashing(format!("bcrypt hash failed: {other}")),
        })
}

/// 校验密码与存量哈希是否匹配；超长密码不可能匹配任何存量哈希，按不匹配处理。
pub(crate) async fn verify_secret(secret: &str, hash: &str) -> Result<bool, CredentialError> {
    let secret = secret.to_owned();
    let hash = hash.to_owned();
    match tokio::task::spawn_blocking(move || bcrypt::non_truncating_verify(secret, &hash))
        .await
        .map_err(|err| CredentialError::Hashing(format!("verify task failed: {err}")))?
    {
        Ok(matched) => Ok(matched),
        Err(BcryptError::Truncation(_)) => Ok(false),
        Err(err) => Err(CredentialError::Hashing(format!(
            "bcrypt verify failed: {err}"
        ))),
    }
}
