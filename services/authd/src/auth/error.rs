//! 凭证存储与 token 服务的错误分类。

use thiserror::Error;

/// 凭证存储错误。
#[derive(Debug, Error)]
pub(crate) enum CredentialError {
    #[error("identity already exists")]
    DuplicateIdentity,
    #[error("identity not found")]
    NotFound,
    #[error("secret does not match")]
    InvalidCredential,
    /// 密码超过 bcrypt 可区分的长度上限。
    #[error("secret longer than {0} bytes")]
    SecretTooLong(usize),
    /// 持久化介质不可用（I/O、解码失败）。
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
    /// 哈希计算失败（bcrypt 错误、阻塞任务异常、存量哈希损坏）。
    #[error("secret hashing failed: {0}")]
    Hashing(String),
}

/// token 服务错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TokenError {
    #[error("token is malformed or its signature does not verify")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}
