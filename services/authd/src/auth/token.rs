//! Token 服务：签发与校验 HS256 签名的限时 token。
//!
//! 格式与标准 JWT 兼容：`base64url(header).base64url(claims).base64url(sig)`，
//! claims 为 `{"user":{"id"},"iat","exp"}`。签名密钥在构造时显式传入，运行期不轮换。

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tg_shared_protocol::TokenClaims;

use crate::auth::{
    error::TokenError,
    token_crypto::{decode_segment, encode_segment, hmac_b64url, verify_hmac_b64url},
};

/// 默认 token 有效期。
pub(crate) const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
/// 唯一接受的签名算法。
const TOKEN_ALG: &str = "HS256";
const TOKEN_TYP: &str = "JWT";

/// 当前 unix 秒。
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 有效期按整秒计，不足一秒的部分向上取整。
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)
}

/// Token 服务配置。
#[derive(Clone)]
pub(crate) struct TokenConfig {
    /// 对称签名密钥。
    pub(crate) secret: String,
    /// 默认有效期。
    pub(crate) ttl: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Token 服务；无可变状态，可被任意并发调用。
pub(crate) struct TokenService {
    secret: Vec<u8>,
    default_ttl: Duration,
}

impl TokenService {
    pub(crate) fn new(config: TokenConfig) -> Self {
        Self {
            secret: config.secret.into_bytes(),
            default_ttl: config.ttl,
        }
    }

    pub(crate) fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 按默认有效期签发。
    pub(crate) fn issue(&self, identity_id: &str) -> Result<String, TokenError> {
        self.issue_with_ttl(identity_id, self.default_ttl)
    }

    /// 按指定有效期签发。
    pub(crate) fn issue_with_ttl(
        &self,
        identity_id: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(identity_id, ttl, unix_now())
    }

    /// 以给定时间为签发时间生成 token。
    pub(crate) fn issue_at(
        &self,
        identity_id: &str,
        ttl: Duration,
        now: u64,
    ) -> Result<String, TokenError> {
        let header = encode_segment(&TokenHeader {
            alg: TOKEN_ALG.to_string(),
            typ: TOKEN_TYP.to_string(),
        })?;
        let claims = encode_segment(&TokenClaims::new(identity_id, now, ttl_secs(ttl)))?;
        let signing_input = format!("{header}.{claims}");
        let signature = hmac_b64url(&self.secret, signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{signature}"))
    }

    /// 校验 token，返回绑定的身份 ID。
    pub(crate) fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, unix_now())
    }

    pub(crate) fn verify_at(&self, token: &str, now: u64) -> Result<String, TokenError> {
        Ok(self.verify_claims_at(token, now)?.user.id)
    }

    /// 校验签名与有效期：签名不符为 `Malformed`，`now >= exp` 为 `Expired`。
    pub(crate) fn verify_claims_at(&self, token: &str, now: u64) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };
        if header_b64.is_empty() || claims_b64.is_empty() || sig_b64.is_empty() {
            return Err(TokenError::Malformed);
        }

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        verify_hmac_b64url(&self.secret, signing_input.as_bytes(), sig_b64)?;

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != TOKEN_ALG {
            return Err(TokenError::Malformed);
        }
        let claims: TokenClaims = decode_segment(claims_b64)?;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
