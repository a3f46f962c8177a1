//! Token 编解码与 HMAC 签名辅助函数。

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Serialize, de::DeserializeOwned};
use sha2::Sha256;

use crate::auth::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 并输出 base64url。
pub(crate) fn hmac_b64url(secret: &[u8], payload: &[u8]) -> Result<String, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|err| TokenError::Signing(format!("invalid signing key: {err}")))?;
    mac.update(payload);
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// 常量时间校验 base64url 形式的 HMAC-SHA256 签名。
pub(crate) fn verify_hmac_b64url(
    secret: &[u8],
    payload: &[u8],
    signature_b64: &str,
) -> Result<(), TokenError> {
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64.as_bytes())
        .map_err(|_| TokenError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::Malformed)?;
    mac.update(payload);
    mac.verify_slice(&signature).map_err(|_| TokenError::Malformed)
}

/// JSON 编码后输出 base64url 段。
pub(crate) fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let raw = serde_json::to_vec(value)
        .map_err(|err| TokenError::Signing(format!("encode token segment failed: {err}")))?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// 解码 base64url 段并解析 JSON。
pub(crate) fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)
}
