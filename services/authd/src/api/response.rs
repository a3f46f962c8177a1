//! API 成功响应构造。

use axum::{Json, http::StatusCode};
use tg_shared_protocol::{MessageResponse, TokenResponse};

/// 签发 token 的成功响应。
pub(crate) fn token_response(token: String) -> (StatusCode, Json<TokenResponse>) {
    (StatusCode::OK, Json(TokenResponse { token }))
}

/// 仅含提示语的成功响应。
pub(crate) fn message_response(message: &str) -> (StatusCode, Json<MessageResponse>) {
    (StatusCode::OK, Json(MessageResponse::new(message)))
}
