//! API 错误定义与响应转换：核心错误种类到状态码/提示语的唯一映射点。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tg_shared_protocol::{
    MSG_INVALID_CREDENTIALS, MSG_MISSING_FIELDS, MSG_PASSWORD_TOO_LONG, MSG_SERVER_ERROR,
    MSG_TOKEN_INVALID, MSG_USER_EXISTS, MessageResponse,
};
use tracing::error;

use crate::auth::error::{CredentialError, TokenError};

/// 接口错误；只携带客户端可见的固定提示语。
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) message: &'static str,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    pub(crate) fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub(crate) fn missing_fields() -> Self {
        Self::bad_request(MSG_MISSING_FIELDS)
    }

    /// 内部错误：细节只进日志。
    pub(crate) fn internal(scope: &str, detail: impl std::fmt::Display) -> Self {
        error!("{scope} failed: {detail}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_SERVER_ERROR)
    }

    /// 转换为状态码与响应体。
    pub(crate) fn into_parts(self) -> (StatusCode, Json<MessageResponse>) {
        (self.status, Json(MessageResponse::new(self.message)))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_parts().into_response()
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DuplicateIdentity => Self::bad_request(MSG_USER_EXISTS),
            // 不区分“无此用户”与“密码错误”，避免身份枚举。
            CredentialError::NotFound | CredentialError::InvalidCredential => {
                Self::bad_request(MSG_INVALID_CREDENTIALS)
            }
            CredentialError::SecretTooLong(_) => Self::bad_request(MSG_PASSWORD_TOO_LONG),
            CredentialError::StoreUnavailable(_) | CredentialError::Hashing(_) => {
                Self::internal("credential store", err)
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::Expired => Self::unauthorized(MSG_TOKEN_INVALID),
            TokenError::Signing(_) => Self::internal("token service", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tg_shared_protocol::{
        MSG_INVALID_CREDENTIALS, MSG_PASSWORD_TOO_LONG, MSG_SERVER_ERROR, MSG_TOKEN_INVALID,
        MSG_USER_EXISTS,
    };

    use super::ApiError;
    use crate::auth::error::{CredentialError, TokenError};

    #[test]
    fn credential_errors_map_to_client_or_server_errors() {
        let dup = ApiError::from(CredentialError::DuplicateIdentity);
        assert_eq!((dup.status, dup.message), (StatusCode::BAD_REQUEST, MSG_USER_EXISTS));

        let missing = ApiError::from(CredentialError::NotFound);
        let wrong = ApiError::from(CredentialError::InvalidCredential);
        assert_eq!(missing.status, wrong.status);
        assert_eq!(missing.message, MSG_INVALID_CREDENTIALS);
        assert_eq!(wrong.message, MSG_INVALID_CREDENTIALS);

        let long = ApiError::from(CredentialError::SecretTooLong(71));
        assert_eq!(
            (long.status, long.message),
            (StatusCode::BAD_REQUEST, MSG_PASSWORD_TOO_LONG)
        );

        let down = ApiError::from(CredentialError::StoreUnavailable(
            "read /secret/path failed".to_string(),
        ));
        assert_eq!(
            (down.status, down.message),
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_SERVER_ERROR)
        );
    }

    #[test]
    fn token_errors_share_one_unauthorized_message() {
        for err in [TokenError::Malformed, TokenError::Expired] {
            let mapped = ApiError::from(err);
            assert_eq!(mapped.status, StatusCode::UNAUTHORIZED);
            assert_eq!(mapped.message, MSG_TOKEN_INVALID);
        }
    }
}
