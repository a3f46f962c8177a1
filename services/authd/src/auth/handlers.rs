//! 鉴权 HTTP 接口处理：注册、登录、受保护资源。

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tg_shared_protocol::{
    LoginRequest, MSG_PROTECTED_GRANTED, MessageResponse, SignupRequest, TokenResponse,
};
use tracing::{debug, info};

use crate::{
    api::{
        error::ApiError,
        response::{message_response, token_response},
    },
    auth::middleware::AuthUser,
    state::AppState,
};

/// 注册接口。
pub(crate) async fn signup_handler(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            debug!("reject signup body: {rejection}");
            return ApiError::missing_fields().into_response();
        }
    };
    match state.signup(&req).await {
        Ok(data) => token_response(data.token).into_response(),
        Err(err) => err.into_response(),
    }
}

/// 登录接口。
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            debug!("reject login body: {rejection}");
            return ApiError::missing_fields().into_response();
        }
    };
    match state.login(&req).await {
        Ok(data) => token_response(data.token).into_response(),
        Err(err) => err.into_response(),
    }
}

/// 受保护资源；身份已由 bearer 中间件注入。
pub(crate) async fn protected_handler(
    Extension(user): Extension<AuthUser>,
) -> (StatusCode, Json<MessageResponse>) {
    debug!("protected access granted to {}", user.id);
    message_response(MSG_PROTECTED_GRANTED)
}

impl AppState {
    /// 注册身份并签发 token。
    pub(crate) async fn signup(&self, req: &SignupRequest) -> Result<TokenResponse, ApiError> {
        let email = req.email.trim();
        if email.is_empty() || req.password.is_empty() {
            return Err(ApiError::missing_fields());
        }

        let record = self
            .credentials
            .register(email, &req.name, &req.password)
            .await?;
        info!("identity registered: {}", record.id);
        let token = self.tokens.issue(&record.id)?;
        Ok(TokenResponse { token })
    }

    /// 校验凭证并签发 token。
    pub(crate) async fn login(&self, req: &LoginRequest) -> Result<TokenResponse, ApiError> {
        let email = req.email.trim();
        if email.is_empty() || req.password.is_empty() {
            return Err(ApiError::missing_fields());
        }

        let record = self
            .credentials
            .authenticate(email, &req.password)
            .await
            .inspect_err(|err| debug!("login rejected: {err}"))?;
        info!("identity authenticated: {}", record.id);
        let token = self.tokens.issue(&record.id)?;
        Ok(TokenResponse { token })
    }
}
