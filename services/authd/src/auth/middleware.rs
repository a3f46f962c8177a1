//! Bearer token 中间件：校验通过后把身份挂到请求上下文。

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tg_shared_protocol::{MSG_NO_TOKEN, MSG_TOKEN_INVALID};
use tracing::debug;

use crate::{api::error::ApiError, state::AppState};

/// 已通过 token 校验的身份。
#[derive(Debug, Clone)]
pub(crate) struct AuthUser {
    pub(crate) id: String,
}

/// Authorization 头解析结果。
#[derive(Debug, PartialEq, Eq)]
enum BearerToken {
    /// 未携带或值为空。
    Missing,
    /// 非 Bearer 方案或无法解析。
    Invalid,
    Present(String),
}

/// 解析 `Authorization: Bearer <token>`，方案名不区分大小写。
fn parse_bearer(headers: &HeaderMap) -> BearerToken {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return BearerToken::Missing;
    };
    let Ok(raw) = value.to_str() else {
        return BearerToken::Invalid;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return BearerToken::Missing;
    }

    let (scheme, rest) = raw.split_once(' ').unwrap_or((raw, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return BearerToken::Invalid;
    }
    let token = rest.trim();
    if token.is_empty() {
        return BearerToken::Missing;
    }
    BearerToken::Present(token.to_string())
}

/// 受保护路由前置校验。
pub(crate) async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match parse_bearer(req.headers()) {
        BearerToken::Missing => return ApiError::unauthorized(MSG_NO_TOKEN).into_response(),
        BearerToken::Invalid => return ApiError::unauthorized(MSG_TOKEN_INVALID).into_response(),
        BearerToken::Present(token) => token,
    };

    match state.tokens.verify(&token) {
        Ok(id) => {
            req.extensions_mut().insert(AuthUser { id });
            next.run(req).await
        }
        Err(err) => {
            debug!("reject bearer token: {err}");
            ApiError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

    use super::{BearerToken, parse_bearer};

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("header"));
        map
    }

    #[test]
    fn absent_or_empty_header_is_missing() {
        assert_eq!(parse_bearer(&HeaderMap::new()), BearerToken::Missing);
        assert_eq!(parse_bearer(&headers("")), BearerToken::Missing);
        assert_eq!(parse_bearer(&headers("Bearer")), BearerToken::Missing);
        assert_eq!(parse_bearer(&headers("Bearer   ")), BearerToken::Missing);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(
            parse_bearer(&headers("Bearer abc.def.ghi")),
            BearerToken::Present("abc.def.ghi".to_string())
        );
        assert_eq!(
            parse_bearer(&headers("bearer  abc")),
            BearerToken::Present("abc".to_string())
        );
    }

    #[test]
    fn other_schemes_are_invalid() {
        assert_eq!(parse_bearer(&headers("Basic dXNlcjpwdw==")), BearerToken::Invalid);
        assert_eq!(parse_bearer(&headers("abc.def.ghi")), BearerToken::Invalid);
    }
}
