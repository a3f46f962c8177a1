//! authd 应用装配：路由、CORS 与监听。

use anyhow::Context;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{
    auth::{
        handlers::{login_handler, protected_handler, signup_handler},
        middleware::require_bearer,
    },
    config::Config,
    state::AppState,
};

/// 构建路由；`/protected` 挂 bearer 校验中间件。
pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let protected = Router::new()
        .route("/protected", get(protected_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

/// authd 入口：打开存储并启动 HTTP 服务。
pub(crate) async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    info!(
        "token ttl {}s, bcrypt cost {}",
        state.tokens.default_ttl().as_secs(),
        config.bcrypt_cost
    );

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    info!("tg-authd listening on {}", config.addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("tg-authd stopped");
    Ok(())
}

/// 健康检查接口。
async fn healthz() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("listen for shutdown signal failed: {err}");
        std::future::pending::<()>().await;
    }
}
