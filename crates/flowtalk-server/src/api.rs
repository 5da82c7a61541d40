use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use flowtalk_shared::auth::TokenKey;
use flowtalk_translate::{SharedDb, TranslationPipeline};

use crate::auth;
use crate::communities;
use crate::config::ServerConfig;
use crate::conversations;
use crate::messages;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::users;

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub pipeline: Arc<TranslationPipeline>,
    pub token_key: TokenKey,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route(
            "/messages",
            get(messages::channel_history)
                .post(messages::post_message)
                .delete(messages::clear_channel),
        )
        .route(
            "/messages/reactions",
            post(messages::set_reaction).delete(messages::remove_reaction),
        )
        .route(
            "/communities",
            get(communities::my_communities).post(communities::create_community),
        )
        .route("/communities/discover", get(communities::discover))
        .route("/communities/{id}/join", post(communities::join))
        .route("/channels", post(communities::create_channel))
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::open_conversation),
        )
        .route("/users/{id}", get(users::public_profile))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
