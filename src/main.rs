use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod context;
mod db;
mod error;
mod handlers;
mod http;
mod models;
mod validate;

use crate::context::AppContext;
use crate::db::store::Store;
use crate::http::request::ApiRequest;
use crate::http::router::RouteTable;

/// Request bodies beyond this are ignored rather than buffered.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
struct AppState {
    ctx: Arc<AppContext>,
    routes: Arc<RouteTable>,
}

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DB_* and JWT_* settings.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env();
    tracing::info!("starting storefront API in {:?} mode", config.environment);

    let store = Store::connect(&config.database)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to the row store: {}", e));

    let state = AppState {
        ctx: Arc::new(AppContext::new(config, store)),
        routes: Arc::new(handlers::routes()),
    };

    // The environment serves HTTP; every request funnels through the route
    // table via the fallback, so axum itself holds no routes.
    let app = Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);
    let bind_addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .unwrap_or_default();
    let api_request = ApiRequest::from_parts(parts.method, &parts.uri, &parts.headers, &bytes);
    state.routes.dispatch(state.ctx.clone(), api_request).await
}
