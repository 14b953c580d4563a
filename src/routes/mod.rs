use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

mod flags;
mod health;
mod sdk;
pub mod sdk_auth;

pub use health::health;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let flag_router = Router::new()
        .route("/", get(flags::routes::list))
        .route("/{name}", get(flags::routes::get))
        .route("/{name}/evaluate/{kind}", post(sdk::routes::evaluate));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new()
                .nest("/flags", flag_router)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    sdk_auth::require_sdk_key,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "Feature flag evaluation service"
}
