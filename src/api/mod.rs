pub mod cors;
pub mod health;
pub mod search;

pub use health::health_routes;
pub use search::{search_routes, AppState};

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn app(state: Arc<AppState>) -> Router {
    // Search claims the fallback; everything else is an explicit route
    let router = Router::new()
        .merge(health_routes())
        .merge(search_routes())
        .with_state(state);

    cors::with_cors_headers(router).layer(TraceLayer::new_for_http())
}
