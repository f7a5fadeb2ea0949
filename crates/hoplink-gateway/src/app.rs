use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{
    dashboard_handler, delete_url_handler, get_url_handler, health_handler,
    list_user_urls_handler, resolve_handler, shorten_handler, top_urls_handler,
    url_stats_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/api/v1",
                Router::new()
                    .route("/shorten", post(shorten_handler))
                    .route(
                        "/urls/:code",
                        get(get_url_handler).delete(delete_url_handler),
                    )
                    .route("/users/:user_id/urls", get(list_user_urls_handler))
                    .route("/analytics/urls/:code", get(url_stats_handler))
                    .route("/analytics/top-urls", get(top_urls_handler))
                    .route("/analytics/dashboard", get(dashboard_handler)),
            )
            // Root-level redirect route; static routes like /health
            // take precedence over the parameter.
            .route("/:code", get(resolve_handler))
            .with_state(state)
    }
}
