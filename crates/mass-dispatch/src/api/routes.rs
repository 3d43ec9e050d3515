//! 路由配置模块

use axum::{
    Router,
    routing::{get, post},
};

use super::{handlers, state::AppState};

/// 群发相关路由，挂载在 `/api` 下
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/broadcast", post(handlers::broadcast))
        .route("/notifications/platform", post(handlers::dispatch_platform))
        .route("/notifications/owners", post(handlers::dispatch_owners))
        .route("/notifications/templated", post(handlers::dispatch_templated))
        .route(
            "/notifications/scheduled",
            post(handlers::create_scheduled).get(handlers::list_scheduled),
        )
        .route(
            "/notifications/scheduled/{id}",
            get(handlers::get_scheduled).delete(handlers::cancel_scheduled),
        )
        .route("/notifications/stats", get(handlers::recent_stats))
        .route("/notification-types", get(handlers::list_types))
}
