mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::IdeationService;

pub type AppState = Arc<IdeationService>;

pub fn create_router(service: AppState) -> Router {
    let api = Router::new()
        // Workspace
        .route("/workspace", get(handlers::get_workspace))
        // Needs
        .route("/needs", get(handlers::list_needs))
        .route("/needs", post(handlers::create_need))
        .route("/needs/{id}", get(handlers::get_need))
        .route("/needs/{id}", delete(handlers::delete_need))
        .route("/needs/{id}/close", post(handlers::close_need))
        .route("/needs/{id}/open", post(handlers::open_need))
        .route("/needs/{id}/activate", post(handlers::activate_need))
        .route("/needs/{id}/tree", get(handlers::get_need_tree))
        // Expressions
        .route(
            "/needs/{id}/expressions/{expression_id}",
            delete(handlers::delete_expression),
        )
        .route(
            "/needs/{id}/expressions/{expression_id}/branch",
            post(handlers::branch_expression),
        )
        .route("/needs/{id}/predictions", post(handlers::add_prediction))
        .route("/needs/{id}/cross-pollinate", post(handlers::cross_pollinate))
        .route("/needs/{id}/hybrids", post(handlers::adopt_hybrid))
        // Analyses
        .route(
            "/needs/{id}/expressions/{expression_id}/analysis/{kind}",
            post(handlers::fetch_analysis),
        )
        .route("/needs/{id}/analysis/{kind}", post(handlers::analyze_all))
        .route("/analyses/prune", post(handlers::prune_analyses))
        // History
        .route("/history", get(handlers::get_history))
        .route("/history", delete(handlers::clear_history))
        .route("/history/undo", post(handlers::undo))
        .route("/history/redo", post(handlers::redo))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(service)
}
