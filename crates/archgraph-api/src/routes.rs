use crate::{auth, handlers, AppState};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/architecture", get(handlers::get_architecture))
        // Components
        .route("/components", post(handlers::create_component))
        .route(
            "/components/{id}",
            get(handlers::get_component)
                .patch(handlers::update_component)
                .delete(handlers::delete_component),
        )
        .route("/components/{id}/move", post(handlers::move_component))
        .route(
            "/components/{id}/versions/{version}",
            put(handlers::update_version),
        )
        .route(
            "/components/{id}/versions/{version}/features/{filename}",
            put(handlers::upload_feature),
        )
        .route(
            "/components/{id}/features/{filename}",
            delete(handlers::delete_feature),
        )
        .route("/layers", post(handlers::create_layer))
        .route("/edges", post(handlers::create_edge))
        .route("/edges/{id}", delete(handlers::delete_edge))
        // Graph queries
        .route("/graph/path", get(handlers::shortest_path))
        .route("/graph/dependencies/{id}", get(handlers::dependency_tree))
        .route("/graph/dependents/{id}", get(handlers::dependents))
        .route("/graph/neighbourhood/{id}", get(handlers::neighbourhood))
        .route("/graph/order", get(handlers::implementation_order))
        .route("/graph/cycles", get(handlers::dependency_cycles))
        .route("/graph/next/{version}", get(handlers::next_implementable))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_write_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}
