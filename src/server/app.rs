use axum::{extract::DefaultBodyLimit, middleware, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{broker_routes, consumer_routes, operational_routes};
use crate::tenant::tenant_scope;

use super::AppState;

/// Publisher and tag administration listener
pub fn create_app(state: AppState) -> Router {
    let scoped = tenant_scoped(broker_routes(), &state);
    finish(scoped, state)
}

/// Long-poll retrieval listener
pub fn create_consumer_app(state: AppState) -> Router {
    let scoped = tenant_scoped(consumer_routes(), &state);
    finish(scoped, state)
}

/// Put `routes` behind tenant resolution and response unscoping.
///
/// Without a tenant header the routes only exist under `/org/{id_org}`,
/// whose segment names the tenant.
fn tenant_scoped(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    let routes = if state.settings.tenant.header.is_some() {
        routes
    } else {
        Router::new().nest("/org/{id_org}", routes)
    };

    routes.layer(middleware::from_fn_with_state(state.clone(), tenant_scope))
}

fn finish(scoped: Router<AppState>, state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(scoped)
        // Health and metrics stay outside tenant scoping
        .merge(operational_routes())
        .layer(DefaultBodyLimit::max(state.settings.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
