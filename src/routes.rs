//! Route wiring.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/guest", post(handlers::auth::guest))
        .route("/tables", get(handlers::meta::list_tables))
        .route("/tables/:table/schema", get(handlers::meta::table_schema))
        .route("/enums", get(handlers::meta::list_enum_types))
        .route("/enums/:enum_type", get(handlers::meta::list_enum_labels))
        .route(
            "/tables/:table/data",
            post(handlers::crud::insert_one)
                .get(handlers::crud::select_one)
                .put(handlers::crud::update_one)
                .delete(handlers::crud::delete_one),
        )
        .route(
            "/tables/:table/data/bulk",
            post(handlers::crud::bulk_insert)
                .get(handlers::crud::bulk_select)
                .put(handlers::crud::bulk_update)
                .delete(handlers::crud::bulk_delete),
        )
        .route("/tables/:table/data/wizard", post(handlers::crud::run_wizard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
