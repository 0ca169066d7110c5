use crate::api::handlers::rid;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn rid_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(rid::allocate_rid).get(rid::list))
        .route("/drid", post(rid::allocate_drid))
        .route("/validate", get(rid::validate))
        .route("/:id", get(rid::get_allocation))
        .route("/:id/promote", post(rid::promote))
        .route("/:id/release", post(rid::release))
}
