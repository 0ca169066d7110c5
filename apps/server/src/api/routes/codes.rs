//! Code-set routes
//!
//! Fixed segments (`systems`, `map`, `$validate-coding`, `versions`, ...)
//! take priority over the `:system` and `:code` parameters at the same
//! position.

use crate::api::handlers::codes;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn code_routes() -> Router<AppState> {
    Router::new()
        .route("/systems", get(codes::list_systems))
        .route("/systems/reload", post(codes::reload))
        .route("/$validate-coding", post(codes::validate_coding))
        .route("/map", get(codes::map))
        .route("/map/batch", post(codes::map_batch))
        .route("/:system", get(codes::search))
        .route("/:system/versions", get(codes::versions))
        .route("/:system/suggest", get(codes::suggest))
        .route("/:system/$export", get(codes::export))
        .route("/:system/get", post(codes::batch_get))
        .route("/:system/validate", post(codes::validate))
        .route("/:system/:code", get(codes::get_code))
}
