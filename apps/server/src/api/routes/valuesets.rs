use crate::api::handlers::valuesets;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn value_set_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(valuesets::list))
        .route("/$expand", post(valuesets::expand_compose))
        .route("/:name/expand", get(valuesets::expand))
}
