//! The HTTP front-end: a single `/` route accepting GET and POST, per the
//! action table, wired over the [`StorageBackend`](crate::backend::StorageBackend)
//! trait.

pub mod auth;
pub mod envelope;
pub mod error_response;
pub mod params;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::backend::StorageBackend;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn StorageBackend>,
}

pub fn router(backend: Arc<dyn StorageBackend>) -> Router {
    let state = AppState { backend };
    Router::new()
        .route("/", get(routes::get_handler).post(routes::post_handler))
        .with_state(state)
}
