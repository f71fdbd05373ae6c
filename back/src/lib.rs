pub mod clock;
pub mod config;
pub mod error;
pub mod item;
pub mod service;
pub mod store;
pub mod sweeper;
mod v1;

use std::sync::Arc;

use axum::Router;

use crate::service::TaskService;

pub struct AppState {
    pub service: TaskService,
}

impl AppState {
    pub fn new(service: TaskService) -> Self {
        Self { service }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", v1::router())
        .with_state(state)
}
