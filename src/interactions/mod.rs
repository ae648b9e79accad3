mod commands;
mod components;
pub mod dispatch;
pub mod dto;
pub mod handlers;
mod render;
pub mod token;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::interaction_routes())
}
