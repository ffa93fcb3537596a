//! Web server setup and configuration

use crate::{routes::build_routes, state::AppState};
use axum::Router;
use impact_core::{Config, context_error::Result};
use std::sync::Arc;

/// Build the complete console with all routes and state
///
/// The state is returned alongside the router so the caller can stop its
/// pollers on shutdown.
///
/// # Errors
///
/// Returns an error if the backend client cannot be built.
pub fn build_app(config: Config) -> Result<(Router, Arc<AppState>)> {
    let state = Arc::new(AppState::new(config)?);
    Ok((build_app_with_state(Arc::clone(&state)), state))
}

/// Router over existing state
///
/// Also starts the sweeper that closes abandoned view sessions, so this
/// must run inside a tokio runtime.
pub fn build_app_with_state(state: Arc<AppState>) -> Router {
    state.start_sweeper();
    build_routes().with_state(state)
}
