// Export route modules
pub mod health;
pub mod invocations;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes(state.clone()))
        .merge(invocations::routes(state))
}
