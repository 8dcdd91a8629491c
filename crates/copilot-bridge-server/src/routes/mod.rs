// Export route modules
pub mod graphql;
pub mod proxy;

use crate::state::AppState;
use axum::Router;

// Every call lands on the GraphQL entry point, which either answers it or
// hands it to the runtime proxy
pub fn configure(state: AppState) -> Router {
    Router::new().merge(graphql::routes(state))
}
