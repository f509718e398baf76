//! HTTP search surface: `GET /search?q=<terms>&mode=and|or&limit=<n>`

mod handlers;
mod router;
mod types;

pub use handlers::ApiError;
pub use router::{create_router, serve, AppState};
pub use types::{ErrorResponse, SearchHit, SearchParams, SearchResponse};
