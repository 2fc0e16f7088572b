//! Forum REST service.
//!
//! Exposes [`ForumService`](crate::forum::ForumService) over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /auth/register`, `POST /auth/login` - Accounts and session tokens
//! - `GET /admin`, `PUT /admin/users/:username` - Admin profile and promotion
//! - `/categories/...` - Category listing, creation, flags and privileges
//! - `/topics/...`, `/posts/...`, `/replies/...` - Content and votes
//! - `GET /health`, `GET /health/live`, `GET /health/ready` - Health checks

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_vote};
pub use routes::{create_router, ApiError, ErrorResponse};
pub use state::ServiceState;
