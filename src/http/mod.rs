//! HTTP collaborator (spec §6 "External Interfaces"): a thin axum surface
//! over [`crate::AppServices`] exposing the uniform `{success, data?,
//! error?}` envelope. Role enforcement reads a caller-supplied header
//! rather than performing real authentication — a production deployment
//! replaces [`handlers::role_from_headers`]'s header lookup with whatever
//! session/JWT verification it already trusts; the core only ever sees the
//! resulting validated `crate::dispatcher::Role` label.

pub mod envelope;
mod handlers;
mod routes;

pub use envelope::{ApiEnvelope, ApiError, ApiResult};
pub use routes::build_router;
