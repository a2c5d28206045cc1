//! HTTP delivery layer for `CourseCore`.
//!
//! Translates between the wire (axum routes, the JSON response envelope)
//! and the domain services. All status-code mapping lives here; the domain
//! core reports error kinds only.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod envelope;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use envelope::ApiResponse;
pub use routes::router;
pub use state::AppState;
