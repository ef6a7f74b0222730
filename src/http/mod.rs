//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, deadline)
//!     → handlers.rs (parse currency + bypass flags)
//!     → RateService
//!     → response.rs (DTO, error → status mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{ApiError, ErrorResponse, RateResponse};
pub use server::{build_router, AppState, HttpServer};
