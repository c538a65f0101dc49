//! HTTP 接口层

pub mod error;
pub mod http;
pub mod middleware;

pub use error::ApiError;
pub use http::{AppState, router};
pub use middleware::{CurrentPrincipal, auth_middleware};
