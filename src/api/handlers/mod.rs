//! Request handlers

pub mod containers;
pub mod images;
pub mod status;

use axum::http::{Method, Uri};

use crate::api::error::ApiError;

/// Known path, unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(format!(
        "Method {} not allowed for {}",
        method,
        uri.path()
    ))
}

/// Unknown path.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
