//! Request extractors that reject with [`ApiError`].

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body.
///
/// Deserializes like [`axum::Json`], but a missing content type or a body that
/// does not match the target type becomes a 400 with the usual error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
