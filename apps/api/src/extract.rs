//! Request extractors that reject through `AppError`.
//!
//! axum's stock `Json`, `Query` and `Path` answer malformed input with a
//! plain-text body. These wrappers keep the `{success, error}` envelope and the
//! `VALIDATION_ERROR` code for every bad request.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);
