//! Request extractors whose rejections render as [`ApiError`], so a
//! malformed body or query gets the same `{"error": ...}` shape as every
//! other client error.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON body; shape errors become 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string; shape errors become 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
