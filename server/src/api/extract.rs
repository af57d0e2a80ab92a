//! Axum extractors whose rejections render as `ApiErrorResponse` (400).

use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::Json;

use crate::error::ApiErrorResponse;

#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiErrorResponse))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiErrorResponse))]
pub struct PathParams<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiErrorResponse))]
pub struct QueryParams<T>(pub T);
