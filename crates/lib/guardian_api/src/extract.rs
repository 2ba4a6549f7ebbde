//! Extractors whose rejections render as [`AppError`] JSON bodies.

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Query};

use crate::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);
