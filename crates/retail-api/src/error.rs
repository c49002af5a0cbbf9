//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use retail_core::{Classify, ErrorClass};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A backend error, carrying the class that decides its status code.
  #[error("store error: {source}")]
  Store {
    class:  ErrorClass,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { class: e.class(), source: Box::new(e) }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store { class, source } => {
        let status = match class {
          ErrorClass::NotFound => StatusCode::NOT_FOUND,
          ErrorClass::Conflict => StatusCode::CONFLICT,
          ErrorClass::Invalid => StatusCode::BAD_REQUEST,
          ErrorClass::Internal => {
            tracing::error!(error = %source, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
          }
        };
        (status, source.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
