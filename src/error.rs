use crate::database::{is_constraint_violation, is_foreign_key_violation};
use crate::estimator::EstimateError;
use crate::models::ValidationError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{title}: {detail}")]
    BadRequest { title: String, detail: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

/// Problem document returned for every error response
#[derive(Debug, Serialize)]
pub struct Problem {
    pub title: String,
    pub detail: String,
    pub status: u16,
}

impl ApiError {
    pub fn bad_request(title: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::BadRequest {
            title: title.into(),
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (title, detail) = match &self {
            ApiError::BadRequest { title, detail } => (title.clone(), detail.clone()),
            ApiError::Unauthorized(detail) => ("Unauthorized".to_string(), detail.clone()),
            ApiError::NotFound(what) => ("Not found".to_string(), format!("{} not found", what)),
            ApiError::Conflict(detail) => ("Conflict".to_string(), detail.clone()),
            ApiError::Internal(err) => {
                error!("Request failed: {:#}", err);
                ("Internal error".to_string(), "The request could not be completed".to_string())
            }
        };

        let body = Problem {
            title,
            detail,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if is_foreign_key_violation(&err) {
            ApiError::bad_request("Unknown tag", "tagCode does not match any registered tag")
        } else if is_constraint_violation(&err) {
            ApiError::Conflict("a record with the same unique key already exists".to_string())
        } else {
            ApiError::Internal(err)
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request("Invalid field", err.to_string())
    }
}

impl From<EstimateError> for ApiError {
    fn from(err: EstimateError) -> Self {
        match err {
            EstimateError::InvalidInput(_) => ApiError::bad_request("Invalid RSSI", err.to_string()),
            EstimateError::EstimationFailed(_) => {
                ApiError::bad_request("Invalid estimate", "The distance could not be estimated")
            }
            EstimateError::Calibration(_) => ApiError::Internal(err.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Invalid body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request("Invalid query", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request("Invalid path", rejection.body_text())
    }
}
