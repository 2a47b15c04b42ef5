use crate::{backend::BackendError, notifier::NotifyError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_valid::{ValidRejection, ValidationRejection};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),
    #[error("Staff not found")]
    NotFound,
    #[error("Cannot book in the past")]
    InvalidRequest,
    #[error("Slot already booked")]
    Conflict,
    #[error("Failed to send email")]
    DeliveryFailure(#[source] NotifyError),
    #[error("Internal server error")]
    Storage(#[source] BackendError),
    #[error("Internal server error")]
    Task(#[from] JoinError),
}

impl From<BackendError> for BookingError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Conflict => BookingError::Conflict,
            err => BookingError::Storage(err),
        }
    }
}

/// Extractor and validator rejections both surface as `Validation`.
impl<E: Display> From<ValidRejection<E>> for BookingError {
    fn from(rejection: ValidRejection<E>) -> Self {
        match rejection {
            ValidationRejection::Valid(errors) => BookingError::Validation(errors.to_string()),
            ValidationRejection::Inner(inner) => BookingError::Validation(inner.to_string()),
        }
    }
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::Validation(_) | BookingError::InvalidRequest => StatusCode::BAD_REQUEST,
            BookingError::Conflict => StatusCode::CONFLICT,
            BookingError::DeliveryFailure(_)
            | BookingError::Storage(_)
            | BookingError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        match &self {
            BookingError::DeliveryFailure(source) => error!(%source, "Email delivery failed"),
            BookingError::Storage(source) => error!(%source, "Appointment store failed"),
            BookingError::Task(source) => error!(%source, "Blocking task failed"),
            _ => {}
        }

        let body = Json(json!({ "detail": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
