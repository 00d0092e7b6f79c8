use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HardwareFault(pub String);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid payload. Use {{\"state\":\"ON\"}} or {{\"state\":\"OFF\"}}")]
    InvalidPayload,
    #[error("Failed to read GPIO state")]
    Read(#[source] HardwareFault),
    #[error("Failed to write GPIO state")]
    Write(#[source] HardwareFault),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPayload => StatusCode::BAD_REQUEST,
            AppError::Read(_) | AppError::Write(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // fault detail stays in the server log, clients only get the generic message
        if let AppError::Read(fault) | AppError::Write(fault) = self {
            error!("GPIO fault: {fault}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
