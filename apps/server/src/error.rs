use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nport_holdings::PipelineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Pipeline(e) => (
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_GATEWAY),
                e.message(),
            ),
        };
        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Give the 429 and 504 answers produced by middleware the same
/// `{"error": ...}` body that handler errors carry.
pub async fn json_error_body(response: Response) -> Response {
    let message = match response.status() {
        StatusCode::TOO_MANY_REQUESTS => "Rate limit exceeded. Please try again later.",
        StatusCode::GATEWAY_TIMEOUT => "Request timed out. Please try again later.",
        _ => return response,
    };

    let status = response.status();
    let headers = response.headers().clone();
    let mut rewritten = (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response();
    for (name, value) in headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewritten.headers_mut().append(name.clone(), value.clone());
        }
    }
    rewritten
}
