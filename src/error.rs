use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Failure while reading content off disk for a page or feed. Details go to
/// the log; the visitor sees a plain 500.
#[derive(Debug)]
pub struct SiteError(pub std::io::Error);

impl From<std::io::Error> for SiteError {
    fn from(e: std::io::Error) -> Self {
        SiteError(e)
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        error!("request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Erro interno. Tente novamente em instantes.",
        )
            .into_response()
    }
}
