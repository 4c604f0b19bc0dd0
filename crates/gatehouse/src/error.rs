// crates/gatehouse/src/error.rs

//! Fatal-to-request errors + canned HTTP responses.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::CredentialError;
use crate::session::SessionError;

/// Failures that abort the current request with a generic error page.
///
/// Client-caused validation failures (bad token, wrong password, broken
/// form) never become a `GateError`: those are recovered inside the gate
/// and reported through the challenge page. Everything here is
/// infrastructure trouble the client must learn nothing about.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("session backend failure: {0}")]
    Session(#[from] SessionError),

    #[error("unexpected credential backend failure: {0}")]
    Credential(#[from] CredentialError),

    #[error("not enough entropy was available to generate a token")]
    Entropy,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        // Every fatal gate failure is an internal error as far as the
        // client is concerned.
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        // The specific cause goes to operator logs only, never to the
        // client.
        CannedResponse::InternalServerError.into_response()
    }
}

/// A canned response for an HTTP status, for handlers that have nothing
/// more specific to say: a minimal page with the status title and a short
/// explanation. Server-side errors add a pointer to the administrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CannedResponse {
    NotFound,
    InternalServerError,
    NotImplemented,
}

impl CannedResponse {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CannedResponse::NotFound => StatusCode::NOT_FOUND,
            CannedResponse::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            CannedResponse::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            CannedResponse::NotFound => "Not Found",
            CannedResponse::InternalServerError => "Internal Server Error",
            CannedResponse::NotImplemented => "Not Implemented",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            CannedResponse::NotFound => "The requested page was not found.",
            CannedResponse::InternalServerError => "An internal server error occurred.",
            CannedResponse::NotImplemented => {
                "The requested behavior has not yet been implemented."
            }
        }
    }

    fn should_contact(&self) -> bool {
        !matches!(self, CannedResponse::NotFound)
    }
}

impl IntoResponse for CannedResponse {
    fn into_response(self) -> Response {
        let contact = if self.should_contact() {
            " Please contact your system administrator."
        } else {
            ""
        };
        let body = format!(
            "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
             <body><h1>{title}</h1><p>{message}{contact}</p></body></html>",
            title = self.title(),
            message = self.message(),
        );

        (self.status_code(), Html(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_gate_error_maps_to_internal_server_error() {
        let errors = [
            GateError::Session(SessionError::Backend("db gone".to_string())),
            GateError::Credential(CredentialError::Backend("db gone".to_string())),
            GateError::Entropy,
            GateError::Internal("whoops".to_string()),
        ];
        for error in errors {
            assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn gate_error_response_carries_no_detail() {
        let error = GateError::Internal("secret backend path /var/db".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Internal Server Error"));
        assert!(!body.contains("/var/db"));
    }

    #[tokio::test]
    async fn canned_responses_render_their_status() {
        let response = CannedResponse::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Not Found"));
        assert!(!body.contains("administrator"));
    }

    #[tokio::test]
    async fn server_errors_point_at_the_administrator() {
        let response = CannedResponse::NotImplemented.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Please contact your system administrator."));
    }
}
