use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

pub const LIVENESS_MESSAGE: &str = "Keep calm I'm absolutely alive 🐛";
pub const NOT_FOUND_MESSAGE: &str = "Oops! 👀";

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, LIVENESS_MESSAGE)
}

pub async fn no_route() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
}

/// Map a failure to its HTTP response: the failing status code with the
/// error's text as plain-text body. The error is logged here so handlers
/// only have to return.
pub fn error_response(status: StatusCode, err: &dyn std::error::Error) -> Response {
    error!("⛔ {}", err);
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TestError;

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "something broke")
        }
    }

    impl std::error::Error for TestError {}

    #[test]
    fn error_response_carries_status_and_message() {
        let response = error_response(StatusCode::BAD_REQUEST, &TestError);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
