use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use trail_core::RoutingError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Routing(err) => match err {
                RoutingError::InvalidRoute(_) => (StatusCode::BAD_REQUEST, "invalid_route"),
                RoutingError::MissingNode { .. } => (StatusCode::NOT_FOUND, "missing_node"),
                RoutingError::ComputationInFlight => {
                    (StatusCode::CONFLICT, "computation_in_flight")
                }
                RoutingError::Cancelled => (StatusCode::CONFLICT, "cancelled"),
                RoutingError::MissingEdge { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "graph_inconsistency")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorPayload {
                code,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
