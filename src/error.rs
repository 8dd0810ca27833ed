use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        persistence_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        route_unavailable_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        unexpected_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            3 => (StatusCode::BAD_GATEWAY, self.message.as_str()),
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            102 => (StatusCode::FORBIDDEN, self.message.as_str()),
            103 => (StatusCode::NOT_FOUND, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl Error {
    pub fn is_invalid_invocation_error(&self) -> bool {
        self.code == 100
    }

    pub fn is_invalid_input_error(&self) -> bool {
        self.code == 101
    }

    pub fn is_permission_denied_error(&self) -> bool {
        self.code == 102
    }

    pub fn is_record_not_found_error(&self) -> bool {
        self.code == 103
    }

    pub fn is_persistence_error(&self) -> bool {
        self.code == 2
    }

    pub fn is_route_unavailable_error(&self) -> bool {
        self.code == 3
    }

    pub fn is_position_unavailable_error(&self) -> bool {
        self.code == 4
    }

    /// Failures that block the feature and must reach the user. Everything
    /// else degrades to stale data plus a log line.
    pub fn is_user_visible(&self) -> bool {
        self.is_permission_denied_error() || self.is_record_not_found_error()
    }
}

pub fn invalid_invocation_error() -> Error {
    Error {
        code: 100,
        message: "invalid invocation".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

pub fn permission_denied_error() -> Error {
    Error {
        code: 102,
        message: "location permission denied".into(),
    }
}

pub fn record_not_found_error() -> Error {
    Error {
        code: 103,
        message: "rescue record not found".into(),
    }
}

pub fn env_var_error<T: Debug>(err: T) -> Error {
    tracing::debug!("environment variable error: {:?}", err);

    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn persistence_error<T: Debug>(err: T) -> Error {
    tracing::debug!("persistence error: {:?}", err);

    Error {
        code: 2,
        message: "persistence error".into(),
    }
}

pub fn route_unavailable_error<T: Debug>(err: T) -> Error {
    tracing::debug!("route unavailable: {:?}", err);

    Error {
        code: 3,
        message: "route unavailable".into(),
    }
}

pub fn position_unavailable_error() -> Error {
    Error {
        code: 4,
        message: "position unavailable".into(),
    }
}

pub fn unexpected_error<T: Debug>(err: T) -> Error {
    tracing::debug!("unexpected error: {:?}", err);

    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}
