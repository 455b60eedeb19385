//! Unified error type.

use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::response::{IntoResponse, Response};
use crate::routes::auth::LOGIN_PATH;

/// The error type returned by jotter's fallible operations.
///
/// Startup failures (configuration, instance directory) and infrastructure
/// failures (opening the database, binding a port) live next to the three
/// client-facing variants handlers use to reject a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(String),

    #[error("cannot create instance directory {}: {source}", path.display())]
    InstanceDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema script failed: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// Rejected input. Answered with `400` and the message as the error text.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("forbidden")]
    Forbidden,

    /// No logged-in user. Answered with a redirect to the login route.
    #[error("login required")]
    LoginRequired,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::LoginRequired => StatusCode::FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Self::LoginRequired = self {
            return Response::redirect(LOGIN_PATH);
        }

        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_owned()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message, "status": status.as_u16() });
        Response::builder()
            .status(status)
            .json(body.to_string().into_bytes())
    }
}
