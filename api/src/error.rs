use std::collections::HashMap;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;

use crate::{blog::comment::CommentError, identity::AuthenticationError};

/// Errors caused by the request itself. They are shown to the user as-is.
pub trait ApiRequestError: std::error::Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn code(&self) -> &'static str {
        "BAD_REQUEST"
    }
}

#[derive(Debug)]
pub enum AppError {
    ServerError {
        error: eyre::Report,

        #[cfg(debug_assertions)]
        backtrace: backtrace::Backtrace,
    },
    RequestError {
        code: &'static str,
        msg: String,
        status: StatusCode,
    },
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RequestError { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        let error_response = match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                tracing::error!(?error, "Request failed with a server error");

                #[cfg(debug_assertions)]
                {
                    let frames_info = filter_backtrace(&backtrace);
                    ErrorResponse {
                        code: "SERVER_ERR".into(),
                        msg: Some("Internal server error".into()),
                        debug_info: Some(HashMap::from([
                            (
                                "backtrace",
                                serde_json::to_value(&frames_info).unwrap_or_default(),
                            ),
                            ("error", Value::String(format!("{error:?}"))),
                        ])),
                    }
                }

                #[cfg(not(debug_assertions))]
                ErrorResponse {
                    code: "SERVER_ERR".into(),
                    msg: Some("Internal server error".into()),
                }
            }
            AppError::RequestError { code, msg, .. } => ErrorResponse {
                code: code.into(),
                msg: Some(msg),
                #[cfg(debug_assertions)]
                debug_info: None,
            },
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<eyre::Report> for AppError {
    fn from(error: eyre::Report) -> Self {
        AppError::ServerError {
            error,

            #[cfg(debug_assertions)]
            backtrace: backtrace::Backtrace::new(),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        eyre::Report::new(e).into()
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for AppError {
    fn from(e: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        eyre::Report::new(e).into()
    }
}

impl From<(String, StatusCode)> for AppError {
    fn from((msg, status): (String, StatusCode)) -> Self {
        AppError::RequestError {
            code: "ERR",
            msg,
            status,
        }
    }
}

impl From<CommentError> for AppError {
    fn from(e: CommentError) -> Self {
        match e {
            CommentError::Transport(error) => error.into(),
            e => AppError::RequestError {
                code: e.code(),
                msg: e.to_string(),
                status: e.status_code(),
            },
        }
    }
}

impl From<AuthenticationError> for AppError {
    fn from(e: AuthenticationError) -> Self {
        AppError::RequestError {
            code: e.code(),
            msg: e.to_string(),
            status: e.status_code(),
        }
    }
}

#[cfg(debug_assertions)]
#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

#[cfg(debug_assertions)]
fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = "blog_api::";
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}
