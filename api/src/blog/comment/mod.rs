pub mod create;
pub mod delete;
pub mod feed;
pub mod get;
#[cfg(test)]
pub mod memory;
pub mod patch;
pub mod pin;
pub mod service;
pub mod store;
pub mod stream;
pub mod tree;
pub mod view;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::ApiRequestError;

pub type CommentId = i32;
pub type PostId = i32;

/// A comment as stored, one row per comment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub content: String,
    pub created_at: chrono::NaiveDateTime,
    pub user_id: i32,
    pub user_metadata: UserMetadata,
    pub parent_id: Option<CommentId>,
    pub is_pinned: bool,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Author display data captured when the comment was posted. It is not
/// updated when the author changes their profile.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct UserMetadata {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

// The model that will be returned to the client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub user_id: i32,
    pub user_metadata: UserMetadata,
    pub content: String,
    pub parent_id: Option<CommentId>,
}

#[derive(thiserror::Error, Debug)]
pub enum CommentError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error("The comment does not exist or has been deleted")]
    NotFound,

    #[error("Could not reach the comment storage")]
    Transport(#[from] eyre::Report),
}

impl ApiRequestError for CommentError {
    fn status_code(&self) -> StatusCode {
        match self {
            CommentError::Validation(_) => StatusCode::BAD_REQUEST,
            CommentError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CommentError::NotFound => StatusCode::NOT_FOUND,
            CommentError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CommentError::Validation(_) => "VALIDATION_ERR",
            CommentError::PermissionDenied(_) => "PERMISSION_DENIED",
            CommentError::NotFound => "NOT_FOUND",
            CommentError::Transport(_) => "SERVER_ERR",
        }
    }
}

/// Response of a write: its result plus the thread fetched again afterwards.
/// `comments` is left out if that fetch failed, the write itself still went
/// through.
#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    pub result: T,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentNode>>,
}
