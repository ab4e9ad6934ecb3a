use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{App, error::AppError, identity::AuthUser};

use super::{Comment, CommentError, CommentId, MutationResponse, get::respond_with_thread};

#[derive(Deserialize)]
pub struct CommentPatch {
    content: String,
}

#[debug_handler]
pub async fn patch_comment(
    State(ctx): State<App>,
    Path((slug, id)): Path<(String, CommentId)>,
    AuthUser(session): AuthUser,
    crate::json::Json(patch): crate::json::Json<CommentPatch>,
) -> Result<Json<MutationResponse<Comment>>, AppError> {
    let post_id = ctx
        .comments
        .find_post(&slug)
        .await?
        .ok_or(CommentError::NotFound)?;

    let comment = ctx
        .comments
        .edit(&session, post_id, id, &patch.content)
        .await?;

    Ok(respond_with_thread(&ctx.comments, post_id, comment).await)
}
