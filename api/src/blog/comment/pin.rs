use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{App, error::AppError, identity::AuthUser};

use super::{Comment, CommentError, CommentId, MutationResponse, get::respond_with_thread};

#[derive(Deserialize)]
pub struct PinRequest {
    pinned: bool,
}

#[debug_handler]
pub async fn pin_comment(
    State(ctx): State<App>,
    Path((slug, id)): Path<(String, CommentId)>,
    AuthUser(session): AuthUser,
    crate::json::Json(request): crate::json::Json<PinRequest>,
) -> Result<Json<MutationResponse<Comment>>, AppError> {
    let post_id = ctx
        .comments
        .find_post(&slug)
        .await?
        .ok_or(CommentError::NotFound)?;

    let comment = ctx
        .comments
        .set_pinned(&session, post_id, id, request.pinned)
        .await?;

    Ok(respond_with_thread(&ctx.comments, post_id, comment).await)
}
