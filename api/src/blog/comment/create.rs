use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, identity::MaybeAuthUser};

use super::{
    Comment, CommentError, MutationResponse, get::respond_with_thread,
    service::CommentSubmission,
};

#[debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    MaybeAuthUser(auth_user): MaybeAuthUser,
    crate::json::Json(submission): crate::json::Json<CommentSubmission>,
) -> Result<Json<MutationResponse<Comment>>, AppError> {
    let session = auth_user
        .inspect_err(|err| tracing::debug!(?err, "Anonymous comment rejected"))
        .map_err(|_| CommentError::PermissionDenied("You need to sign in to comment"))?;

    // check if the post exists, otherwise create it
    let post_id = ctx.comments.ensure_post(&slug).await?;

    let comment = ctx.comments.create(&session, post_id, submission).await?;

    Ok(respond_with_thread(&ctx.comments, post_id, comment).await)
}
