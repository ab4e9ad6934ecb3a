use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, identity::AuthUser};

use super::{
    CommentId, MutationResponse, get::respond_with_thread, service::DeleteOutcome,
};

#[debug_handler]
pub async fn delete_comment(
    State(ctx): State<App>,
    Path((slug, id)): Path<(String, CommentId)>,
    AuthUser(session): AuthUser,
) -> Result<Json<MutationResponse<DeleteOutcome>>, AppError> {
    let Some(post_id) = ctx.comments.find_post(&slug).await? else {
        return Ok(Json(MutationResponse {
            result: DeleteOutcome::AlreadyAbsent,
            comments: Some(vec![]),
        }));
    };

    let outcome = ctx.comments.delete(&session, post_id, id).await?;

    Ok(respond_with_thread(&ctx.comments, post_id, outcome).await)
}
