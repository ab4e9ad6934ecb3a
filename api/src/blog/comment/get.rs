use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{App, error::AppError};

use super::{
    CommentNode, MutationResponse, PostId,
    service::CommentService,
    tree::{MAX_PAGE_SIZE, Page},
};

#[derive(Deserialize)]
pub struct Queries {
    page_offset: Option<usize>,
    page_size: Option<usize>,
}

impl Queries {
    fn page(&self) -> Option<Page> {
        match (self.page_offset, self.page_size) {
            (None, None) => None,
            (offset, size) => Some(Page {
                offset: offset.unwrap_or(0),
                size: size.unwrap_or(MAX_PAGE_SIZE),
            }),
        }
    }
}

pub async fn get_comments(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    Query(q): Query<Queries>,
) -> Result<Json<Vec<CommentNode>>, AppError> {
    let Some(post_id) = ctx.comments.find_post(&slug).await? else {
        return Ok(Json(vec![]));
    };

    Ok(Json(ctx.comments.thread(post_id, q.page()).await?))
}

/// Fetches the whole thread after a write, the write already succeeded so a
/// failure here is only logged
pub(super) async fn respond_with_thread<T>(
    comments: &CommentService,
    post_id: PostId,
    result: T,
) -> Json<MutationResponse<T>> {
    let thread = comments
        .thread(post_id, None)
        .await
        .inspect_err(|err| {
            tracing::warn!(?err, post_id, "Failed to fetch comments after a write");
        })
        .ok();

    Json(MutationResponse {
        result,
        comments: thread,
    })
}
