use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures_util::{
    StreamExt,
    stream::{self, BoxStream},
};

use crate::{App, error::AppError};

use super::{CommentError, CommentNode, service::CommentService, view::ThreadView};

/// How long a client waits before reconnecting to a post without comments
const UNKNOWN_POST_RETRY: Duration = Duration::from_secs(30);

type CommentStream = BoxStream<'static, Result<Event, Infallible>>;

/// Streams the whole comment thread of a post, once on connect and again
/// after every change.
pub async fn stream_comments(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Result<Sse<KeepAliveStream<CommentStream>>, AppError> {
    let stream = open_stream(&ctx.comments, &slug).await?;
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

async fn open_stream(comments: &CommentService, slug: &str) -> Result<CommentStream, CommentError> {
    // Posts are only created by the first comment. Until then the client gets
    // an empty thread and is told to come back later.
    let Some(post_id) = comments.find_post(slug).await? else {
        let event = thread_event(&[]).retry(UNKNOWN_POST_RETRY);
        return Ok(stream::iter([Ok(event)]).boxed());
    };

    // subscribe before the first fetch so that no change is missed in between
    let subscription = comments.subscribe(post_id);
    let view = ThreadView::open(comments.clone(), post_id, None).await;

    tracing::debug!(
        post_id,
        listeners = comments.listeners(post_id),
        "Comment stream opened"
    );

    let stream = stream::unfold(
        (view, subscription, true),
        |(mut view, mut subscription, first)| async move {
            if !first {
                // a failed refresh keeps the old thread, nothing new to send
                while !view.follow(&mut subscription).await? {}
            }

            let event = thread_event(view.roots());
            Some((Ok(event), (view, subscription, false)))
        },
    );

    Ok(stream.boxed())
}

fn thread_event(roots: &[CommentNode]) -> Event {
    let json = serde_json::to_string(roots).unwrap_or_else(|err| {
        tracing::error!(?err, "Failed to serialize comment thread");
        "[]".to_string()
    });
    Event::default().event("comments").data(json)
}
