use super::{
    CommentNode, PostId,
    feed::{CommentEvent, Subscription},
    service::CommentService,
    tree::Page,
};

/// One viewer's copy of a post's comment thread.
///
/// The thread is only ever replaced by a complete fetch. When a fetch fails
/// the previous thread is kept.
pub struct ThreadView {
    service: CommentService,
    post_id: PostId,
    page: Option<Page>,
    roots: Vec<CommentNode>,
}

impl ThreadView {
    pub async fn open(service: CommentService, post_id: PostId, page: Option<Page>) -> Self {
        let mut view = ThreadView {
            service,
            post_id,
            page,
            roots: vec![],
        };
        view.refresh().await;
        view
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    /// Fetches the thread again. Returns whether the thread was replaced.
    pub async fn refresh(&mut self) -> bool {
        match self.service.thread(self.post_id, self.page).await {
            Ok(roots) => {
                self.roots = roots;
                true
            }
            Err(err) => {
                tracing::warn!(
                    ?err,
                    post_id = self.post_id,
                    "Failed to fetch comments, keeping the previous thread"
                );
                false
            }
        }
    }

    /// Waits for the next change on `subscription` and refreshes. Returns
    /// `None` when the feed is closed.
    pub async fn follow(&mut self, subscription: &mut Subscription) -> Option<bool> {
        debug_assert_eq!(subscription.post_id(), self.post_id);

        let event: CommentEvent = subscription.changed().await?;
        tracing::debug!(post_id = self.post_id, ?event, "Comment thread changed");

        Some(self.refresh().await)
    }
}
