use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identity::AuthSession;

use super::{
    Comment, CommentError, CommentId, CommentNode, NewComment, PostId,
    feed::{CommentEvent, CommentFeeds, Subscription},
    store::CommentStore,
    tree::{MAX_REPLY_DEPTH, Page, build_tree, paginate, reply_depth, subtree_ids},
};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommentSubmission {
    pub content: String,
    pub parent_id: Option<CommentId>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The comment and all of its replies
    Deleted { ids: Vec<CommentId> },
    AlreadyAbsent,
}

/// The single entry point for reading and changing comment threads.
///
/// Writes are never patched into an existing tree. Callers fetch the thread
/// again after a write, and listeners of the post are notified so they do the
/// same.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    feeds: CommentFeeds,
    max_content_length: usize,
}

impl CommentService {
    pub fn new(store: Arc<dyn CommentStore>, feeds: CommentFeeds, max_content_length: usize) -> Self {
        Self {
            store,
            feeds,
            max_content_length,
        }
    }

    pub async fn find_post(&self, slug: &str) -> Result<Option<PostId>, CommentError> {
        Ok(self.store.find_post(slug).await?)
    }

    pub async fn ensure_post(&self, slug: &str) -> Result<PostId, CommentError> {
        Ok(self.store.ensure_post(slug).await?)
    }

    pub async fn thread(
        &self,
        post_id: PostId,
        page: Option<Page>,
    ) -> Result<Vec<CommentNode>, CommentError> {
        let comments = self.store.fetch_comments(post_id).await?;
        let roots = build_tree(comments);

        Ok(match page {
            Some(page) => paginate(roots, page),
            None => roots,
        })
    }

    pub fn subscribe(&self, post_id: PostId) -> Subscription {
        self.feeds.subscribe(post_id)
    }

    pub fn listeners(&self, post_id: PostId) -> usize {
        self.feeds.subscriber_count(post_id)
    }

    pub async fn create(
        &self,
        session: &AuthSession,
        post_id: PostId,
        mut submission: CommentSubmission,
    ) -> Result<Comment, CommentError> {
        submission.content = self.validate_content(&submission.content)?;

        // the parent must already exist in the same post, which also rules
        // out a comment replying to itself
        if let Some(parent_id) = submission.parent_id {
            let parent = match self.store.find_comment(parent_id).await? {
                Some(parent) if parent.post_id == post_id => parent,
                _ => {
                    return Err(CommentError::Validation(
                        "You're replying to the comment that does not belong to this post",
                    ));
                }
            };

            if parent.parent_id.is_some() {
                let comments = self.store.fetch_comments(post_id).await?;
                if reply_depth(&comments, parent.id) >= MAX_REPLY_DEPTH {
                    return Err(CommentError::Validation("Replies cannot be nested any deeper"));
                }
            }
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                post_id,
                user_id: session.identity_id,
                user_metadata: session.user_metadata(),
                content: submission.content,
                parent_id: submission.parent_id,
            })
            .await?;

        tracing::info!(
            comment_id = comment.id,
            post_id,
            parent_id = ?comment.parent_id,
            "Comment created"
        );
        self.feeds
            .publish(post_id, CommentEvent::Created { id: comment.id });

        Ok(comment)
    }

    pub async fn edit(
        &self,
        session: &AuthSession,
        post_id: PostId,
        id: CommentId,
        content: &str,
    ) -> Result<Comment, CommentError> {
        let content = self.validate_content(content)?;
        let comment = self.find_in_post(post_id, id).await?;

        if !session.owns(&comment) {
            return Err(CommentError::PermissionDenied(
                "You are not the owner of this comment",
            ));
        }

        let updated = self
            .store
            .update_comment(id, &content)
            .await?
            .ok_or(CommentError::NotFound)?;

        tracing::info!(comment_id = id, post_id, "Comment edited");
        self.feeds.publish(post_id, CommentEvent::Updated { id });

        Ok(updated)
    }

    /// Deletes a comment together with all of its replies. Deleting a comment
    /// that is already gone is not an error.
    pub async fn delete(
        &self,
        session: &AuthSession,
        post_id: PostId,
        id: CommentId,
    ) -> Result<DeleteOutcome, CommentError> {
        let comment = match self.find_in_post(post_id, id).await {
            Ok(comment) => comment,
            Err(CommentError::NotFound) => return Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => return Err(e),
        };

        if !session.owns(&comment) && !session.is_admin {
            return Err(CommentError::PermissionDenied(
                "You are not the owner of this comment",
            ));
        }

        let comments = self.store.fetch_comments(post_id).await?;
        let ids = subtree_ids(&comments, id);
        let deleted = self.store.delete_comments(&ids).await?;

        if deleted == 0 {
            return Ok(DeleteOutcome::AlreadyAbsent);
        }

        tracing::info!(
            comment_id = id,
            post_id,
            deleted,
            by_admin = !session.owns(&comment),
            "Comment deleted"
        );
        self.feeds
            .publish(post_id, CommentEvent::Deleted { ids: ids.clone() });

        Ok(DeleteOutcome::Deleted { ids })
    }

    pub async fn set_pinned(
        &self,
        session: &AuthSession,
        post_id: PostId,
        id: CommentId,
        pinned: bool,
    ) -> Result<Comment, CommentError> {
        if !session.is_admin {
            return Err(CommentError::PermissionDenied(
                "Only the blog author can pin comments",
            ));
        }

        let comment = self.find_in_post(post_id, id).await?;
        if !comment.is_root() {
            return Err(CommentError::Validation("Only top-level comments can be pinned"));
        }

        let updated = self
            .store
            .set_pinned(id, pinned)
            .await?
            .ok_or(CommentError::NotFound)?;

        tracing::info!(comment_id = id, post_id, pinned, "Comment pin changed");
        self.feeds
            .publish(post_id, CommentEvent::Pinned { id, pinned });

        Ok(updated)
    }

    async fn find_in_post(&self, post_id: PostId, id: CommentId) -> Result<Comment, CommentError> {
        self.store
            .find_comment(id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or(CommentError::NotFound)
    }

    fn validate_content(&self, content: &str) -> Result<String, CommentError> {
        let content = content.trim();

        if content.is_empty() {
            return Err(CommentError::Validation("Content cannot be empty"));
        }

        if content.chars().count() > self.max_content_length {
            return Err(CommentError::Validation("Content too long"));
        }

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        blog::comment::memory::MemoryCommentStore, identity::models::identity::Traits,
    };

    const POST: PostId = 1;
    const OTHER_POST: PostId = 2;

    fn session(identity_id: i32, is_admin: bool) -> AuthSession {
        AuthSession {
            identity_id,
            traits: Traits {
                email: None,
                name: Some(format!("User {identity_id}")),
                avatar_url: Some(format!("https://example.com/{identity_id}.png")),
            },
            is_admin,
        }
    }

    fn service() -> CommentService {
        CommentService::new(Arc::new(MemoryCommentStore::new()), CommentFeeds::new(16), 50)
    }

    fn submission(content: &str, parent_id: Option<CommentId>) -> CommentSubmission {
        CommentSubmission {
            content: content.into(),
            parent_id,
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<CommentId> {
        nodes.iter().map(|n| n.comment.id).collect()
    }

    #[tokio::test]
    async fn test_create_root_and_reply() {
        let service = service();
        let alice = session(1, false);

        let root = service
            .create(&alice, POST, submission("  hello  ", None))
            .await
            .unwrap();
        assert_eq!(root.content, "hello");
        assert_eq!(root.user_metadata.name.as_deref(), Some("User 1"));
        assert!(!root.is_pinned);

        let reply = service
            .create(&alice, POST, submission("reply", Some(root.id)))
            .await
            .unwrap();

        let thread = service.thread(POST, None).await.unwrap();
        assert_eq!(ids(&thread), vec![root.id]);
        assert_eq!(ids(&thread[0].replies), vec![reply.id]);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_and_long_content() {
        let service = service();
        let alice = session(1, false);

        let blank = service.create(&alice, POST, submission(" \n\t", None)).await;
        assert!(matches!(blank, Err(CommentError::Validation(_))));

        let long = service
            .create(&alice, POST, submission(&"a".repeat(51), None))
            .await;
        assert!(matches!(long, Err(CommentError::Validation(_))));

        assert!(service.thread(POST, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_parent_from_other_post() {
        let service = service();
        let alice = session(1, false);

        let foreign = service
            .create(&alice, OTHER_POST, submission("elsewhere", None))
            .await
            .unwrap();

        let result = service
            .create(&alice, POST, submission("reply", Some(foreign.id)))
            .await;
        assert!(matches!(result, Err(CommentError::Validation(_))));

        let missing = service
            .create(&alice, POST, submission("reply", Some(404)))
            .await;
        assert!(matches!(missing, Err(CommentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_reply_past_depth_cap() {
        let service = service();
        let alice = session(1, false);

        let mut parent = service
            .create(&alice, POST, submission("root", None))
            .await
            .unwrap();
        for depth in 1..=MAX_REPLY_DEPTH {
            parent = service
                .create(&alice, POST, submission(&format!("depth {depth}"), Some(parent.id)))
                .await
                .unwrap();
        }

        let too_deep = service
            .create(&alice, POST, submission("too deep", Some(parent.id)))
            .await;
        assert!(matches!(too_deep, Err(CommentError::Validation(_))));

        let thread = service.thread(POST, None).await.unwrap();
        let mut node = &thread[0];
        let mut depth = 0;
        while let Some(reply) = node.replies.first() {
            node = reply;
            depth += 1;
        }
        assert_eq!(depth, MAX_REPLY_DEPTH);
        assert_eq!(node.comment.id, parent.id);
    }

    #[tokio::test]
    async fn test_new_comment_appears_exactly_once() {
        let service = service();
        let alice = session(1, false);

        let root = service
            .create(&alice, POST, submission("root", None))
            .await
            .unwrap();
        let reply = service
            .create(&alice, POST, submission("reply", Some(root.id)))
            .await
            .unwrap();
        let nested = service
            .create(&alice, POST, submission("nested", Some(reply.id)))
            .await
            .unwrap();

        fn occurrences(nodes: &[CommentNode], id: CommentId) -> usize {
            nodes
                .iter()
                .map(|n| (n.comment.id == id) as usize + occurrences(&n.replies, id))
                .sum()
        }

        let thread = service.thread(POST, None).await.unwrap();
        assert_eq!(occurrences(&thread, nested.id), 1);
        assert_eq!(ids(&thread[0].replies[0].replies), vec![nested.id]);
    }

    #[tokio::test]
    async fn test_edit_requires_owner() {
        let service = service();
        let alice = session(1, false);
        let bob = session(2, false);
        let admin = session(3, true);

        let comment = service
            .create(&alice, POST, submission("original", None))
            .await
            .unwrap();

        let by_bob = service.edit(&bob, POST, comment.id, "hijacked").await;
        assert!(matches!(by_bob, Err(CommentError::PermissionDenied(_))));

        let by_admin = service.edit(&admin, POST, comment.id, "moderated").await;
        assert!(matches!(by_admin, Err(CommentError::PermissionDenied(_))));

        let edited = service
            .edit(&alice, POST, comment.id, " edited ")
            .await
            .unwrap();
        assert_eq!(edited.content, "edited");
        assert_eq!(edited.created_at, comment.created_at);
    }

    #[tokio::test]
    async fn test_edit_missing_or_foreign_comment() {
        let service = service();
        let alice = session(1, false);

        let missing = service.edit(&alice, POST, 404, "content").await;
        assert!(matches!(missing, Err(CommentError::NotFound)));

        let foreign = service
            .create(&alice, OTHER_POST, submission("elsewhere", None))
            .await
            .unwrap();
        let wrong_post = service.edit(&alice, POST, foreign.id, "content").await;
        assert!(matches!(wrong_post, Err(CommentError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let service = service();
        let alice = session(1, false);
        let bob = session(2, false);

        let root = service
            .create(&alice, POST, submission("root", None))
            .await
            .unwrap();
        let reply = service
            .create(&bob, POST, submission("reply", Some(root.id)))
            .await
            .unwrap();
        let nested = service
            .create(&alice, POST, submission("nested", Some(reply.id)))
            .await
            .unwrap();
        let other = service
            .create(&bob, POST, submission("other", None))
            .await
            .unwrap();

        let outcome = service.delete(&alice, POST, root.id).await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                ids: vec![root.id, reply.id, nested.id]
            }
        );

        let thread = service.thread(POST, None).await.unwrap();
        assert_eq!(ids(&thread), vec![other.id]);
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_an_error() {
        let service = service();
        let alice = session(1, false);

        let comment = service
            .create(&alice, POST, submission("bye", None))
            .await
            .unwrap();

        assert!(matches!(
            service.delete(&alice, POST, comment.id).await,
            Ok(DeleteOutcome::Deleted { .. })
        ));
        assert_eq!(
            service.delete(&alice, POST, comment.id).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn test_delete_requires_owner_or_admin() {
        let service = service();
        let alice = session(1, false);
        let bob = session(2, false);
        let admin = session(3, true);

        let comment = service
            .create(&alice, POST, submission("mine", None))
            .await
            .unwrap();

        let by_bob = service.delete(&bob, POST, comment.id).await;
        assert!(matches!(by_bob, Err(CommentError::PermissionDenied(_))));

        let by_admin = service.delete(&admin, POST, comment.id).await.unwrap();
        assert_eq!(by_admin, DeleteOutcome::Deleted { ids: vec![comment.id] });
    }

    #[tokio::test]
    async fn test_pin_requires_admin_and_root() {
        let service = service();
        let alice = session(1, false);
        let admin = session(3, true);

        let first = service
            .create(&alice, POST, submission("first", None))
            .await
            .unwrap();
        let second = service
            .create(&alice, POST, submission("second", None))
            .await
            .unwrap();
        let reply = service
            .create(&alice, POST, submission("reply", Some(first.id)))
            .await
            .unwrap();

        let by_owner = service.set_pinned(&alice, POST, second.id, true).await;
        assert!(matches!(by_owner, Err(CommentError::PermissionDenied(_))));

        let on_reply = service.set_pinned(&admin, POST, reply.id, true).await;
        assert!(matches!(on_reply, Err(CommentError::Validation(_))));

        let missing = service.set_pinned(&admin, POST, 404, true).await;
        assert!(matches!(missing, Err(CommentError::NotFound)));

        let pinned = service
            .set_pinned(&admin, POST, second.id, true)
            .await
            .unwrap();
        assert!(pinned.is_pinned);

        let thread = service.thread(POST, None).await.unwrap();
        assert_eq!(ids(&thread), vec![second.id, first.id]);

        service
            .set_pinned(&admin, POST, second.id, false)
            .await
            .unwrap();
        let thread = service.thread(POST, None).await.unwrap();
        assert_eq!(ids(&thread), vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let service = service();
        let alice = session(1, false);
        let admin = session(3, true);
        let mut subscription = service.subscribe(POST);

        let comment = service
            .create(&alice, POST, submission("hello", None))
            .await
            .unwrap();
        service
            .edit(&alice, POST, comment.id, "hello again")
            .await
            .unwrap();
        service
            .set_pinned(&admin, POST, comment.id, true)
            .await
            .unwrap();
        service.delete(&alice, POST, comment.id).await.unwrap();
        // nothing to announce the second time
        service.delete(&alice, POST, comment.id).await.unwrap();
        service
            .create(&alice, OTHER_POST, submission("elsewhere", None))
            .await
            .unwrap();

        let mut events = vec![];
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), subscription.changed()).await
        {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                CommentEvent::Created { id: comment.id },
                CommentEvent::Updated { id: comment.id },
                CommentEvent::Pinned {
                    id: comment.id,
                    pinned: true
                },
                CommentEvent::Deleted {
                    ids: vec![comment.id]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_thread_unchanged() {
        let service = service();
        let alice = session(1, false);
        let bob = session(2, false);

        let comment = service
            .create(&alice, POST, submission("stays", None))
            .await
            .unwrap();
        let before = service.thread(POST, None).await.unwrap();

        let _ = service.edit(&bob, POST, comment.id, "changed").await;
        let _ = service.delete(&bob, POST, comment.id).await;
        let _ = service.create(&bob, POST, submission("", None)).await;

        assert_eq!(service.thread(POST, None).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_thread_pagination() {
        let service = service();
        let alice = session(1, false);

        let mut created = vec![];
        for i in 0..5 {
            let comment = service
                .create(&alice, POST, submission(&format!("comment {i}"), None))
                .await
                .unwrap();
            created.push(comment.id);
        }

        let page = service
            .thread(POST, Some(Page { offset: 2, size: 2 }))
            .await
            .unwrap();
        assert_eq!(ids(&page), created[2..4].to_vec());
    }
}
