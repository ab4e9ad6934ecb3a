use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use eyre::eyre;
use tokio::sync::Mutex;

use super::{Comment, CommentId, NewComment, PostId, store::CommentStore};

#[derive(Default)]
struct Tables {
    posts: HashMap<String, PostId>,
    comments: Vec<Comment>,
    next_comment_id: CommentId,
}

/// In-process stand-in for the database. Timestamps advance one second per
/// insert so ordering is deterministic.
#[derive(Default)]
pub struct MemoryCommentStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as if the database went away
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> eyre::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(eyre!("connection refused"));
        }
        Ok(())
    }

    fn timestamp(id: CommentId) -> NaiveDateTime {
        DateTime::from_timestamp(1_700_000_000 + id as i64, 0)
            .unwrap_or_default()
            .naive_utc()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn find_post(&self, slug: &str) -> eyre::Result<Option<PostId>> {
        self.check_available()?;
        Ok(self.tables.lock().await.posts.get(slug).copied())
    }

    async fn ensure_post(&self, slug: &str) -> eyre::Result<PostId> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let next_id = tables.posts.len() as PostId + 1;
        Ok(*tables.posts.entry(slug.to_string()).or_insert(next_id))
    }

    async fn fetch_comments(&self, post_id: PostId) -> eyre::Result<Vec<Comment>> {
        self.check_available()?;
        let mut comments: Vec<Comment> = self
            .tables
            .lock()
            .await
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn find_comment(&self, id: CommentId) -> eyre::Result<Option<Comment>> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .await
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn insert_comment(&self, comment: NewComment) -> eyre::Result<Comment> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        tables.next_comment_id += 1;
        let id = tables.next_comment_id;

        let comment = Comment {
            id,
            post_id: comment.post_id,
            content: comment.content,
            created_at: Self::timestamp(id),
            user_id: comment.user_id,
            user_metadata: comment.user_metadata,
            parent_id: comment.parent_id,
            is_pinned: false,
        };
        tables.comments.push(comment.clone());

        Ok(comment)
    }

    async fn update_comment(&self, id: CommentId, content: &str) -> eyre::Result<Option<Comment>> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.content = content.to_string();
            c.clone()
        }))
    }

    async fn delete_comments(&self, ids: &[CommentId]) -> eyre::Result<usize> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| !ids.contains(&c.id));
        Ok(before - tables.comments.len())
    }

    async fn set_pinned(&self, id: CommentId, pinned: bool) -> eyre::Result<Option<Comment>> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.is_pinned = pinned;
            c.clone()
        }))
    }
}
