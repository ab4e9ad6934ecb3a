use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl, pooled_connection::deadpool::Pool};

use crate::{
    blog::models::{
        blog_comment::{BlogComment, NewBlogComment},
        blog_post::{BLOG_CATEGORY, NewBlogPost},
    },
    schema::{blog_comments, blog_posts},
};

use super::{Comment, CommentId, NewComment, PostId};

/// Where comments live. Implementations only move rows around, authorization
/// and validation happen in the service.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_post(&self, slug: &str) -> eyre::Result<Option<PostId>>;

    /// Posts are created lazily, the first time someone comments or listens
    async fn ensure_post(&self, slug: &str) -> eyre::Result<PostId>;

    /// All comments of a post, oldest first
    async fn fetch_comments(&self, post_id: PostId) -> eyre::Result<Vec<Comment>>;

    async fn find_comment(&self, id: CommentId) -> eyre::Result<Option<Comment>>;

    async fn insert_comment(&self, comment: NewComment) -> eyre::Result<Comment>;

    async fn update_comment(&self, id: CommentId, content: &str) -> eyre::Result<Option<Comment>>;

    /// Returns how many of `ids` were actually deleted
    async fn delete_comments(&self, ids: &[CommentId]) -> eyre::Result<usize>;

    async fn set_pinned(&self, id: CommentId, pinned: bool) -> eyre::Result<Option<Comment>>;
}

pub struct PgCommentStore {
    diesel: Pool<AsyncPgConnection>,
}

impl PgCommentStore {
    pub fn new(diesel: Pool<AsyncPgConnection>) -> Self {
        Self { diesel }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn find_post(&self, slug: &str) -> eyre::Result<Option<PostId>> {
        let mut conn = self.diesel.get().await?;

        let post_id = blog_posts::table
            .filter(blog_posts::category.eq(BLOG_CATEGORY))
            .filter(blog_posts::slug.eq(slug))
            .select(blog_posts::id)
            .first::<i32>(&mut conn)
            .await
            .optional()?;

        Ok(post_id)
    }

    async fn ensure_post(&self, slug: &str) -> eyre::Result<PostId> {
        if let Some(post_id) = self.find_post(slug).await? {
            return Ok(post_id);
        }

        let mut conn = self.diesel.get().await?;

        diesel::insert_into(blog_posts::table)
            .values(NewBlogPost {
                category: BLOG_CATEGORY,
                slug,
            })
            .on_conflict((blog_posts::category, blog_posts::slug))
            .do_nothing()
            .execute(&mut conn)
            .await?;

        // select again in case another request created the post first
        let post_id = blog_posts::table
            .filter(blog_posts::category.eq(BLOG_CATEGORY))
            .filter(blog_posts::slug.eq(slug))
            .select(blog_posts::id)
            .first::<i32>(&mut conn)
            .await?;

        tracing::info!(slug, post_id, "Created blog post for comments");

        Ok(post_id)
    }

    async fn fetch_comments(&self, post_id: PostId) -> eyre::Result<Vec<Comment>> {
        let mut conn = self.diesel.get().await?;

        let rows = blog_comments::table
            .filter(blog_comments::post_id.eq(post_id))
            .order((blog_comments::created_at.asc(), blog_comments::id.asc()))
            .select(BlogComment::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn find_comment(&self, id: CommentId) -> eyre::Result<Option<Comment>> {
        let mut conn = self.diesel.get().await?;

        let row = blog_comments::table
            .find(id)
            .select(BlogComment::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(Comment::from))
    }

    async fn insert_comment(&self, comment: NewComment) -> eyre::Result<Comment> {
        let mut conn = self.diesel.get().await?;

        let row = diesel::insert_into(blog_comments::table)
            .values(NewBlogComment::from(comment))
            .returning(BlogComment::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(row.into())
    }

    async fn update_comment(&self, id: CommentId, content: &str) -> eyre::Result<Option<Comment>> {
        let mut conn = self.diesel.get().await?;

        let row = diesel::update(blog_comments::table.find(id))
            .set(blog_comments::content.eq(content))
            .returning(BlogComment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;

        Ok(row.map(Comment::from))
    }

    async fn delete_comments(&self, ids: &[CommentId]) -> eyre::Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.diesel.get().await?;

        let deleted =
            diesel::delete(blog_comments::table.filter(blog_comments::id.eq_any(ids.to_vec())))
                .execute(&mut conn)
                .await?;

        Ok(deleted)
    }

    async fn set_pinned(&self, id: CommentId, pinned: bool) -> eyre::Result<Option<Comment>> {
        let mut conn = self.diesel.get().await?;

        let row = diesel::update(blog_comments::table.find(id))
            .set(blog_comments::is_pinned.eq(pinned))
            .returning(BlogComment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;

        Ok(row.map(Comment::from))
    }
}
