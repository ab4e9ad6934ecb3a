use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::blog::comment::{Comment, NewComment, UserMetadata};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::blog_comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlogComment {
    pub id: i32,
    pub post_id: i32,
    pub identity_id: i32,
    pub user_metadata: serde_json::Value,
    pub content: String,
    pub parent_id: Option<i32>,
    pub is_pinned: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::blog_comments)]
pub struct NewBlogComment {
    pub post_id: i32,
    pub identity_id: i32,
    pub user_metadata: serde_json::Value,
    pub content: String,
    pub parent_id: Option<i32>,
}

impl From<BlogComment> for Comment {
    fn from(row: BlogComment) -> Self {
        let user_metadata = serde_json::from_value::<UserMetadata>(row.user_metadata)
            .unwrap_or_else(|err| {
                tracing::warn!(?err, comment_id = row.id, "Invalid user metadata on comment");
                UserMetadata::default()
            });

        Comment {
            id: row.id,
            post_id: row.post_id,
            content: row.content,
            created_at: row.created_at,
            user_id: row.identity_id,
            user_metadata,
            parent_id: row.parent_id,
            is_pinned: row.is_pinned,
        }
    }
}

impl From<NewComment> for NewBlogComment {
    fn from(comment: NewComment) -> Self {
        NewBlogComment {
            post_id: comment.post_id,
            identity_id: comment.user_id,
            user_metadata: serde_json::to_value(&comment.user_metadata)
                .unwrap_or(serde_json::Value::Object(Default::default())),
            content: comment.content,
            parent_id: comment.parent_id,
        }
    }
}
