use diesel::prelude::*;

/// Comments are only enabled on posts of this category
pub const BLOG_CATEGORY: &str = "blog";

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::blog_posts)]
pub struct NewBlogPost<'a> {
    pub category: &'a str,
    pub slug: &'a str,
}
