use std::sync::Arc;

use axum::{Router, http::HeaderValue};
use diesel_async::{AsyncPgConnection, pooled_connection::deadpool::Pool};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod blog;
pub mod config;
pub mod error;
pub mod identity;
pub mod json;
pub mod schema;

use blog::comment::{
    feed::CommentFeeds,
    service::CommentService,
    store::{CommentStore, PgCommentStore},
};
use config::ServerConfig;

#[derive(Clone)]
pub struct App {
    pub config: Arc<ServerConfig>,
    pub diesel: Pool<AsyncPgConnection>,
    pub comments: CommentService,
}

impl App {
    pub fn new(config: ServerConfig, diesel: Pool<AsyncPgConnection>) -> Self {
        let store: Arc<dyn CommentStore> = Arc::new(PgCommentStore::new(diesel.clone()));
        let comments = CommentService::new(
            store,
            CommentFeeds::new(config.comment_feed_capacity),
            config.max_comment_length,
        );

        App {
            config: Arc::new(config),
            diesel,
            comments,
        }
    }
}

pub fn router(app: App) -> Router {
    let cors = match app
        .config
        .site_url
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
        Some(Err(err)) => {
            tracing::error!(?err, "Invalid SITE_URL, CORS is disabled");
            CorsLayer::new()
        }
        None => CorsLayer::new(),
    };

    Router::new()
        .nest("/public/blog", blog::routes::route())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}
