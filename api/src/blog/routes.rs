use axum::{
    Router,
    routing::{get, put},
};

use crate::App;

use super::comment::{
    create::create_comment, delete::delete_comment, get::get_comments, patch::patch_comment,
    pin::pin_comment, stream::stream_comments,
};

pub fn route() -> Router<App> {
    // TODO rate limit these public endpoints
    Router::<App>::new()
        .route("/{slug}/comments", get(get_comments).post(create_comment))
        .route("/{slug}/comments/stream", get(stream_comments))
        .route(
            "/{slug}/comments/{id}",
            axum::routing::patch(patch_comment).delete(delete_comment),
        )
        .route("/{slug}/comments/{id}/pin", put(pin_comment))
}
