use axum::http::{StatusCode, request::Parts};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App,
    blog::comment::{Comment, UserMetadata},
    error::{ApiRequestError, AppError},
    schema::{identities, sessions},
};

use self::models::identity::{Identity, Traits};

pub mod models;

pub const COOKIE_NAME: &str = "auth_token";

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error("Authentication required, but no cookie `{COOKIE_NAME}` found in headers.")]
    NoCookie,

    #[error(
        "Unauthorized, please check if you're logged in by refreshing the \
         page. This could be due to an expired session or token has became invalid."
    )]
    Unauthorized,
}

impl ApiRequestError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::NoCookie => StatusCode::BAD_REQUEST,
            AuthenticationError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        "UNAUTHENTICATED"
    }
}

/// The caller of a comment operation. Every mutation receives one explicitly
/// instead of looking the session up on its own.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity_id: i32,
    pub traits: Traits,
    pub is_admin: bool,
}

impl AuthSession {
    pub fn new(identity: &Identity, is_admin: bool) -> Self {
        AuthSession {
            identity_id: identity.id,
            traits: identity.get_traits(),
            is_admin,
        }
    }

    pub fn owns(&self, comment: &Comment) -> bool {
        comment.user_id == self.identity_id
    }

    /// Snapshot of the display data stored along with new comments
    pub fn user_metadata(&self) -> UserMetadata {
        UserMetadata {
            name: self.traits.name.clone(),
            avatar_url: self.traits.avatar_url.clone(),
        }
    }
}

pub struct MaybeAuthUser(pub Result<AuthSession, AuthenticationError>);

impl axum::extract::FromRequestParts<App> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let jar = axum_extra::extract::cookie::CookieJar::from_headers(&parts.headers);

        let session_token: &str = if let Some(t) = jar.get(COOKIE_NAME) {
            t.value()
        } else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::NoCookie)));
        };

        let mut conn = state.diesel.get().await?;

        let identity = sessions::table
            .inner_join(identities::table)
            .filter(sessions::token.eq(session_token))
            .filter(sessions::active.eq(true))
            .filter(sessions::expires_at.gt(diesel::dsl::now))
            .filter(sessions::issued_at.le(diesel::dsl::now))
            .select(Identity::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(MaybeAuthUser(
            identity
                .map(|i| AuthSession::new(&i, state.config.is_admin(i.id)))
                .ok_or(AuthenticationError::Unauthorized),
        ))
    }
}

pub struct AuthUser(pub AuthSession);

impl axum::extract::FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(auth_user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        Ok(AuthUser(auth_user?))
    }
}
