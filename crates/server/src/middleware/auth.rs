use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    db::models::{Role, SessionUser},
    error::{AppError, Result},
    routes::auth::Claims,
    services::store::session_key,
    AppState,
};

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Session id from the token's `sid` claim; names the `session_<sid>`
    /// record this request was validated against.
    pub sid: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = match auth_header {
        Some(t) => t,
        None => return Err(AppError::Unauthorized),
    };

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let claims = token_data.claims;

    // The token alone is not enough: logout deletes the session record, so a
    // cleared session must stop authenticating even before the token expires.
    let session: Option<SessionUser> = state.store.read(&session_key(&claims.sid)).await?;
    let session = session.ok_or(AppError::SessionExpired(claims.role))?;

    // Admin user deletion leaves no handle on the victim's session ids, so
    // the liveness check happens here: a session whose user is gone from
    // `allUsers` is dropped on sight.
    let users = state.store.users().await?;
    if !users.iter().any(|u| u.id == session.id) {
        state.store.delete(&session_key(&claims.sid)).await?;
        return Err(AppError::SessionExpired(session.role));
    }

    let user = AuthUser {
        id: session.id,
        email: session.email,
        name: session.name,
        role: session.role,
        sid: claims.sid,
    };

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

async fn require_role(request: Request, next: Next, role: Role) -> Result<Response> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.role == role => Ok(next.run(request).await),
        Some(user) => Err(AppError::Forbidden(format!(
            "The {role} portal is not available to {} accounts",
            user.role
        ))),
        None => Err(AppError::Unauthorized),
    }
}

pub async fn require_user(request: Request, next: Next) -> Result<Response> {
    require_role(request, next, Role::User).await
}

pub async fn require_engineer(request: Request, next: Next) -> Result<Response> {
    require_role(request, next, Role::Engineer).await
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response> {
    require_role(request, next, Role::Admin).await
}

// Extractor for getting the authenticated user from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
