use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::models::{Role, SessionUser, UserRecord},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::store::session_key,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub verification_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub name: String,
    pub role: Role,
    pub sid: String, // session record id
    pub exp: usize,
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn create_token(user: &SessionUser, sid: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::days(7))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        sid: sid.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal("Failed to create token".to_string()))
}

/// Write the `session_<sid>` snapshot and mint the matching token.
async fn open_session(state: &AppState, user: &UserRecord) -> Result<AuthResponse> {
    let snapshot = SessionUser::from(user);
    let sid = Uuid::new_v4().to_string();
    state.store.write(&session_key(&sid), &snapshot).await?;
    let token = create_token(&snapshot, &sid, &state.config.jwt_secret)?;
    Ok(AuthResponse {
        token,
        user: snapshot,
    })
}

async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<AuthResponse>> {
    if body.email.is_empty() || !body.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    // Per-portal signup rules
    let min_len = if body.role == Role::Admin { 8 } else { 6 };
    if body.password.len() < min_len {
        return Err(AppError::Validation(format!(
            "Password must be at least {min_len} characters"
        )));
    }
    let employee_id = match body.role {
        Role::Engineer => match body.employee_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => {
                return Err(AppError::Validation("Employee ID is required".to_string()));
            }
        },
        _ => None,
    };
    if body.role == Role::Admin
        && body.verification_code.as_deref() != Some(state.config.admin_signup_code.as_str())
    {
        return Err(AppError::Forbidden(
            "Invalid admin verification code".to_string(),
        ));
    }

    let mut users = state.store.users().await?;
    if users.iter().any(|u| u.email == body.email) {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        password_hash: hash_password(&body.password)?,
        role: body.role,
        status: "active".to_string(),
        employee_id,
        created_at: Utc::now(),
    };

    users.push(user.clone());
    state.store.save_users(&users).await?;

    tracing::info!(role = %user.role, "new signup: {}", user.email);

    let response = open_session(&state, &user).await?;
    Ok(Json(response))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let users = state.store.users().await?;
    let user = users
        .iter()
        .find(|u| u.email == body.email)
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let response = open_session(&state, user).await?;
    Ok(Json(response))
}

pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<Json<()>> {
    state.store.delete(&session_key(&user.sid)).await?;
    Ok(Json(()))
}

pub async fn me(user: AuthUser) -> Json<SessionUser> {
    Json(SessionUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashing_round_trips_and_rejects_wrong_input() {
        let hash = hash_password("hunter2secret").unwrap();
        assert_ne!(hash, "hunter2secret");
        assert!(verify_password("hunter2secret", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }
}
