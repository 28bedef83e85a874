use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{PasswordHasher, TokenService},
    db::UserRepository,
    error::{AppError, AppResult},
    models::{AccountView, User},
};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 72; // bcrypt ignores bytes past 72

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: AccountView,
}

pub fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::InvalidInput(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::InvalidInput(
            "Username may only contain letters, digits and underscores".to_string(),
        ));
    }
    Ok(())
}

/// Lower-cases and checks the basic `local@domain` shape
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(AppError::InvalidInput("Invalid email format".to_string()));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < PASSWORD_MIN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    if password.len() > PASSWORD_MAX {
        return Err(AppError::InvalidInput(format!(
            "Password must be at most {} bytes",
            PASSWORD_MAX
        )));
    }
    Ok(())
}

fn respond(tokens: &TokenService, user: &User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        token: tokens.issue(user.id, &user.username)?,
        expires_in: tokens.ttl_seconds(),
        user: AccountView::from(user),
    })
}

/// Creates an account and signs the new user in
pub async fn register(
    users: &dyn UserRepository,
    hasher: &PasswordHasher,
    tokens: &TokenService,
    request: RegisterRequest,
) -> AppResult<AuthResponse> {
    let username = request.username.trim().to_string();
    validate_username(&username)?;
    let email = normalize_email(&request.email)?;
    validate_password(&request.password)?;

    if users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    if users.find_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = hasher.hash(&request.password).await?;
    let user = User::new(username, email, password_hash);
    users.insert(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    respond(tokens, &user)
}

/// Exchanges credentials for a session token
pub async fn login(
    users: &dyn UserRepository,
    hasher: &PasswordHasher,
    tokens: &TokenService,
    request: LoginRequest,
) -> AppResult<AuthResponse> {
    let email = request.email.trim().to_lowercase();

    let Some(user) = users.find_by_email(&email).await? else {
        tracing::info!("Login attempt for unknown email");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    if !hasher.verify(&request.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "Login attempt with wrong password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    respond(tokens, &user)
}

pub async fn account(users: &dyn UserRepository, user_id: ObjectId) -> AppResult<AccountView> {
    users
        .find_by_id(user_id)
        .await?
        .map(|u| AccountView::from(&u))
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
