use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::jwt::{JwtKeys, TokenError};
use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::users::repo::{NewUser, User, UsersRepo};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug)]
pub struct AuthOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

fn issue_pair(keys: &JwtKeys, user: User) -> Result<AuthOutcome, ApiError> {
    let access_token = keys.sign_access(user.id, &user.email)?;
    let refresh_token = keys.sign_refresh(user.id, &user.email)?;
    Ok(AuthOutcome {
        access_token,
        refresh_token,
        user,
    })
}

/// A registration racing past the email pre-check still hits the unique
/// constraint on `users.email`; surface that as the same conflict.
fn map_create_error(err: anyhow::Error) -> ApiError {
    if let Some(sqlx::Error::Database(db)) = err.downcast_ref::<sqlx::Error>() {
        if db.is_unique_violation() {
            return ApiError::UserAlreadyExists;
        }
    }
    ApiError::Internal(err)
}

/// Creates the user with a normalized email and hashed password, then signs
/// a token pair.
pub async fn register(
    users: &dyn UsersRepo,
    keys: &JwtKeys,
    email: &str,
    name: &str,
    password: &str,
) -> Result<AuthOutcome, ApiError> {
    let email = email.trim().to_lowercase();
    let password_hash = hash_password(password)?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::UserAlreadyExists);
    }

    let user = users
        .create(NewUser {
            email,
            name: name.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(map_create_error)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_pair(keys, user)
}

/// Unknown email and wrong password collapse into the same error so the
/// response never reveals whether an account exists.
pub async fn authenticate(
    users: &dyn UsersRepo,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<AuthOutcome, ApiError> {
    let email = email.trim().to_lowercase();

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    issue_pair(keys, user)
}

/// Exchanges a valid refresh token for a fresh pair.
pub async fn refresh(
    users: &dyn UsersRepo,
    keys: &JwtKeys,
    refresh_token: &str,
) -> Result<AuthOutcome, ApiError> {
    let claims = keys.verify_refresh(refresh_token).map_err(ApiError::from)?;
    let user = users
        .find_by_id(claims.sub)
        .await?
        .ok_or(ApiError::from(TokenError::InvalidSignature))?;
    issue_pair(keys, user)
}
