//! Login and password handling shared by patient and admin endpoints.

use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth;
use crate::db::sessions::Role;
use crate::db::{store, DatabaseError};
use crate::models::{normalize_email, Admin, Document, Patient, Stored};

/// A document that can log in.
pub trait Account: Document {
    const ROLE: Role;

    fn email(&self) -> &str;
    fn password_hash(&self) -> &str;
    fn set_password_hash(&mut self, hash: String);
}

impl Account for Patient {
    const ROLE: Role = Role::Patient;

    fn email(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }
}

impl Account for Admin {
    const ROLE: Role = Role::Admin;

    fn email(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// PBKDF2 off the async executor.
pub async fn hash_secret(password: &str, iterations: u32) -> Result<String, ApiError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || auth::hash_password(&password, iterations))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task: {e}")))
}

pub async fn verify_secret(password: &str, stored: &str) -> Result<bool, ApiError> {
    let (password, stored) = (password.to_string(), stored.to_string());
    tokio::task::spawn_blocking(move || auth::verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task: {e}")))?
        .map_err(ApiError::from)
}

/// 409 when an account of this kind already uses `email`.
pub fn ensure_email_free<A: Account>(ctx: &ApiContext, email: &str) -> Result<(), ApiError> {
    let conn = ctx.core.open_db()?;
    if store::find_one_by_field::<A>(&conn, "email", &normalize_email(email))?.is_some() {
        return Err(ApiError::Conflict("Email already registered".into()));
    }
    Ok(())
}

/// Insert a new account. The unique email index settles concurrent
/// registrations that both passed [`ensure_email_free`].
pub fn insert_account<A: Account>(ctx: &ApiContext, account: A) -> Result<Stored<A>, ApiError> {
    let conn = ctx.core.open_db()?;
    store::insert(&conn, account).map_err(|e| match e {
        DatabaseError::Duplicate { .. } => ApiError::Conflict("Email already registered".into()),
        other => other.into(),
    })
}

pub fn issue(ctx: &ApiContext, subject_id: &str, role: Role) -> Result<String, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(auth::issue_token(
        &conn,
        subject_id,
        role,
        ctx.core.config.token_ttl_hours,
    )?)
}

/// Check credentials under the login throttle and issue a token.
pub async fn login<A: Account>(
    ctx: &ApiContext,
    request: &LoginRequest,
) -> Result<(Stored<A>, String), ApiError> {
    let email = normalize_email(&request.email);
    let throttle_key = format!("{}:{email}", A::ROLE.as_str());
    ctx.check_login(&throttle_key)?;

    let account = {
        let conn = ctx.core.open_db()?;
        store::find_one_by_field::<A>(&conn, "email", &email)?
    };

    let verified = match &account {
        Some(account) if !request.password.is_empty() => {
            verify_secret(&request.password, account.body.password_hash()).await?
        }
        _ => false,
    };
    ctx.record_login(&throttle_key, verified);

    let account = match account {
        Some(account) if verified => account,
        _ => {
            tracing::info!(role = A::ROLE.as_str(), "Login rejected");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = issue(ctx, &account.id, A::ROLE)?;
    tracing::info!(role = A::ROLE.as_str(), subject_id = %account.id, "Login succeeded");
    Ok((account, token))
}

/// Replace the password of `subject_id` and revoke every other session.
pub async fn change_password<A: Account>(
    ctx: &ApiContext,
    subject_id: &str,
    current_token: &str,
    change: &PasswordChange,
) -> Result<(), ApiError> {
    auth::check_password_strength(&change.new_password)?;

    let account = {
        let conn = ctx.core.open_db()?;
        store::get_by_id::<A>(&conn, subject_id)?
    };
    if !verify_secret(&change.current_password, account.body.password_hash()).await? {
        return Err(ApiError::BadRequest("Current password is incorrect".into()));
    }

    let hash = hash_secret(&change.new_password, ctx.core.config.password_iterations).await?;
    let mut body = account.body;
    body.set_password_hash(hash);

    let conn = ctx.core.open_db()?;
    store::replace(&conn, subject_id, body)?;
    let revoked = crate::db::sessions::revoke_subject_sessions(
        &conn,
        subject_id,
        A::ROLE,
        Some(&auth::hash_token(current_token)),
    )?;
    tracing::info!(role = A::ROLE.as_str(), %subject_id, revoked, "Password changed");
    Ok(())
}

pub fn logout(ctx: &ApiContext, token: &str) -> Result<(), ApiError> {
    let conn = ctx.core.open_db()?;
    auth::revoke_token(&conn, token)?;
    Ok(())
}
