//! Credentials and bearer tokens for patients and admins.
//!
//! Passwords are stored as salted PBKDF2-SHA256 strings. Tokens are
//! random 32-byte values handed to the client once; the session table
//! keeps only their SHA-256 digest.

pub mod password;
pub mod throttle;

pub use password::{check_password_strength, hash_password, verify_password};
pub use throttle::LoginThrottle;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::Config;
use crate::db::sessions::{self, Role, Session};
use crate::db::store;
use crate::db::DatabaseError;
use crate::models::{normalize_email, Admin, Stored};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Authentication required")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("Stored password hash is malformed")]
    MalformedHash,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of a bearer token, as stored in the session table.
pub fn hash_token(token: &str) -> String {
    let digest: [u8; 32] = Sha256::digest(token.as_bytes()).into();
    URL_SAFE_NO_PAD.encode(digest)
}

/// Create a session and return the raw token for the client.
pub fn issue_token(
    conn: &Connection,
    subject_id: &str,
    role: Role,
    ttl_hours: i64,
) -> Result<String, AuthError> {
    let token = generate_token();
    sessions::create_session(
        conn,
        &hash_token(&token),
        subject_id,
        role,
        Duration::hours(ttl_hours),
    )?;
    Ok(token)
}

/// Resolve a bearer token to its live session. Expired sessions are
/// deleted on sight.
pub fn resolve_token(conn: &Connection, token: &str) -> Result<Session, AuthError> {
    let digest = hash_token(token);
    let session = sessions::find_session(conn, &digest)?.ok_or(AuthError::InvalidToken)?;
    if session.is_expired(Utc::now()) {
        sessions::revoke_session(conn, &digest)?;
        return Err(AuthError::TokenExpired);
    }
    Ok(session)
}

pub fn revoke_token(conn: &Connection, token: &str) -> Result<bool, AuthError> {
    Ok(sessions::revoke_session(conn, &hash_token(token))?)
}

/// Create the bootstrap admin from `ADMIN_EMAIL`/`ADMIN_PASSWORD` when
/// both are set and no admin with that email exists yet.
pub fn seed_admin(conn: &Connection, config: &Config) -> Result<Option<Stored<Admin>>, AuthError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(None);
    };

    let email = normalize_email(email);
    if store::find_one_by_field::<Admin>(conn, "email", &email)?.is_some() {
        tracing::debug!("Bootstrap admin already present");
        return Ok(None);
    }
    check_password_strength(password)?;

    let admin = store::insert(
        conn,
        Admin {
            name: "Administrator".into(),
            email,
            password_hash: hash_password(password, config.password_iterations),
        },
    )?;
    tracing::info!(admin_id = %admin.id, "Bootstrap admin created");
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn token_hash_is_stable_and_distinct_from_token() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_ne!(generate_token(), token);
    }

    #[test]
    fn issued_token_resolves_to_subject() {
        let conn = open_memory_database().unwrap();
        let token = issue_token(&conn, "patient-1", Role::Patient, 1).unwrap();
        let session = resolve_token(&conn, &token).unwrap();
        assert_eq!(session.subject_id, "patient-1");
        assert_eq!(session.role, Role::Patient);
    }

    #[test]
    fn unknown_and_revoked_tokens_rejected() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(resolve_token(&conn, "nope"), Err(AuthError::InvalidToken)));

        let token = issue_token(&conn, "a", Role::Admin, 1).unwrap();
        assert!(revoke_token(&conn, &token).unwrap());
        assert!(matches!(resolve_token(&conn, &token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_reported_then_removed() {
        let conn = open_memory_database().unwrap();
        let token = issue_token(&conn, "a", Role::Patient, -1).unwrap();
        assert!(matches!(resolve_token(&conn, &token), Err(AuthError::TokenExpired)));
        assert!(matches!(resolve_token(&conn, &token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn seed_admin_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path());
        let conn = open_memory_database().unwrap();

        assert!(seed_admin(&conn, &config).unwrap().is_none());

        config.admin_email = Some("Root@Example.com".into());
        config.admin_password = Some("super-secret".into());
        let admin = seed_admin(&conn, &config).unwrap().unwrap();
        assert_eq!(admin.body.email, "root@example.com");
        assert!(verify_password("super-secret", &admin.body.password_hash).unwrap());

        assert!(seed_admin(&conn, &config).unwrap().is_none());
    }

    #[test]
    fn seed_admin_rejects_weak_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path());
        config.admin_email = Some("root@example.com".into());
        config.admin_password = Some("short".into());
        let conn = open_memory_database().unwrap();
        assert!(matches!(seed_admin(&conn, &config), Err(AuthError::WeakPassword(8))));
    }
}
