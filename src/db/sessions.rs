//! Bearer-token sessions for patients and admins.
//!
//! Only the SHA-256 digest of a token is stored; the raw token exists
//! in the response that issued it and in the client's storage.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Patient,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Role::Patient),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub subject_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub fn create_session(
    conn: &Connection,
    token_hash: &str,
    subject_id: &str,
    role: Role,
    ttl: Duration,
) -> Result<Session, DatabaseError> {
    let created_at = Utc::now();
    let expires_at = created_at + ttl;
    conn.execute(
        "INSERT INTO sessions (token_hash, subject_id, role, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            token_hash,
            subject_id,
            role.as_str(),
            created_at.to_rfc3339(),
            expires_at.to_rfc3339(),
        ],
    )?;
    Ok(Session {
        subject_id: subject_id.to_string(),
        role,
        created_at,
        expires_at,
    })
}

/// Look up a session by token digest. Expired sessions are returned as-is;
/// callers decide how to report them.
pub fn find_session(conn: &Connection, token_hash: &str) -> Result<Option<Session>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT subject_id, role, created_at, expires_at FROM sessions WHERE token_hash = ?1",
            params![token_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((subject_id, role, created_at, expires_at)) = row else {
        return Ok(None);
    };

    let role = Role::from_str(&role).ok_or_else(|| {
        DatabaseError::CorruptDocument(format!("unknown session role '{role}'"))
    })?;

    Ok(Some(Session {
        subject_id,
        role,
        created_at: parse_time(&created_at)?,
        expires_at: parse_time(&expires_at)?,
    }))
}

pub fn revoke_session(conn: &Connection, token_hash: &str) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM sessions WHERE token_hash = ?1", params![token_hash])?;
    Ok(affected > 0)
}

/// Revoke every session of a subject except `keep` (if given).
pub fn revoke_subject_sessions(
    conn: &Connection,
    subject_id: &str,
    role: Role,
    keep: Option<&str>,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM sessions WHERE subject_id = ?1 AND role = ?2 AND token_hash != ?3",
        params![subject_id, role.as_str(), keep.unwrap_or("")],
    )?;
    Ok(affected)
}

pub fn purge_expired(conn: &Connection) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![Utc::now().to_rfc3339()],
    )?;
    Ok(affected)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptDocument(format!("session timestamp '{raw}': {e}")))
}
