//! Document models for every collection in the directory.
//!
//! Each model is a plain serde struct bound to one collection through the
//! [`Document`] trait. Bodies are stored as camelCase JSON, so the shapes
//! below are also the wire shapes clients send and receive.

pub mod account;
pub mod booking;
pub mod content;
pub mod directory;
pub mod localization;

pub use account::*;
pub use booking::*;
pub use content::*;
pub use directory::*;
pub use localization::*;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A document failed its model rules. The message is client-facing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// A schema-bound collection member.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name in the document store.
    const COLLECTION: &'static str;
    /// Singular name for messages ("Hospital not found").
    const ENTITY: &'static str;

    /// Fill derived fields (slugs, normalized codes) before validation.
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Language code indexed for per-language listing.
    fn language(&self) -> Option<&str> {
        None
    }

    /// Slug indexed for `/slug/:slug` lookups.
    fn slug(&self) -> Option<&str> {
        None
    }
}

/// A document as persisted: store-assigned id and timestamps around the body.
///
/// Serializes flat, `{ "_id": .., ...body, "createdAt": .., "updatedAt": .. }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub body: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every collection name the store knows about, in display order.
pub const COLLECTIONS: &[&str] = &[
    About::COLLECTION,
    AdminContent::COLLECTION,
    Admin::COLLECTION,
    Assistance::COLLECTION,
    Blog::COLLECTION,
    Booking::COLLECTION,
    DoctorTreatment::COLLECTION,
    Doctor::COLLECTION,
    Faq::COLLECTION,
    HeadingEntry::COLLECTION,
    HospitalTreatment::COLLECTION,
    Hospital::COLLECTION,
    Language::COLLECTION,
    PatientOpinion::COLLECTION,
    Patient::COLLECTION,
    ProcedureCost::COLLECTION,
    Service::COLLECTION,
    Treatment::COLLECTION,
];

// ── Validation helpers ──────────────────────────────────────

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn check_email(value: &str) -> Result<(), ValidationError> {
    require_text("email", value)?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(ValidationError(format!("Invalid email address: {value}")));
    }
    Ok(())
}

pub(crate) fn check_cost_range(from: Option<f64>, to: Option<f64>) -> Result<(), ValidationError> {
    if from.is_some_and(|v| v < 0.0) || to.is_some_and(|v| v < 0.0) {
        return Err(ValidationError("Costs cannot be negative".into()));
    }
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError("costFrom cannot exceed costTo".into()));
        }
    }
    Ok(())
}

/// Normalize an optional language code: trimmed, empty becomes `None`.
pub(crate) fn normalize_language(language: &mut Option<String>) {
    if let Some(code) = language.as_mut() {
        *code = code.trim().to_string();
    }
    if language.as_deref().is_some_and(str::is_empty) {
        *language = None;
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
///
/// "St. Mary's Hospital" becomes "st-mary-s-hospital".
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Keep an explicit slug (re-slugified) or derive one from `source`.
pub(crate) fn ensure_slug(slug: &mut Option<String>, source: &str) {
    let derived = match slug.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => slugify(explicit),
        _ => slugify(source),
    };
    *slug = if derived.is_empty() { None } else { Some(derived) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("St. Mary's Hospital"), "st-mary-s-hospital");
        assert_eq!(slugify("  Knee -- Replacement  "), "knee-replacement");
        assert_eq!(slugify("Ünïcode only"), "n-code-only");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn ensure_slug_prefers_explicit_value() {
        let mut slug = Some("My Custom Slug".to_string());
        ensure_slug(&mut slug, "Ignored");
        assert_eq!(slug.as_deref(), Some("my-custom-slug"));

        let mut derived = None;
        ensure_slug(&mut derived, "Hip Surgery");
        assert_eq!(derived.as_deref(), Some("hip-surgery"));

        let mut empty = Some("  ".to_string());
        ensure_slug(&mut empty, "!!");
        assert_eq!(empty, None);
    }

    #[test]
    fn email_check_requires_domain() {
        assert!(check_email("a@b.com").is_ok());
        assert!(check_email("a@b").is_err());
        assert!(check_email("@b.com").is_err());
        assert!(check_email("").is_err());
    }

    #[test]
    fn cost_range_rejects_inverted_bounds() {
        assert!(check_cost_range(Some(10.0), Some(20.0)).is_ok());
        assert!(check_cost_range(Some(30.0), Some(20.0)).is_err());
        assert!(check_cost_range(Some(-1.0), None).is_err());
        assert!(check_cost_range(None, None).is_ok());
    }

    #[test]
    fn blank_language_becomes_none() {
        let mut lang = Some("  ".to_string());
        normalize_language(&mut lang);
        assert_eq!(lang, None);

        let mut lang = Some(" EN ".to_string());
        normalize_language(&mut lang);
        assert_eq!(lang.as_deref(), Some("EN"));
    }

    #[test]
    fn collections_are_unique() {
        let mut names = COLLECTIONS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COLLECTIONS.len());
    }
}
