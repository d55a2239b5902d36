use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_email, require_text, Document, Stored, ValidationError};

/// Stored patient account. `password_hash` never leaves the server;
/// clients only ever see [`PatientProfile`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub password_hash: String,
}

impl Document for Patient {
    const COLLECTION: &'static str = "patients";
    const ENTITY: &'static str = "Patient";

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        check_email(&self.email)?;
        require_text("password", &self.password_hash)?;
        if let Some(dob) = self.date_of_birth.as_deref() {
            if chrono::NaiveDate::parse_from_str(dob, "%Y-%m-%d").is_err() {
                return Err(ValidationError(
                    "Invalid dateOfBirth format (expected YYYY-MM-DD)".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Stored<Patient>> for PatientProfile {
    fn from(stored: &Stored<Patient>) -> Self {
        let p = &stored.body;
        Self {
            id: stored.id.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            country: p.country.clone(),
            date_of_birth: p.date_of_birth.clone(),
            gender: p.gender.clone(),
            created_at: stored.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Admin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl Document for Admin {
    const COLLECTION: &'static str = "admins";
    const ENTITY: &'static str = "Admin";

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        check_email(&self.email)?;
        require_text("password", &self.password_hash)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Stored<Admin>> for AdminProfile {
    fn from(stored: &Stored<Admin>) -> Self {
        Self {
            id: stored.id.clone(),
            name: stored.body.name.clone(),
            email: stored.body.email.clone(),
            created_at: stored.created_at,
        }
    }
}

/// Emails are unique case-insensitively, so they are stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
