use serde::{Deserialize, Serialize};

use super::{check_email, require_text, Document, ValidationError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// A consultation request, from a visitor or a logged-in patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Booking {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub hospital_id: Option<String>,
    pub doctor_id: Option<String>,
    pub treatment_id: Option<String>,
    pub preferred_date: Option<String>,
    pub message: Option<String>,
    pub status: BookingStatus,
    pub patient_id: Option<String>,
}

impl Document for Booking {
    const COLLECTION: &'static str = "bookings";
    const ENTITY: &'static str = "Booking";

    fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        for id in [&mut self.hospital_id, &mut self.doctor_id, &mut self.treatment_id] {
            if id.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *id = None;
            }
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        check_email(&self.email)?;
        if let Some(date) = self.preferred_date.as_deref() {
            if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(ValidationError(
                    "Invalid preferredDate format (expected YYYY-MM-DD)".into(),
                ));
            }
        }
        Ok(())
    }
}
