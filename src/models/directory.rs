use serde::{Deserialize, Serialize};

use super::{
    check_cost_range, ensure_slug, normalize_language, require_text, Document, ValidationError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hospital {
    pub name: String,
    pub country: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f32>,
    pub specialties: Vec<String>,
    pub accreditations: Vec<String>,
    pub beds: Option<u32>,
    pub established: Option<u16>,
    pub language: Option<String>,
    pub slug: Option<String>,
}

impl Document for Hospital {
    const COLLECTION: &'static str = "hospitals";
    const ENTITY: &'static str = "Hospital";

    fn normalize(&mut self) {
        self.country = self.country.trim().to_string();
        normalize_language(&mut self.language);
        ensure_slug(&mut self.slug, &self.name);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("country", &self.country)?;
        if self.rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
            return Err(ValidationError("rating must be between 0 and 5".into()));
        }
        Ok(())
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Doctor {
    pub name: String,
    pub specialty: String,
    pub hospital_id: Option<String>,
    pub qualifications: Vec<String>,
    pub experience_years: Option<u16>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub languages_spoken: Vec<String>,
    pub language: Option<String>,
    pub slug: Option<String>,
}

impl Document for Doctor {
    const COLLECTION: &'static str = "doctors";
    const ENTITY: &'static str = "Doctor";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
        ensure_slug(&mut self.slug, &self.name);
        if self.hospital_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            self.hospital_id = None;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("specialty", &self.specialty)
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Treatment {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cost_from: Option<f64>,
    pub cost_to: Option<f64>,
    pub currency: Option<String>,
    pub duration_days: Option<u32>,
    pub recovery_days: Option<u32>,
    pub image: Option<String>,
    pub language: Option<String>,
    pub slug: Option<String>,
}

impl Document for Treatment {
    const COLLECTION: &'static str = "treatments";
    const ENTITY: &'static str = "Treatment";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
        ensure_slug(&mut self.slug, &self.name);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        check_cost_range(self.cost_from, self.cost_to)
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

/// A doctor offers a treatment, optionally at a quoted cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorTreatment {
    pub doctor_id: String,
    pub treatment_id: String,
    pub cost: Option<f64>,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

impl Document for DoctorTreatment {
    const COLLECTION: &'static str = "doctortreatments";
    const ENTITY: &'static str = "Doctor treatment";

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("doctorId", &self.doctor_id)?;
        require_text("treatmentId", &self.treatment_id)?;
        check_cost_range(self.cost, None)
    }
}

/// A hospital offers a treatment, optionally at a quoted cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HospitalTreatment {
    pub hospital_id: String,
    pub treatment_id: String,
    pub cost: Option<f64>,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

impl Document for HospitalTreatment {
    const COLLECTION: &'static str = "hospitaltreatments";
    const ENTITY: &'static str = "Hospital treatment";

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("hospitalId", &self.hospital_id)?;
        require_text("treatmentId", &self.treatment_id)?;
        check_cost_range(self.cost, None)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcedureCost {
    pub procedure: String,
    pub country: Option<String>,
    pub cost_from: Option<f64>,
    pub cost_to: Option<f64>,
    pub currency: Option<String>,
    pub language: Option<String>,
}

impl Document for ProcedureCost {
    const COLLECTION: &'static str = "procedurecosts";
    const ENTITY: &'static str = "Procedure cost";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("procedure", &self.procedure)?;
        check_cost_range(self.cost_from, self.cost_to)
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}
