use serde::{Deserialize, Serialize};

use super::{ensure_slug, normalize_language, require_text, Document, ValidationError};

macro_rules! language_indexed {
    () => {
        fn language(&self) -> Option<&str> {
            self.language.as_deref()
        }
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct About {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub mission: Option<String>,
    pub vision: Option<String>,
    pub language: Option<String>,
}

impl Document for About {
    const COLLECTION: &'static str = "abouts";
    const ENTITY: &'static str = "About section";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }

    language_indexed!();
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub language: Option<String>,
}

impl Document for Service {
    const COLLECTION: &'static str = "services";
    const ENTITY: &'static str = "Service";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }

    language_indexed!();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Blog {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub language: Option<String>,
}

impl Default for Blog {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: None,
            content: String::new(),
            excerpt: None,
            author: None,
            image: None,
            tags: Vec::new(),
            published: true,
            language: None,
        }
    }
}

impl Document for Blog {
    const COLLECTION: &'static str = "blogs";
    const ENTITY: &'static str = "Blog";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
        ensure_slug(&mut self.slug, &self.title);
        self.tags.retain(|t| !t.trim().is_empty());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }

    language_indexed!();

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Faq {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub order: Option<i32>,
    pub language: Option<String>,
}

impl Document for Faq {
    const COLLECTION: &'static str = "faqs";
    const ENTITY: &'static str = "FAQ";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("question", &self.question)?;
        require_text("answer", &self.answer)
    }

    language_indexed!();
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientOpinion {
    pub name: String,
    pub opinion: String,
    pub country: Option<String>,
    pub rating: Option<u8>,
    pub treatment: Option<String>,
    pub image: Option<String>,
    pub language: Option<String>,
}

impl Document for PatientOpinion {
    const COLLECTION: &'static str = "patientopinions";
    const ENTITY: &'static str = "Patient opinion";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("opinion", &self.opinion)?;
        if self.rating.is_some_and(|r| !(1..=5).contains(&r)) {
            return Err(ValidationError("rating must be between 1 and 5".into()));
        }
        Ok(())
    }

    language_indexed!();
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assistance {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub language: Option<String>,
}

impl Document for Assistance {
    const COLLECTION: &'static str = "assistances";
    const ENTITY: &'static str = "Assistance item";

    fn normalize(&mut self) {
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }

    language_indexed!();
}

/// Free-form site content managed from the admin panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminContent {
    pub section: String,
    pub title: String,
    pub body: Option<String>,
    pub image: Option<String>,
    pub language: Option<String>,
}

impl Document for AdminContent {
    const COLLECTION: &'static str = "admincontents";
    const ENTITY: &'static str = "Content";

    fn normalize(&mut self) {
        self.section = self.section.trim().to_string();
        normalize_language(&mut self.language);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("section", &self.section)?;
        require_text("title", &self.title)
    }

    language_indexed!();
}
