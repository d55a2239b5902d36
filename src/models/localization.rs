//! Languages and per-section heading bundles.
//!
//! A heading entry holds the display strings of one section, for one page
//! archetype, in one language. The frontend asks for a section in a language
//! and receives all three archetypes at once:
//!
//! ```json
//! { "home": [..], "page": [..], "detailPage": { "navbar": [..], "headings": [..] } }
//! ```

use serde::{Deserialize, Serialize};

use super::{require_text, Document, ValidationError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Language {
    pub name: String,
    pub short_code: String,
    pub is_default: bool,
}

impl Document for Language {
    const COLLECTION: &'static str = "languages";
    const ENTITY: &'static str = "Language";

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.short_code = self.short_code.trim().to_ascii_uppercase();
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("shortCode", &self.short_code)?;
        let len = self.short_code.len();
        if !(2..=5).contains(&len) || !self.short_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError(format!(
                "shortCode must be 2 to 5 letters, got '{}'",
                self.short_code
            )));
        }
        Ok(())
    }

    fn language(&self) -> Option<&str> {
        Some(&self.short_code)
    }
}

/// Page archetype a heading entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageType {
    Home,
    Page,
    DetailPage,
}

impl PageType {
    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Home => "home",
            PageType::Page => "page",
            PageType::DetailPage => "detailPage",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeadingText {
    pub heading: String,
    pub subheading: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingEntry {
    pub section: String,
    pub page_type: PageType,
    pub language: String,
    #[serde(default)]
    pub headings: Vec<HeadingText>,
    /// Tab labels, only meaningful for `detailPage` entries.
    #[serde(default)]
    pub navbar: Vec<String>,
}

impl Document for HeadingEntry {
    const COLLECTION: &'static str = "headings";
    const ENTITY: &'static str = "Heading";

    fn normalize(&mut self) {
        self.section = self.section.trim().to_string();
        self.language = self.language.trim().to_string();
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("section", &self.section)?;
        require_text("language", &self.language)?;
        if self.page_type != PageType::DetailPage && !self.navbar.is_empty() {
            return Err(ValidationError(
                "navbar is only allowed on detailPage headings".into(),
            ));
        }
        Ok(())
    }

    fn language(&self) -> Option<&str> {
        Some(&self.language)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailPageHeadings {
    pub navbar: Vec<String>,
    pub headings: Vec<HeadingText>,
}

/// Every heading variant of one section in one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingBundle {
    pub home: Vec<HeadingText>,
    pub page: Vec<HeadingText>,
    pub detail_page: DetailPageHeadings,
}

impl HeadingBundle {
    /// Fold entries (already in creation order) into one bundle.
    pub fn assemble<'a>(entries: impl IntoIterator<Item = &'a HeadingEntry>) -> Self {
        let mut bundle = HeadingBundle::default();
        for entry in entries {
            match entry.page_type {
                PageType::Home => bundle.home.extend(entry.headings.iter().cloned()),
                PageType::Page => bundle.page.extend(entry.headings.iter().cloned()),
                PageType::DetailPage => {
                    bundle.detail_page.navbar.extend(entry.navbar.iter().cloned());
                    bundle
                        .detail_page
                        .headings
                        .extend(entry.headings.iter().cloned());
                }
            }
        }
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(heading: &str) -> HeadingText {
        HeadingText {
            heading: heading.into(),
            ..Default::default()
        }
    }

    fn entry(page_type: PageType, headings: &[&str], navbar: &[&str]) -> HeadingEntry {
        HeadingEntry {
            section: "hospital".into(),
            page_type,
            language: "EN".into(),
            headings: headings.iter().map(|h| text(h)).collect(),
            navbar: navbar.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn bundle_groups_by_page_type() {
        let entries = vec![
            entry(PageType::Home, &["Top Hospitals"], &[]),
            entry(PageType::Page, &["All Hospitals"], &[]),
            entry(PageType::DetailPage, &["Overview"], &["Overview", "Doctors"]),
        ];
        let bundle = HeadingBundle::assemble(&entries);
        assert_eq!(bundle.home, vec![text("Top Hospitals")]);
        assert_eq!(bundle.page, vec![text("All Hospitals")]);
        assert_eq!(bundle.detail_page.navbar, vec!["Overview", "Doctors"]);
        assert_eq!(bundle.detail_page.headings, vec![text("Overview")]);
    }

    #[test]
    fn bundle_serializes_with_detail_page_key() {
        let bundle = HeadingBundle::assemble(&[entry(PageType::Home, &["Hi"], &[])]);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["home"][0]["heading"], "Hi");
        assert!(json["detailPage"]["navbar"].is_array());
        assert!(json["page"].as_array().unwrap().is_empty());
    }

    #[test]
    fn page_type_wire_names() {
        let parsed: PageType = serde_json::from_str("\"detailPage\"").unwrap();
        assert_eq!(parsed, PageType::DetailPage);
        assert_eq!(PageType::DetailPage.as_str(), "detailPage");
        assert!(serde_json::from_str::<PageType>("\"detail_page\"").is_err());
    }

    #[test]
    fn navbar_only_on_detail_pages() {
        let bad = entry(PageType::Home, &[], &["Tab"]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn language_code_normalized_and_checked() {
        let mut lang = Language {
            name: "Türkçe".into(),
            short_code: " tr ".into(),
            is_default: false,
        };
        lang.normalize();
        assert_eq!(lang.short_code, "TR");
        assert!(lang.validate().is_ok());

        lang.short_code = "E".into();
        assert!(lang.validate().is_err());
    }
}
