//! Reference records shown on the pre-departure pages. All of it is static
//! data shipped with the application; nothing here is per-user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaRequirement {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbassyContact {
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub emergency_contact: String,
    pub working_hours: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaInfo {
    /// Display name, e.g. "South Korea"
    pub country: String,
    pub processing_time: String,
    pub fee: String,
    pub requirements: Vec<VisaRequirement>,
    /// Application steps in the order they are carried out
    pub steps: Vec<String>,
    pub embassy: EmbassyContact,
}

impl VisaInfo {
    pub fn mandatory_requirements(&self) -> impl Iterator<Item = &VisaRequirement> {
        self.requirements.iter().filter(|r| r.required)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct: String,
}

impl QuizQuestion {
    /// Exact match against the correct option.
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct == answer
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDeck {
    pub name: String,
    /// ISO 639-1 code
    pub code: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Apartment,
    House,
    Dormitory,
    Shared,
}

/// Monthly rent band, in the listing's own currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBand {
    /// below 70 000
    Low,
    /// 70 000 up to (not including) 100 000
    Medium,
    /// 100 000 and above
    High,
}

impl PriceBand {
    pub fn of(price: u64) -> Self {
        match price {
            p if p < 70_000 => PriceBand::Low,
            p if p < 100_000 => PriceBand::Medium,
            _ => PriceBand::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub kind: PropertyKind,
    pub title: String,
    pub location: String,
    pub price: u64,
    pub currency: String,
    pub image_url: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub amenities: Vec<String>,
    pub available: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    pub kind: Option<PropertyKind>,
    pub price: Option<PriceBand>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        self.kind.is_none_or(|k| k == property.kind)
            && self.price.is_none_or(|b| b == PriceBand::of(property.price))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionKind {
    University,
    Company,
    Research,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstitutionDetails {
    #[serde(default)]
    pub established: Option<String>,
    #[serde(default)]
    pub ranking: Option<String>,
    #[serde(default)]
    pub employees: Option<String>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub kind: InstitutionKind,
    pub location: String,
    pub website: String,
    pub description: String,
    pub image_url: String,
    #[serde(default)]
    pub details: InstitutionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstitutionFilter {
    /// Case-insensitive substring of the name or location; empty matches all
    pub search: String,
    pub kind: Option<InstitutionKind>,
}

impl InstitutionFilter {
    pub fn matches(&self, institution: &Institution) -> bool {
        let needle = self.search.to_lowercase();
        let text_hit = institution.name.to_lowercase().contains(&needle)
            || institution.location.to_lowercase().contains(&needle);
        text_hit && self.kind.is_none_or(|k| k == institution.kind)
    }
}
