//! # Reference Catalog
//!
//! Read-only lookup service over the static relocation data. Callers hold a
//! `dyn ReferenceCatalog` so tests and alternative data sources can be swapped in.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::CatalogError;
use crate::models::{
    EmbassyContact, Institution, InstitutionFilter, LanguageDeck, Property, PropertyFilter,
    VisaInfo,
};

const BUNDLED: &str = include_str!("../data/catalog.json");

pub trait ReferenceCatalog: Send + Sync {
    fn visa(&self, country: &str) -> Option<&VisaInfo>;

    fn embassy(&self, country: &str) -> Option<&EmbassyContact> {
        self.visa(country).map(|v| &v.embassy)
    }

    /// Embassy for a free-form profile location such as "Japan" or " korea ".
    fn embassy_for_location(&self, location: &str) -> Option<&EmbassyContact> {
        self.embassy(location.trim())
    }

    /// Country keys with visa data, sorted.
    fn countries(&self) -> Vec<&str>;

    /// Deck for the primary language of `country`, falling back to the
    /// default deck for unmapped countries.
    fn language_for_country(&self, country: &str) -> &LanguageDeck;

    fn language(&self, key: &str) -> Option<&LanguageDeck>;

    /// Listings in `city` (case-insensitive key) that pass `filter`.
    fn properties(&self, city: &str, filter: &PropertyFilter) -> Vec<&Property>;

    fn institutions(&self, filter: &InstitutionFilter) -> Vec<&Institution>;
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    visas: BTreeMap<String, VisaInfo>,
    languages: HashMap<String, LanguageDeck>,
    country_languages: HashMap<String, String>,
    default_language: String,
    #[serde(default)]
    properties: HashMap<String, Vec<Property>>,
    #[serde(default)]
    institutions: Vec<Institution>,
}

/// Catalog deserialized from a JSON document.
#[derive(Debug)]
pub struct JsonCatalog {
    doc: CatalogDocument,
}

fn key(s: &str) -> String {
    s.trim().to_lowercase()
}

fn rekey<V>(map: impl IntoIterator<Item = (String, V)>) -> impl Iterator<Item = (String, V)> {
    map.into_iter().map(|(k, v)| (key(&k), v))
}

impl JsonCatalog {
    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: CatalogDocument = serde_json::from_str(json)?;
        let doc = CatalogDocument {
            visas: rekey(raw.visas).collect(),
            languages: rekey(raw.languages).collect(),
            country_languages: rekey(raw.country_languages)
                .map(|(k, v)| (k, key(&v)))
                .collect(),
            default_language: key(&raw.default_language),
            properties: rekey(raw.properties).collect(),
            institutions: raw.institutions,
        };

        // Every language reference must resolve so lookups never dangle.
        let referenced = doc
            .country_languages
            .values()
            .chain(std::iter::once(&doc.default_language));
        for lang in referenced {
            if !doc.languages.contains_key(lang) {
                return Err(CatalogError::UnknownLanguage(lang.clone()));
            }
        }
        Ok(Self { doc })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), countries = catalog.doc.visas.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Loads `path` when given, else the bundled catalog.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::bundled(),
        }
    }

    fn default_deck(&self) -> &LanguageDeck {
        // Checked in from_json.
        &self.doc.languages[&self.doc.default_language]
    }
}

impl ReferenceCatalog for JsonCatalog {
    fn visa(&self, country: &str) -> Option<&VisaInfo> {
        self.doc.visas.get(&key(country))
    }

    fn countries(&self) -> Vec<&str> {
        self.doc.visas.keys().map(String::as_str).collect()
    }

    fn language_for_country(&self, country: &str) -> &LanguageDeck {
        self.doc
            .country_languages
            .get(&key(country))
            .and_then(|lang| self.doc.languages.get(lang))
            .unwrap_or_else(|| self.default_deck())
    }

    fn language(&self, name: &str) -> Option<&LanguageDeck> {
        self.doc.languages.get(&key(name))
    }

    fn properties(&self, city: &str, filter: &PropertyFilter) -> Vec<&Property> {
        self.doc
            .properties
            .get(&key(city))
            .map(|listings| listings.iter().filter(|p| filter.matches(p)).collect())
            .unwrap_or_default()
    }

    fn institutions(&self, filter: &InstitutionFilter) -> Vec<&Institution> {
        self.doc
            .institutions
            .iter()
            .filter(|i| filter.matches(i))
            .collect()
    }
}
