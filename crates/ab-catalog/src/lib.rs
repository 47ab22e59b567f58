//! # ab-catalog
//!
//! Static reference data for people preparing to move abroad: visa
//! requirements and embassy contacts, starter language decks, sample
//! accommodation listings and institutions.

pub mod catalog;
pub mod error;
pub mod models;

pub use catalog::{JsonCatalog, ReferenceCatalog};
pub use error::CatalogError;
pub use models::*;
