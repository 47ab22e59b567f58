//! abroad/crates/ab-core/src/lib.rs
//!
//! The central domain types and interface definitions for abroad.

pub mod clock;
pub mod error;
pub mod facade;
pub mod models;
pub mod query;
pub mod schema;
pub mod traits;

// Re-exporting for easier access in other crates
pub use clock::*;
pub use error::*;
pub use facade::*;
pub use models::*;
pub use query::*;
pub use schema::*;
pub use traits::*;
