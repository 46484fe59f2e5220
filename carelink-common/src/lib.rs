//! # CareLink Common Library
//!
//! Shared code for the CareLink services and tools:
//! - Error and result types
//! - Bootstrap configuration loading (TOML + environment)
//! - Tracing initialisation
//! - Account and child record models
//! - Child record normalization
//! - Onboarding form validation
//! - Document store port used by the passthrough API

pub mod children;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod validation;

pub use children::{
    is_truthy, normalize, normalize_value, upgrade, upgrade_value, ChildRecord, SpecialDetails,
    StructuredNotes,
};
pub use error::{Error, Result};
pub use models::{Role, UserRecord};
pub use store::{Collection, DocumentStore};
