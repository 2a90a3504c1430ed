//! # dirgate-core
//!
//! Shared types, traits, and configuration for the dirgate authorization
//! service. This package breaks circular dependencies between the evaluation
//! engine and the HTTP layer.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use error::{ConfigError, Result};
pub use traits::{DirectoryError, DirectoryFetcher};
pub use types::{AttributeValue, DirectoryRecord, EffectiveAuth, InternalSession, Source};

/// Canonical cache/session key for a principal (lowercase email)
pub type PrincipalKey = String;
