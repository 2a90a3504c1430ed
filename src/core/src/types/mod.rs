//! Shared types for the dirgate authorization service

pub mod auth;
pub mod directory;

// Re-export commonly used types
pub use auth::{EffectiveAuth, InternalSession, Source};
pub use directory::{AttributeValue, DirectoryProfile, DirectoryRecord};
