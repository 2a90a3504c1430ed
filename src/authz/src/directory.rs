//! Fixture-backed directory fetcher
//!
//! The production deployment plugs a real directory client into the
//! [`DirectoryFetcher`] seam. This implementation serves records from a JSON
//! document keyed by email, for tests and local/dev deployments.

use async_trait::async_trait;
use dirgate_core::error::ConfigError;
use dirgate_core::traits::{DirectoryError, DirectoryFetcher};
use dirgate_core::types::DirectoryRecord;
use std::collections::HashMap;
use std::path::Path;

/// In-memory directory keyed by lowercase email
pub struct StaticDirectoryFetcher {
    records: HashMap<String, DirectoryRecord>,
}

impl StaticDirectoryFetcher {
    pub fn new(records: HashMap<String, DirectoryRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|(key, record)| (key.trim().to_lowercase(), record))
            .collect();
        Self { records }
    }

    /// Parse a JSON object of `email -> record`
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let records: HashMap<String, DirectoryRecord> = serde_json::from_str(raw)
            .map_err(|e| ConfigError::invalid("directory fixture", e.to_string()))?;
        Ok(Self::new(records))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DirectoryFetcher for StaticDirectoryFetcher {
    async fn fetch(&self, principal: &str) -> Result<DirectoryRecord, DirectoryError> {
        self.records
            .get(&principal.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| DirectoryError::Fatal(format!("unknown principal {}", principal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "Alice@Example.com": {
            "profile": {"primary_email": "alice@example.com"},
            "attributes": {
                "UserFunctions": "Inventory:Read\nOrders:List",
                "DepartmentManager": "yes",
                "HomeDepartment": "Warehouse"
            },
            "groups": ["warehouse@example.com"]
        }
    }"#;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let fetcher = StaticDirectoryFetcher::from_json(FIXTURE).unwrap();
        assert_eq!(fetcher.len(), 1);

        let record = fetcher.fetch("ALICE@example.COM").await.unwrap();
        assert_eq!(record.profile.primary_email, "alice@example.com");
        assert_eq!(record.groups, vec!["warehouse@example.com"]);
    }

    #[tokio::test]
    async fn test_unknown_principal_is_fatal() {
        let fetcher = StaticDirectoryFetcher::from_json(FIXTURE).unwrap();
        let err = fetcher.fetch("bob@example.com").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Fatal(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_fixture_fails_load() {
        assert!(StaticDirectoryFetcher::from_json("[]").is_err());
        assert!(StaticDirectoryFetcher::from_json("{bad json").is_err());
    }
}
