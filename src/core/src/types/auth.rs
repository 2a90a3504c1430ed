//! Normalized authorization documents and internal sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a resolved `EffectiveAuth` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Served from a live cache entry
    Cache,
    /// Produced by an upstream refresh this request waited on
    Refreshed,
}

/// Normalized authorization document for one principal
///
/// `permissions` is a pure function of (`functions`,
/// `is_department_manager`, `home_department`, the configured derivation
/// rules): re-running the mapper on identical inputs yields an identical set.
/// `BTreeSet` keeps the serialized order stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAuth {
    /// Canonical lowercase identifier; also the cache key
    pub email: String,

    /// Home department attribute, when the directory carries one
    #[serde(default)]
    pub home_department: Option<String>,

    /// Department-manager flag
    #[serde(default)]
    pub is_department_manager: bool,

    /// Raw `"Module:Action"` declarations, upstream order and duplicates kept
    #[serde(default)]
    pub functions: Vec<String>,

    /// Normalized lowercase `"module:action"` permission set
    #[serde(default)]
    pub permissions: BTreeSet<String>,

    /// Group identifiers (emails) as returned upstream
    #[serde(default)]
    pub groups: BTreeSet<String>,

    /// Timestamp of the upstream fetch that produced this document
    pub fetched_at: DateTime<Utc>,
}

impl EffectiveAuth {
    /// Membership test against the normalized permission set
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// All held permissions whose module prefix equals `module`
    pub fn permissions_for_module(&self, module: &str) -> Vec<String> {
        let prefix = format!("{}:", module);
        self.permissions
            .iter()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

/// Internal session issued at login and carried in a signed token
///
/// Holds a pointer to the cache key, never the `EffectiveAuth` itself, so a
/// single upstream refresh is visible to every session for that principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalSession {
    pub session_id: String,
    pub subject: String,
    pub email: String,
    pub cache_key: String,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds
    pub expires_at: i64,
}

impl InternalSession {
    /// Whether the session is within `threshold` seconds of expiring
    pub fn requires_refresh(&self, now: i64, threshold: i64) -> bool {
        self.expires_at - now <= threshold
    }
}
