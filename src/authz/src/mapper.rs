//! Pure mapping of raw directory records into `EffectiveAuth` documents
//!
//! No I/O. Directory data is operator-controlled: malformed attribute shapes
//! and function lines degrade (skip + log), they never fail the mapping.

use chrono::Utc;
use dirgate_core::error::ConfigError;
use dirgate_core::types::{DirectoryRecord, EffectiveAuth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// Custom-schema attribute holding the multi-line function declarations
pub const USER_FUNCTIONS_ATTR: &str = "UserFunctions";
/// Custom-schema attribute with the department-manager flag
pub const MANAGER_ATTR: &str = "DepartmentManager";
/// Custom-schema attribute with the home department
pub const HOME_DEPARTMENT_ATTR: &str = "HomeDepartment";

/// Lowercase a label and replace internal spaces with underscores
pub fn slug(value: &str) -> String {
    let cleaned = value.trim().to_lowercase().replace(' ', "_");
    let mut collapsed = cleaned;
    while collapsed.contains("__") {
        collapsed = collapsed.replace("__", "_");
    }
    collapsed
}

/// Normalize one `"Module:Action"` declaration to `"module:action"`.
/// Lines without the separator, or with an empty side, are malformed.
pub fn normalize_permission(function: &str) -> Option<String> {
    let (module, action) = function.split_once(':')?;
    let module = slug(module);
    let action = slug(action);
    if module.is_empty() || action.is_empty() {
        return None;
    }
    Some(format!("{}:{}", module, action))
}

/// Attribute a derivation rule can match against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAttribute {
    HomeDepartment,
    IsDepartmentManager,
}

/// Condition side of a derivation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub attribute: RuleAttribute,
    pub equals: String,
}

/// One derived-permission rule: when the condition holds, the grants are
/// unioned into the permission set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationRule {
    pub name: String,
    pub when: RuleCondition,
    pub grant: Vec<String>,
}

impl DerivationRule {
    fn matches(&self, home_department: Option<&str>, is_manager: bool) -> bool {
        match self.when.attribute {
            RuleAttribute::HomeDepartment => home_department == Some(self.when.equals.as_str()),
            RuleAttribute::IsDepartmentManager => {
                let expected = matches!(
                    self.when.equals.trim().to_lowercase().as_str(),
                    "1" | "true" | "yes" | "y"
                );
                is_manager == expected
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidRuleTable(
                "rule name cannot be empty".to_string(),
            ));
        }
        if self.grant.is_empty() {
            return Err(ConfigError::InvalidRuleTable(format!(
                "rule '{}' grants nothing",
                self.name
            )));
        }
        Ok(())
    }
}

/// Ordered derived-permission rule table, loaded once at startup
///
/// Grants are slug-normalized at load so evaluation is a plain set union;
/// the explicit ordering keeps evaluation deterministic.
#[derive(Debug, Clone, Default)]
pub struct DerivationTable {
    rules: Vec<DerivationRule>,
}

impl DerivationTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(rules: Vec<DerivationRule>) -> Result<Self, ConfigError> {
        let mut normalized = Vec::with_capacity(rules.len());
        for mut rule in rules {
            rule.validate()?;
            let mut grants = Vec::with_capacity(rule.grant.len());
            for raw in &rule.grant {
                let permission = normalize_permission(raw).ok_or_else(|| {
                    ConfigError::InvalidRuleTable(format!(
                        "rule '{}' grant '{}' is not of shape Module:Action",
                        rule.name, raw
                    ))
                })?;
                grants.push(permission);
            }
            rule.grant = grants;
            normalized.push(rule);
        }
        Ok(Self { rules: normalized })
    }

    /// Parse a JSON array of rules
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let rules: Vec<DerivationRule> = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidRuleTable(e.to_string()))?;
        Self::new(rules)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Pure transformation: directory record + rule table → `EffectiveAuth`
pub struct EffectiveAuthMapper {
    rules: DerivationTable,
}

impl EffectiveAuthMapper {
    pub fn new(rules: DerivationTable) -> Self {
        Self { rules }
    }

    pub fn map(&self, record: &DirectoryRecord) -> EffectiveAuth {
        let email = record.profile.primary_email.trim().to_lowercase();

        let home_department = record
            .attribute(HOME_DEPARTMENT_ATTR)
            .and_then(|v| v.as_text());
        let is_department_manager = record
            .attribute(MANAGER_ATTR)
            .map(|v| v.as_flag())
            .unwrap_or(false);

        // Upstream order and duplicates are kept verbatim in `functions`
        let functions = record
            .attribute(USER_FUNCTIONS_ATTR)
            .map(|v| v.as_lines())
            .unwrap_or_default();

        let mut permissions: BTreeSet<String> = BTreeSet::new();
        for function in &functions {
            match normalize_permission(function) {
                Some(permission) => {
                    permissions.insert(permission);
                }
                None => {
                    warn!(%email, function = %function, "Skipping malformed function entry");
                }
            }
        }

        for rule in &self.rules.rules {
            if rule.matches(home_department.as_deref(), is_department_manager) {
                permissions.extend(rule.grant.iter().cloned());
            }
        }

        let groups: BTreeSet<String> = record
            .groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        EffectiveAuth {
            email,
            home_department,
            is_department_manager,
            functions,
            permissions,
            groups,
            fetched_at: Utc::now(),
        }
    }
}
