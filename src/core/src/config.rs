//! Central service configuration, loaded from the environment

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Runtime configuration for the authorization service
///
/// Loaded once at startup; required variables are reported together rather
/// than one failure at a time.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Raw comma-separated network ACL entries (`AUTHZ_ALLOWED_NETWORKS`).
    /// Empty means allow-all — a deliberately permissive default that
    /// operators must lock down for production.
    pub allowed_networks: String,

    /// Fixed-window request limit per client key
    pub rate_limit_requests: u32,

    /// Fixed-window length in seconds
    pub rate_limit_window_seconds: u64,

    /// TTL for cached `EffectiveAuth` documents
    pub effectiveauth_ttl_seconds: u64,

    /// Stale-grace window after expiry during upstream outages; 0 disables
    /// stale serving entirely
    pub stale_grace_seconds: u64,

    /// HS256 secret for internal session tokens
    pub session_signing_secret: String,

    /// Internal session lifetime in seconds
    pub session_ttl_seconds: i64,

    /// Sessions closer than this to expiry report `requires_refresh`
    pub session_refresh_threshold_seconds: i64,

    /// Accepted `aud` values for external identity tokens
    pub allowed_audiences: Vec<String>,

    /// Expected `iss` value for external identity tokens
    pub expected_issuer: String,

    /// Optional hosted-domain restriction (`hd` claim)
    pub allowed_hosted_domain: Option<String>,

    /// PEM file with the identity provider's public key
    pub id_token_public_key_file: Option<PathBuf>,

    /// Shared-secret fallback for id-token verification (dev/test only)
    pub id_token_hs_secret: Option<String>,

    /// JSON file with the ordered derived-permission rule table
    pub derived_rules_file: Option<PathBuf>,

    /// JSON fixture file backing the static directory fetcher
    pub directory_fixture_file: Option<PathBuf>,

    /// Answer ACL rejections with 404 instead of 403 to avoid leaking
    /// endpoint existence
    pub acl_reject_as_not_found: bool,
}

impl Settings {
    /// Load settings from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through a lookup function (injectable for tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();

        let session_signing_secret = require(&lookup, "SESSION_SIGNING_SECRET", &mut missing);
        let expected_issuer = require(&lookup, "OAUTH_EXPECTED_ISSUER", &mut missing);
        let allowed_audiences = split_list(&lookup("OAUTH_ALLOWED_AUDIENCES").unwrap_or_default());
        if allowed_audiences.is_empty() {
            missing.push("OAUTH_ALLOWED_AUDIENCES");
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing.join(", ")));
        }

        Ok(Self {
            allowed_networks: lookup("AUTHZ_ALLOWED_NETWORKS").unwrap_or_default(),
            rate_limit_requests: parse_or(&lookup, "AUTHZ_RATE_LIMIT_REQUESTS", 60)?,
            rate_limit_window_seconds: parse_or(&lookup, "AUTHZ_RATE_LIMIT_WINDOW_SECONDS", 60)?,
            effectiveauth_ttl_seconds: parse_or(&lookup, "EFFECTIVEAUTH_TTL_SECONDS", 300)?,
            stale_grace_seconds: parse_or(&lookup, "EFFECTIVEAUTH_STALE_GRACE_SECONDS", 0)?,
            session_signing_secret,
            session_ttl_seconds: parse_or(&lookup, "SESSION_TTL_SECONDS", 3600)?,
            session_refresh_threshold_seconds: parse_or(
                &lookup,
                "SESSION_REFRESH_THRESHOLD_SECONDS",
                300,
            )?,
            allowed_audiences,
            expected_issuer,
            allowed_hosted_domain: nonempty(lookup("ALLOWED_HOSTED_DOMAIN")),
            id_token_public_key_file: nonempty(lookup("ID_TOKEN_PUBLIC_KEY_FILE")).map(Into::into),
            id_token_hs_secret: nonempty(lookup("ID_TOKEN_HS_SECRET")),
            derived_rules_file: nonempty(lookup("DERIVED_PERMISSION_RULES_FILE")).map(Into::into),
            directory_fixture_file: nonempty(lookup("DIRECTORY_FIXTURE_FILE")).map(Into::into),
            acl_reject_as_not_found: flag(&lookup("ACL_REJECT_AS_NOT_FOUND").unwrap_or_default()),
        })
    }
}

fn require<F>(lookup: &F, name: &'static str, missing: &mut Vec<&'static str>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match nonempty(lookup(name)) {
        Some(value) => value,
        None => {
            missing.push(name);
            String::new()
        }
    }
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

fn flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match nonempty(lookup(name)) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(name, e.to_string())),
        None => Ok(default),
    }
}

/// Convenience for tests: lookup backed by a map
pub fn lookup_from_map(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
    move |name| map.get(name).map(|v| v.to_string())
}
