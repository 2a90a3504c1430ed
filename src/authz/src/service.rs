//! Decision-request orchestration
//!
//! Each request walks the same gate sequence: network ACL, rate limit, token
//! validation, cache resolution, permission evaluation. The cheap gates run
//! first and every failure short-circuits the rest.

use crate::acl::NetworkAcl;
use crate::cache::CacheStore;
use crate::error::{AuthzError, Result};
use crate::mapper::slug;
use crate::rate_limit::RateLimiter;
use crate::session::SessionManager;
use crate::token::{Credential, TokenValidator};
use dirgate_core::types::{EffectiveAuth, Source};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// The fixed verb set accepted by `check`
pub const ALLOWED_ACTIONS: [&str; 7] = [
    "create", "read", "update", "delete", "list", "approve", "manage",
];

/// Decision outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Granted,
    Denied,
}

/// Result of a permission check. Denial is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub authorized: bool,
    pub decision: Decision,
    pub evaluated_permission: String,
    /// On a grant: every verb the principal holds for the evaluated module
    pub permitted_actions: Vec<String>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Orchestrates the per-request pipeline over the engine components
pub struct AuthzService {
    acl: NetworkAcl,
    limiter: RateLimiter,
    validator: TokenValidator,
    cache: Arc<CacheStore>,
    sessions: Arc<SessionManager>,
}

impl AuthzService {
    pub fn new(
        acl: NetworkAcl,
        limiter: RateLimiter,
        validator: TokenValidator,
        cache: Arc<CacheStore>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            acl,
            limiter,
            validator,
            cache,
            sessions,
        }
    }

    /// ACL → rate limit → token validation → cache resolution
    pub async fn resolve(
        &self,
        client_ip: IpAddr,
        credential: &Credential,
    ) -> Result<(EffectiveAuth, Source)> {
        if !self.acl.allows(client_ip) {
            debug!(%client_ip, "Request rejected by network ACL");
            return Err(AuthzError::AclRejected);
        }

        if !self.limiter.allow(&client_ip.to_string()) {
            debug!(%client_ip, "Request rejected by rate limiter");
            return Err(AuthzError::RateLimited);
        }

        let principal = self.validator.validate(credential)?;
        let (auth, source) = self.cache.get_or_refresh(&principal.cache_key).await?;
        debug!(principal = %principal.cache_key, ?source, "EffectiveAuth resolved");
        Ok((auth, source))
    }

    /// Resolve, then evaluate one `module:action` permission
    pub async fn check(
        &self,
        client_ip: IpAddr,
        credential: &Credential,
        module: &str,
        action: &str,
    ) -> Result<CheckOutcome> {
        let action = action.trim().to_lowercase();
        if !ALLOWED_ACTIONS.contains(&action.as_str()) {
            return Err(AuthzError::MalformedRequest(format!(
                "unsupported action '{}'",
                action
            )));
        }

        let module = slug(module);
        if module.is_empty() {
            return Err(AuthzError::MalformedRequest(
                "module must not be empty".to_string(),
            ));
        }

        let (auth, source) = self.resolve(client_ip, credential).await?;

        let evaluated_permission = format!("{}:{}", module, action);
        let authorized = auth.has_permission(&evaluated_permission);

        info!(
            principal = %auth.email,
            permission = %evaluated_permission,
            granted = authorized,
            "Permission evaluated"
        );

        if authorized {
            Ok(CheckOutcome {
                authorized: true,
                decision: Decision::Granted,
                permitted_actions: auth.permissions_for_module(&module),
                evaluated_permission,
                source,
                reason: None,
            })
        } else {
            Ok(CheckOutcome {
                authorized: false,
                decision: Decision::Denied,
                permitted_actions: Vec::new(),
                evaluated_permission,
                source,
                reason: Some("permission_missing"),
            })
        }
    }

    /// Validate a session token and evict its cache entry
    pub async fn logout(&self, session_token: &str) -> Result<()> {
        let session = self.sessions.decode(session_token)?;
        let evicted = self.cache.invalidate(&session.cache_key);
        info!(principal = %session.cache_key, evicted, "Session logged out");
        Ok(())
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
