use dirgate_authz::service::AuthzService;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Authorization decision engine
    pub service: Arc<AuthzService>,

    /// Report ACL rejections as 404 instead of 403
    pub acl_reject_as_not_found: bool,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(service: Arc<AuthzService>, acl_reject_as_not_found: bool) -> Self {
        Self {
            service,
            acl_reject_as_not_found,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
