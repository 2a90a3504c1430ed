//! # dirgate-authz
//!
//! Authorization evaluation and caching engine. Turns raw directory identity
//! data into normalized [`EffectiveAuth`](dirgate_core::EffectiveAuth)
//! documents and answers decision requests behind a network ACL, a per-client
//! rate limiter, and token validation.
//!
//! # Architecture
//!
//! ```text
//! Request → NetworkAcl → RateLimiter → TokenValidator → CacheStore → Decision
//!                                                          ↓
//!                                                    [SingleFlight]
//!                                                          ↓
//!                                            DirectoryFetcher → Mapper
//! ```
//!
//! The cache guarantees at most one in-flight upstream refresh per principal;
//! concurrent callers share the refresh result.

pub mod acl;
pub mod cache;
pub mod directory;
pub mod error;
pub mod mapper;
pub mod rate_limit;
pub mod service;
pub mod session;
pub mod singleflight;
pub mod token;

pub use acl::NetworkAcl;
pub use cache::{CacheConfig, CacheStore};
pub use directory::StaticDirectoryFetcher;
pub use error::{AuthzError, Result};
pub use mapper::{DerivationTable, EffectiveAuthMapper};
pub use rate_limit::RateLimiter;
pub use service::{AuthzService, CheckOutcome, Decision};
pub use session::SessionManager;
pub use singleflight::SingleFlight;
pub use token::{Credential, TokenValidator};
