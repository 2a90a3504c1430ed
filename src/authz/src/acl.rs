//! IPv4 network ACL: CIDR blocks, single hosts, and explicit ranges

use dirgate_core::error::ConfigError;
use std::net::{IpAddr, Ipv4Addr};
use tracing::warn;

/// One parsed allow-rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclRule {
    /// Matches every caller; short-circuits the rest of the rule list
    AllowAll,
    /// CIDR block, e.g. `10.0.0.0/16`
    Cidr { network: Ipv4Addr, prefix: u8 },
    /// Exact host match
    Host(Ipv4Addr),
    /// Inclusive range `start|end` under big-endian integer comparison
    Range(Ipv4Addr, Ipv4Addr),
}

impl AclRule {
    fn matches(&self, ip: Ipv4Addr) -> bool {
        match self {
            AclRule::AllowAll => true,
            AclRule::Cidr { network, prefix } => {
                let mask = if *prefix == 0 {
                    0
                } else {
                    u32::MAX << (32 - prefix)
                };
                (u32::from(ip) & mask) == (u32::from(*network) & mask)
            }
            AclRule::Host(host) => ip == *host,
            AclRule::Range(start, end) => {
                let value = u32::from(ip);
                u32::from(*start) <= value && value <= u32::from(*end)
            }
        }
    }
}

/// Ordered allow-rule list built once from configuration
///
/// An empty configuration is equivalent to allow-all: a permissive default
/// meant for local use that operators must lock down.
#[derive(Debug, Clone)]
pub struct NetworkAcl {
    rules: Vec<AclRule>,
}

impl NetworkAcl {
    /// Parse a comma-separated rule list. Tokens are trimmed; unparseable
    /// tokens fail configuration load rather than being skipped per-request.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "*" || token == "0.0.0.0/0" {
                warn!("Network ACL allows all callers; do not use in production");
                return Ok(Self {
                    rules: vec![AclRule::AllowAll],
                });
            }
            rules.push(Self::parse_token(token)?);
        }
        if rules.is_empty() {
            warn!("Network ACL is empty; defaulting to allow-all");
            rules.push(AclRule::AllowAll);
        }
        Ok(Self { rules })
    }

    fn parse_token(token: &str) -> Result<AclRule, ConfigError> {
        if let Some((start, end)) = token.split_once('|') {
            let start: Ipv4Addr = start
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAclEntry(token.to_string()))?;
            let end: Ipv4Addr = end
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAclEntry(token.to_string()))?;
            // Inverted bounds are normalized rather than rejected
            if u32::from(start) <= u32::from(end) {
                return Ok(AclRule::Range(start, end));
            }
            return Ok(AclRule::Range(end, start));
        }

        if let Some((network, prefix)) = token.split_once('/') {
            let network: Ipv4Addr = network
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAclEntry(token.to_string()))?;
            let prefix: u8 = prefix
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAclEntry(token.to_string()))?;
            if prefix > 32 {
                return Err(ConfigError::InvalidAclEntry(token.to_string()));
            }
            return Ok(AclRule::Cidr { network, prefix });
        }

        let host: Ipv4Addr = token
            .parse()
            .map_err(|_| ConfigError::InvalidAclEntry(token.to_string()))?;
        Ok(AclRule::Host(host))
    }

    /// First-match-wins evaluation in rule order; no match rejects.
    /// The ACL is IPv4-only; IPv6 callers are rejected.
    pub fn allows(&self, ip: IpAddr) -> bool {
        let IpAddr::V4(ip) = ip else {
            warn!(%ip, "Rejecting non-IPv4 caller");
            return false;
        };
        self.rules.iter().any(|rule| rule.matches(ip))
    }

    pub fn rules(&self) -> &[AclRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_mixed_rule_parsing() {
        let acl = NetworkAcl::parse("10.0.0.0/16,10.1.1.5,10.2.0.1|10.2.0.50").unwrap();
        assert_eq!(acl.rules().len(), 3);

        assert!(acl.allows(ip("10.0.5.5")));
        assert!(acl.allows(ip("10.1.1.5")));
        assert!(acl.allows(ip("10.2.0.25")));
        assert!(!acl.allows(ip("10.3.0.1")));
    }

    #[test]
    fn test_whitespace_tolerated() {
        let acl = NetworkAcl::parse(" 10.0.0.0/24 ,  192.168.1.1 ").unwrap();
        assert_eq!(acl.rules().len(), 2);
        assert!(acl.allows(ip("10.0.0.200")));
        assert!(acl.allows(ip("192.168.1.1")));
        assert!(!acl.allows(ip("192.168.1.2")));
    }

    #[test]
    fn test_allow_all_short_circuits() {
        let acl = NetworkAcl::parse("10.0.0.0/8,*").unwrap();
        assert_eq!(acl.rules(), &[AclRule::AllowAll]);
        assert!(acl.allows(ip("203.0.113.9")));

        let acl = NetworkAcl::parse("0.0.0.0/0").unwrap();
        assert!(acl.allows(ip("203.0.113.9")));
    }

    #[test]
    fn test_empty_config_is_open() {
        let acl = NetworkAcl::parse("").unwrap();
        assert!(acl.allows(ip("8.8.8.8")));

        let acl = NetworkAcl::parse(" , ").unwrap();
        assert!(acl.allows(ip("8.8.8.8")));
    }

    #[test]
    fn test_bare_zero_address_is_single_host() {
        let acl = NetworkAcl::parse("0.0.0.0").unwrap();
        assert_eq!(acl.rules(), &[AclRule::Host(Ipv4Addr::new(0, 0, 0, 0))]);
        assert!(!acl.allows(ip("10.0.0.1")));
    }

    #[test]
    fn test_inverted_range_is_normalized() {
        let acl = NetworkAcl::parse("10.2.0.50|10.2.0.1").unwrap();
        assert!(acl.allows(ip("10.2.0.25")));
        assert!(!acl.allows(ip("10.2.0.51")));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let acl = NetworkAcl::parse("10.2.0.1|10.2.0.50").unwrap();
        assert!(acl.allows(ip("10.2.0.1")));
        assert!(acl.allows(ip("10.2.0.50")));
        assert!(!acl.allows(ip("10.2.0.0")));
    }

    #[test]
    fn test_invalid_entries_fail_load() {
        assert!(NetworkAcl::parse("10.0.0.0/40").is_err());
        assert!(NetworkAcl::parse("not-an-ip").is_err());
        assert!(NetworkAcl::parse("10.0.0.1|banana").is_err());
        assert!(NetworkAcl::parse("10.0.0.0/abc").is_err());
    }

    #[test]
    fn test_prefix_zero_matches_everything() {
        let acl = NetworkAcl::parse("1.2.3.4/0").unwrap();
        assert!(acl.allows(ip("200.1.1.1")));
    }

    #[test]
    fn test_ipv6_rejected() {
        let acl = NetworkAcl::parse("10.0.0.0/8").unwrap();
        assert!(!acl.allows("::1".parse().unwrap()));
    }
}
