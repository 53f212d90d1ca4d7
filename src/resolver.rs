//! Address ↔ subject resolution.
//!
//! # Responsibilities
//! - Bind a logical subject id to the address it is reached at
//! - Look a subject up by socket address, bare IP or hostname
//!
//! # Design Decisions
//! - Later bindings for a subject overwrite earlier ones
//! - No expiry; bindings live as long as the reporter
//! - Concurrent maps so callers can register from any thread

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use dashmap::DashMap;

use crate::config::SubjectConfig;

/// Which address form a lookup key is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Bare IP, e.g. `10.0.0.2`.
    Ip,
    /// Socket address, e.g. `10.0.0.2:2181`.
    IpPort,
    /// Hostname, e.g. `zk2.local`.
    Host,
}

/// Network identity of a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAddress {
    pub hostname: String,
    pub socket: SocketAddr,
}

impl SubjectAddress {
    pub fn new(hostname: impl Into<String>, socket: SocketAddr) -> Self {
        Self {
            hostname: hostname.into(),
            socket,
        }
    }

    /// An address with no known hostname; the IP stands in for it.
    pub fn from_socket(socket: SocketAddr) -> Self {
        Self::new(socket.ip().to_string(), socket)
    }

    pub fn ip(&self) -> IpAddr {
        self.socket.ip()
    }
}

impl fmt::Display for SubjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hostname, self.socket)
    }
}

/// Bidirectional subject/address lookup table.
#[derive(Debug, Default)]
pub struct SubjectResolver {
    subject_to_address: DashMap<String, SubjectAddress>,
    ip_port_to_subject: DashMap<String, String>,
    ip_to_subject: DashMap<String, String>,
    host_to_subject: DashMap<String, String>,
}

impl SubjectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver pre-populated from configuration. Unparseable
    /// addresses are skipped with a warning.
    pub fn from_config(subjects: &[SubjectConfig]) -> Self {
        let resolver = Self::new();
        for entry in subjects {
            match entry.address.parse::<SocketAddr>() {
                Ok(socket) => {
                    let address = match &entry.hostname {
                        Some(hostname) => SubjectAddress::new(hostname.clone(), socket),
                        None => SubjectAddress::from_socket(socket),
                    };
                    resolver.map(&entry.subject, address);
                }
                Err(e) => {
                    tracing::warn!(subject = %entry.subject, address = %entry.address, error = %e, "Skipping subject with invalid address");
                }
            }
        }
        resolver
    }

    /// Register `subject` under all three address forms.
    pub fn map(&self, subject: &str, address: SubjectAddress) {
        tracing::info!(subject = %subject, host = %address.hostname, ip = %address.ip(), "Map subject");
        self.ip_port_to_subject
            .insert(address.socket.to_string(), subject.to_string());
        self.ip_to_subject
            .insert(address.ip().to_string(), subject.to_string());
        self.host_to_subject
            .insert(address.hostname.clone(), subject.to_string());
        self.subject_to_address.insert(subject.to_string(), address);
    }

    /// Subject bound to `key` under the given address form.
    pub fn resolve(&self, key: &str, kind: AddressKind) -> Option<String> {
        let table = match kind {
            AddressKind::Ip => &self.ip_to_subject,
            AddressKind::IpPort => &self.ip_port_to_subject,
            AddressKind::Host => &self.host_to_subject,
        };
        table.get(key).map(|r| r.value().clone())
    }

    /// Most recent address registered for `subject`.
    pub fn address_of(&self, subject: &str) -> Option<SubjectAddress> {
        self.subject_to_address.get(subject).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.subject_to_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subject_to_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_all_forms() {
        let resolver = SubjectResolver::new();
        let address = SubjectAddress::new("zk2.local", addr("10.0.0.2:2181"));
        resolver.map("TS_2", address.clone());

        assert_eq!(resolver.resolve("10.0.0.2", AddressKind::Ip).as_deref(), Some("TS_2"));
        assert_eq!(
            resolver.resolve(&address.socket.to_string(), AddressKind::IpPort).as_deref(),
            Some("TS_2")
        );
        assert_eq!(resolver.resolve("zk2.local", AddressKind::Host).as_deref(), Some("TS_2"));
        assert_eq!(resolver.address_of("TS_2"), Some(address));
    }

    #[test]
    fn test_unknown_key_not_found() {
        let resolver = SubjectResolver::new();
        resolver.map("TS_2", SubjectAddress::from_socket(addr("10.0.0.2:2181")));
        assert!(resolver.resolve("10.0.0.3", AddressKind::Ip).is_none());
        // Keys are per form: an IP is not a socket address.
        assert!(resolver.resolve("10.0.0.2", AddressKind::IpPort).is_none());
    }

    #[test]
    fn test_remap_overwrites_subject_address() {
        let resolver = SubjectResolver::new();
        resolver.map("TS_2", SubjectAddress::from_socket(addr("10.0.0.2:2181")));
        resolver.map("TS_2", SubjectAddress::from_socket(addr("10.0.0.9:2181")));

        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.address_of("TS_2").unwrap().socket, addr("10.0.0.9:2181"));
        assert_eq!(resolver.resolve("10.0.0.9", AddressKind::Ip).as_deref(), Some("TS_2"));
    }

    #[test]
    fn test_from_config_skips_bad_entries() {
        let resolver = SubjectResolver::from_config(&[
            SubjectConfig {
                subject: "TS_1".into(),
                address: "10.0.0.1:2181".into(),
                hostname: Some("zk1.local".into()),
            },
            SubjectConfig {
                subject: "TS_X".into(),
                address: "garbage".into(),
                hostname: None,
            },
        ]);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.resolve("zk1.local", AddressKind::Host).as_deref(), Some("TS_1"));
    }
}
