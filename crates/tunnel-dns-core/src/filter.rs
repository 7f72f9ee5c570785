//! Domain allow-list
//!
//! Restricts which hostnames this engine is permitted to manage. The filter
//! is advertised to the routing collaborator during negotiation; its JSON
//! shape follows the collaborator's conventions.

use serde::{Deserialize, Serialize};

/// Allow-list of domain suffixes
///
/// An empty filter permits every hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFilter {
    #[serde(default)]
    include: Vec<String>,
}

impl DomainFilter {
    /// Build a filter from raw domain names
    ///
    /// Names are lowercased and stripped of a leading dot; empty entries
    /// are dropped.
    pub fn new(domains: Vec<String>) -> Self {
        let include = domains
            .into_iter()
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Self { include }
    }

    /// The normalized domains in the allow-list
    pub fn domains(&self) -> &[String] {
        &self.include
    }

    /// Whether the filter permits every hostname
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Whether `hostname` is inside the allow-list
    pub fn matches(&self, hostname: &str) -> bool {
        if self.include.is_empty() {
            return true;
        }

        let hostname = hostname.to_ascii_lowercase();
        self.include
            .iter()
            .any(|d| hostname == *d || hostname.ends_with(&format!(".{d}")))
    }
}
