//! Endpoint types exchanged with the routing collaborator
//!
//! An endpoint is a desired name-to-target binding as it appears on the
//! webhook wire; field casing follows the collaborator's JSON conventions.

use serde::{Deserialize, Serialize};

/// TTL value the provider treats as "automatic"
pub const TTL_AUTO: u32 = 1;

/// DNS record kind carried by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record; the only kind this engine routes
    Cname,
    /// Text record
    Txt,
}

impl RecordType {
    /// Wire representation of the record kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desired hostname-to-target binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Hostname the binding routes
    pub dns_name: String,

    /// Targets for the binding; the first entry is the routed service
    #[serde(default)]
    pub targets: Vec<String>,

    /// Record kind of the binding
    pub record_type: RecordType,

    /// Record TTL in seconds; [`TTL_AUTO`] for provider-managed
    #[serde(default, rename = "recordTTL")]
    pub record_ttl: u32,
}

impl Endpoint {
    /// Create a CNAME endpoint with an automatic TTL
    pub fn cname(dns_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            dns_name: dns_name.into(),
            targets: vec![target.into()],
            record_type: RecordType::Cname,
            record_ttl: TTL_AUTO,
        }
    }
}

/// A batch of desired endpoint mutations
///
/// Applied in create, update, delete order; `update_old` documents the
/// previous bindings and is not consumed by this engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointChanges {
    /// Bindings to create
    #[serde(default, rename = "Create")]
    pub create: Vec<Endpoint>,

    /// Previous state of the bindings in `update_new`
    #[serde(default, rename = "UpdateOld")]
    pub update_old: Vec<Endpoint>,

    /// Bindings to rewrite in place
    #[serde(default, rename = "UpdateNew")]
    pub update_new: Vec<Endpoint>,

    /// Bindings to remove
    #[serde(default, rename = "Delete")]
    pub delete: Vec<Endpoint>,
}

impl EndpointChanges {
    /// Whether the batch carries no mutations at all
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update_new.is_empty() && self.delete.is_empty()
    }
}
