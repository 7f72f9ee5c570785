//! Zone and record snapshotting
//!
//! A [`ZoneIndex`] is an in-memory snapshot of the provider's zones and
//! their records, built fresh for every reconciliation pass and discarded
//! afterwards. It answers two queries the planner needs: which zone would
//! own a hostname, and whether a record for a hostname already exists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::DnsApi;

/// An administrative DNS suffix grouping records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned zone identifier
    pub id: String,

    /// Zone name, e.g. "example.com"
    pub name: String,
}

impl Zone {
    /// Create a new zone
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A concrete DNS entry held by the provider
///
/// `content` holds the routed tunnel URI when the record is managed by this
/// system. `record_type` stays a plain string: zone listings carry every
/// record kind the provider knows, not just the ones this engine routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned record identifier; empty for records not yet created
    #[serde(default)]
    pub id: String,

    /// Identifier of the zone holding the record
    #[serde(default)]
    pub zone_id: String,

    /// Fully-qualified record name
    pub name: String,

    /// Record kind, e.g. "CNAME"
    #[serde(rename = "type")]
    pub record_type: String,

    /// Record content; the tunnel URI for records managed by this system
    pub content: String,

    /// TTL in seconds; 1 means provider-managed ("automatic")
    #[serde(default)]
    pub ttl: u32,

    /// Whether the provider proxies traffic for this record
    #[serde(default)]
    pub proxied: bool,

    /// Free-form record comment; used to tag system-managed records
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
struct ZoneEntry {
    zone: Zone,
    records: HashMap<String, DnsRecord>,
}

/// Per-pass snapshot of zones and their records
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    // Sorted by zone name so scans and tie-breaks are deterministic.
    entries: Vec<ZoneEntry>,
}

impl ZoneIndex {
    /// Build an index from zones and their record lists
    pub fn from_parts(parts: Vec<(Zone, Vec<DnsRecord>)>) -> Self {
        let mut entries: Vec<ZoneEntry> = parts
            .into_iter()
            .map(|(zone, records)| ZoneEntry {
                zone,
                records: records.into_iter().map(|r| (r.name.clone(), r)).collect(),
            })
            .collect();

        entries.sort_by(|a, b| a.zone.name.cmp(&b.zone.name));
        Self { entries }
    }

    /// Build an index from the provider's current state
    pub async fn snapshot(api: &dyn DnsApi) -> Result<Self> {
        let zones = api.list_zones().await?;

        let mut parts = Vec::with_capacity(zones.len());
        for zone in zones {
            let records = api.list_zone_records(&zone.id).await?;
            parts.push((zone, records));
        }

        Ok(Self::from_parts(parts))
    }

    /// The zone whose name is the longest suffix of `hostname`
    ///
    /// Equal-length candidates tie-break to the lexicographically smallest
    /// zone name, which the sorted entry order provides. Returns `None`
    /// when no zone name is a suffix of the hostname.
    pub fn match_zone(&self, hostname: &str) -> Option<&Zone> {
        let mut best: Option<&Zone> = None;

        for entry in &self.entries {
            if !hostname.ends_with(entry.zone.name.as_str()) {
                continue;
            }

            if best.is_none_or(|zone| entry.zone.name.len() > zone.name.len()) {
                best = Some(&entry.zone);
            }
        }

        best
    }

    /// The record whose name equals `hostname` exactly, if any
    ///
    /// Zones are scanned in name order. A record name appearing in more
    /// than one zone is a provider configuration error, not a supported
    /// case; the first match wins.
    pub fn find_record(&self, hostname: &str) -> Option<&DnsRecord> {
        self.entries
            .iter()
            .find_map(|entry| entry.records.get(hostname))
    }

    /// Iterate over every record across all zones
    pub fn records(&self) -> impl Iterator<Item = &DnsRecord> {
        self.entries.iter().flat_map(|entry| entry.records.values())
    }

    /// Number of zones in the index
    pub fn zone_count(&self) -> usize {
        self.entries.len()
    }
}
