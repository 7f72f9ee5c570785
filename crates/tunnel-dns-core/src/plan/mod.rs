//! Changeset planning
//!
//! The planner performs a three-way reconciliation: desired routing state
//! (the rule set) against actual DNS state (the zone index), producing the
//! minimal list of record mutations that converges DNS on the tunnel's
//! routing. This is more than create-or-update: DNS records are append-only
//! relative to tunnel routing unless explicitly cleaned, so the planner
//! also deletes records still pointing at the tunnel for hostnames no rule
//! routes anymore.

use std::collections::{HashMap, HashSet};

use crate::rules::RuleSet;
use crate::zones::ZoneIndex;

/// DNS suffix under which provider tunnels are addressable
pub const TUNNEL_DOMAIN: &str = "cfargotunnel.com";

/// Canonical DNS content value routing a hostname to the given tunnel
pub fn tunnel_uri(tunnel_id: &str) -> String {
    format!("{tunnel_id}.{TUNNEL_DOMAIN}")
}

/// Kind of a planned DNS mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Record already converged; suppressed from planner output
    Noop,
    /// Record missing, create it in the owning zone
    Create,
    /// Record exists with stale content, rewrite it
    Update,
    /// Orphan record pointing at this tunnel, remove it
    Delete,
}

impl ChangeAction {
    /// Human-readable operation name, used in provider error context
    pub fn verb(&self) -> &'static str {
        match self {
            ChangeAction::Noop => "skip dns record",
            ChangeAction::Create => "create dns record",
            ChangeAction::Update => "update dns record",
            ChangeAction::Delete => "delete dns record",
        }
    }
}

/// One planned DNS mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// What to do with the record
    pub action: ChangeAction,

    /// Zone holding (or to hold) the record; empty for noops
    pub zone_id: String,

    /// Existing record identifier; empty for creates
    pub record_id: String,

    /// Hostname the record routes
    pub hostname: String,

    /// Record content converging the hostname onto the tunnel
    pub tunnel_uri: String,

    /// Service routed by the corresponding rule; empty for orphan deletes
    pub service: String,
}

/// Diff the rule set against a zone snapshot
///
/// One decision per hostname (a later overriding assignment wins), noops
/// suppressed, no guaranteed cross-hostname output order. Rules whose
/// hostname no known zone covers are skipped silently.
pub fn tunnel_changeset(tunnel_id: &str, rules: &RuleSet, index: &ZoneIndex) -> Vec<Change> {
    let uri = tunnel_uri(tunnel_id);

    let hostnames: HashSet<&str> = rules.rules().iter().map(|r| r.hostname.as_str()).collect();

    let mut changes: HashMap<String, Change> = HashMap::new();
    for rule in rules.rules() {
        let mut change = Change {
            action: ChangeAction::Noop,
            zone_id: String::new(),
            record_id: String::new(),
            hostname: rule.hostname.clone(),
            tunnel_uri: uri.clone(),
            service: rule.service.clone(),
        };

        let Some(record) = index.find_record(&rule.hostname) else {
            // No record yet: create it in the owning zone, or skip when no
            // provider zone covers this hostname.
            let Some(zone) = index.match_zone(&rule.hostname) else {
                continue;
            };

            change.action = ChangeAction::Create;
            change.zone_id = zone.id.clone();
            changes.insert(rule.hostname.clone(), change);
            continue;
        };

        if record.content == uri {
            changes.insert(rule.hostname.clone(), change);
            continue;
        }

        change.action = ChangeAction::Update;
        change.zone_id = record.zone_id.clone();
        change.record_id = record.id.clone();
        changes.insert(rule.hostname.clone(), change);
    }

    // Orphan cleanup: records still pointing at this tunnel whose hostname
    // no current rule routes.
    for record in index.records() {
        if record.content != uri || hostnames.contains(record.name.as_str()) {
            continue;
        }

        changes.insert(
            record.name.clone(),
            Change {
                action: ChangeAction::Delete,
                zone_id: record.zone_id.clone(),
                record_id: record.id.clone(),
                hostname: record.name.clone(),
                tunnel_uri: record.content.clone(),
                service: String::new(),
            },
        );
    }

    changes
        .into_values()
        .filter(|change| change.action != ChangeAction::Noop)
        .collect()
}
