//! Core reconciliation engine
//!
//! The [`Reconciler`] ties the pieces together for one tunnel:
//!
//! ```text
//! EndpointChanges ──▶ RuleSet.apply_changes ──▶ ZoneIndex.snapshot
//!                                                      │
//!                                                      ▼
//!                     ChangeApplier ◀── tunnel_changeset (planner)
//! ```
//!
//! Within one pass, rule mutation happens before zone snapshotting, which
//! happens before planning, which happens before application; there is no
//! reordering. Passes for the same tunnel are serialized by an internal
//! mutex: the apply path is a read-modify-write of the tunnel's stored rule
//! configuration and must not race with itself.

use std::sync::Arc;

use tracing::{debug, info};

use crate::apply::apply_changeset;
use crate::config::ReconcilerConfig;
use crate::endpoint::{Endpoint, EndpointChanges, RecordType, TTL_AUTO};
use crate::error::Result;
use crate::filter::DomainFilter;
use crate::plan::tunnel_changeset;
use crate::rules::RuleSet;
use crate::traits::DnsApi;
use crate::zones::ZoneIndex;

/// Reconciles one tunnel's ingress rules with the provider's DNS records
pub struct Reconciler {
    /// Provider port for tunnel configuration and DNS records
    api: Arc<dyn DnsApi>,

    /// Provider account owning the tunnel
    account_id: String,

    /// Tunnel whose ingress this engine manages
    tunnel_id: String,

    /// Allow-list advertised to the routing collaborator
    domain_filter: DomainFilter,

    /// Plan but never mutate provider state
    dry_run: bool,

    /// Also write the DNS changeset after updating tunnel ingress
    sync_dns: bool,

    /// Serializes reconciliation passes for this tunnel
    pass_lock: tokio::sync::Mutex<()>,
}

impl Reconciler {
    /// Create a reconciler from a validated configuration
    pub fn new(api: Arc<dyn DnsApi>, config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            api,
            account_id: config.account_id,
            tunnel_id: config.tunnel_id,
            domain_filter: DomainFilter::new(config.domain_filter),
            dry_run: config.dry_run,
            sync_dns: config.sync_dns,
            pass_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// The domain allow-list advertised during negotiation
    pub fn domain_filter(&self) -> &DomainFilter {
        &self.domain_filter
    }

    /// Endpoints derived from the tunnel's current ingress rules
    ///
    /// Catch-all rules carry no hostname and are not routable endpoints.
    pub async fn routable_endpoints(&self) -> Result<Vec<Endpoint>> {
        let ingress = self
            .api
            .get_tunnel_ingress(&self.account_id, &self.tunnel_id)
            .await?;

        let endpoints = ingress
            .iter()
            .filter(|rule| !rule.hostname.is_empty())
            .map(|rule| Endpoint {
                dns_name: rule.hostname.clone(),
                targets: vec![rule.service.clone()],
                record_type: RecordType::Cname,
                record_ttl: TTL_AUTO,
            })
            .collect();

        Ok(endpoints)
    }

    /// Filter candidate endpoints down to the routable record kind
    pub fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        endpoints
            .into_iter()
            .filter(|e| e.record_type == RecordType::Cname)
            .collect()
    }

    /// Fold desired endpoint changes into the tunnel and converge DNS
    ///
    /// The pass reads the tunnel's ingress, applies the changes fail-fast,
    /// snapshots zones, plans the DNS changeset, then writes tunnel ingress
    /// and (with `sync_dns`) applies the changeset with partial-failure
    /// aggregation. In dry-run mode nothing is written. Cancellation mid
    /// batch leaves DNS partially converged; nothing is rolled back.
    pub async fn apply_desired_state(&self, changes: &EndpointChanges) -> Result<()> {
        let _pass = self.pass_lock.lock().await;

        let ingress = self
            .api
            .get_tunnel_ingress(&self.account_id, &self.tunnel_id)
            .await?;

        let mut rules = RuleSet::new(ingress);
        rules.apply_changes(changes)?;

        let index = ZoneIndex::snapshot(self.api.as_ref()).await?;
        let changeset = tunnel_changeset(&self.tunnel_id, &rules, &index);

        if self.dry_run {
            info!(
                rules = rules.len(),
                changes = changeset.len(),
                "dry run, not applying changes"
            );
            return Ok(());
        }

        self.api
            .set_tunnel_ingress(&self.account_id, &self.tunnel_id, rules.rules())
            .await?;

        if self.sync_dns {
            apply_changeset(self.api.as_ref(), &changeset).await?;
        } else {
            debug!(
                changes = changeset.len(),
                "dns sync disabled, skipping changeset"
            );
        }

        Ok(())
    }
}
