// # DNS / Tunnel Provider Port
//
// Defines the interface the reconciliation engine uses to read and write
// tunnel ingress configuration and zone DNS records.
//
// ## Implementations
//
// - Cloudflare: `tunnel-dns-provider-cloudflare` crate
// - Test double: `tests/common/mod.rs` in this crate

use async_trait::async_trait;

use crate::error::Result;
use crate::rules::IngressRule;
use crate::zones::{DnsRecord, Zone};

/// Trait for DNS/tunnel provider implementations
///
/// Every method is a blocking I/O boundary; callers supply cancellation by
/// dropping the future. Implementations must be thread-safe and perform
/// single-shot calls only: no retries, no backoff, no caching. Coordination
/// of failed calls belongs to the caller, which aggregates or aborts
/// according to its own policy.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// Read the ordered ingress rule list of a tunnel
    async fn get_tunnel_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<Vec<IngressRule>>;

    /// Replace the ordered ingress rule list of a tunnel
    ///
    /// Implementations must leave the rest of the tunnel configuration
    /// untouched; only the ingress list is replaced.
    async fn set_tunnel_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<()>;

    /// List every zone visible to the credentials in use
    async fn list_zones(&self) -> Result<Vec<Zone>>;

    /// List every DNS record in a zone
    async fn list_zone_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>>;

    /// Create a DNS record; `record.id` is ignored
    async fn create_record(&self, record: DnsRecord) -> Result<()>;

    /// Update the DNS record identified by `record.id` in `record.zone_id`
    async fn update_record(&self, record: DnsRecord) -> Result<()>;

    /// Delete a DNS record by zone and record identifier
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()>;
}
