//! Changeset application
//!
//! Executes a planned changeset against the provider port. Unlike rule-set
//! mutation, application is not fail-fast: every change is attempted once,
//! and failures are collected into a single composite error so the caller
//! can see exactly which hostnames/operations failed while knowing the
//! rest of the batch may already have taken effect.

use tracing::debug;

use crate::endpoint::{RecordType, TTL_AUTO};
use crate::error::{Error, ErrorList, Result};
use crate::plan::{Change, ChangeAction};
use crate::traits::DnsApi;
use crate::zones::DnsRecord;

/// Comment prefix tagging records owned by this system
pub const OWNER_COMMENT_PREFIX: &str = "tunnel-dns";

/// Ownership comment for a record routing the given service
pub fn owner_comment(service: &str) -> String {
    format!("{OWNER_COMMENT_PREFIX}/{service}")
}

fn record_for(change: &Change) -> DnsRecord {
    DnsRecord {
        id: change.record_id.clone(),
        zone_id: change.zone_id.clone(),
        name: change.hostname.clone(),
        record_type: RecordType::Cname.as_str().to_string(),
        content: change.tunnel_uri.clone(),
        ttl: TTL_AUTO,
        proxied: true,
        comment: Some(owner_comment(&change.service)),
    }
}

/// Execute every change in the set, aggregating failures
///
/// Individual failures do not stop the batch; once every change has been
/// attempted, a non-empty failure list is surfaced as
/// [`Error::Composite`]. Already-issued mutations are not rolled back.
pub async fn apply_changeset(api: &dyn DnsApi, changes: &[Change]) -> Result<()> {
    let mut errs = ErrorList::new();

    for change in changes {
        debug!(
            hostname = %change.hostname,
            action = change.action.verb(),
            "applying dns change"
        );

        let result = match change.action {
            ChangeAction::Create => api.create_record(record_for(change)).await,
            ChangeAction::Update => api.update_record(record_for(change)).await,
            ChangeAction::Delete => api.delete_record(&change.zone_id, &change.record_id).await,
            ChangeAction::Noop => Ok(()),
        };

        if let Err(err) = result {
            errs.push(match err {
                Error::Provider { .. } => err,
                other => Error::provider(change.action.verb(), &change.hostname, other.to_string()),
            });
        }
    }

    errs.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_comment_carries_the_service() {
        assert_eq!(owner_comment("svc-a"), "tunnel-dns/svc-a");
    }

    #[test]
    fn record_for_constructs_a_managed_cname() {
        let change = Change {
            action: ChangeAction::Create,
            zone_id: "zone1".to_string(),
            record_id: String::new(),
            hostname: "a.example.com".to_string(),
            tunnel_uri: "tunnel123.cfargotunnel.com".to_string(),
            service: "svc-a".to_string(),
        };

        let record = record_for(&change);

        assert_eq!(record.record_type, "CNAME");
        assert_eq!(record.ttl, TTL_AUTO);
        assert!(record.proxied);
        assert_eq!(record.comment.as_deref(), Some("tunnel-dns/svc-a"));
        assert_eq!(record.content, "tunnel123.cfargotunnel.com");
    }
}
