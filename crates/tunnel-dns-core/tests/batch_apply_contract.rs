//! Contract tests: batch changeset application
//!
//! The applier must attempt every planned change exactly once, survive
//! individual failures, and surface everything that went wrong in a single
//! composite error.

mod common;

use common::MockDnsApi;
use tunnel_dns_core::apply::apply_changeset;
use tunnel_dns_core::error::Error;
use tunnel_dns_core::plan::{Change, ChangeAction};
use tunnel_dns_core::tunnel_uri;

fn change(action: ChangeAction, hostname: &str, record_id: &str, service: &str) -> Change {
    Change {
        action,
        zone_id: "zone1".to_string(),
        record_id: record_id.to_string(),
        hostname: hostname.to_string(),
        tunnel_uri: tunnel_uri("tunnel123"),
        service: service.to_string(),
    }
}

#[tokio::test]
async fn successful_batch_returns_ok() {
    let api = MockDnsApi::new();

    let changes = vec![
        change(ChangeAction::Create, "a.example.com", "", "svc-a"),
        change(ChangeAction::Update, "b.example.com", "record2", "svc-b"),
        change(ChangeAction::Delete, "stale.example.com", "record3", ""),
    ];

    apply_changeset(api.as_ref(), &changes).await.unwrap();

    assert_eq!(api.created().len(), 1);
    assert_eq!(api.updated().len(), 1);
    assert_eq!(api.deleted().len(), 1);
}

#[tokio::test]
async fn one_failure_does_not_stop_the_batch() {
    let api = MockDnsApi::new().fail_mutations_for("a.example.com");

    let changes = vec![
        change(ChangeAction::Create, "a.example.com", "", "svc-a"),
        change(ChangeAction::Update, "b.example.com", "record2", "svc-b"),
        change(ChangeAction::Delete, "stale.example.com", "record3", ""),
    ];

    let err = apply_changeset(api.as_ref(), &changes).await.unwrap_err();

    // The remaining changes were still attempted.
    assert_eq!(api.updated().len(), 1);
    assert_eq!(api.deleted().len(), 1);

    let Error::Composite(list) = err else {
        panic!("expected composite error");
    };
    assert_eq!(list.len(), 1);
    assert!(list.to_string().contains("a.example.com"));
}

#[tokio::test]
async fn composite_error_names_every_failed_operation() {
    let api = MockDnsApi::new()
        .fail_mutations_for("a.example.com")
        .fail_delete_of("record3");

    let changes = vec![
        change(ChangeAction::Create, "a.example.com", "", "svc-a"),
        change(ChangeAction::Delete, "stale.example.com", "record3", ""),
        change(ChangeAction::Update, "b.example.com", "record2", "svc-b"),
    ];

    let err = apply_changeset(api.as_ref(), &changes).await.unwrap_err();

    let Error::Composite(list) = err else {
        panic!("expected composite error");
    };

    assert_eq!(list.len(), 2);
    let message = list.to_string();
    assert!(message.contains("create dns record a.example.com"));
    assert!(message.contains("delete dns record record3"));

    // The one healthy change went through.
    assert_eq!(api.updated().len(), 1);
}
