//! Minimal embedding example for tunnel-dns-core
//!
//! Demonstrates driving a full reconciliation pass as a library against an
//! in-memory provider port: seed a tunnel and a zone, apply a batch of
//! desired endpoint changes, and inspect the converged state.

use std::sync::Arc;
use std::sync::Mutex;

use tunnel_dns_core::error::Result;
use tunnel_dns_core::rules::IngressRule;
use tunnel_dns_core::traits::DnsApi;
use tunnel_dns_core::zones::{DnsRecord, Zone};
use tunnel_dns_core::{
    Endpoint, EndpointChanges, Reconciler, ReconcilerConfig, tunnel_uri,
};

/// In-memory provider port for embedded usage
struct InMemoryApi {
    state: Mutex<InMemoryState>,
}

struct InMemoryState {
    ingress: Vec<IngressRule>,
    zone: Zone,
    records: Vec<DnsRecord>,
    next_id: usize,
}

impl InMemoryApi {
    fn new(ingress: Vec<IngressRule>, zone: Zone, records: Vec<DnsRecord>) -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                ingress,
                zone,
                records,
                next_id: 100,
            }),
        }
    }

    fn dump(&self) {
        let state = self.state.lock().unwrap();

        println!("ingress rules (evaluation order):");
        for rule in &state.ingress {
            let hostname = if rule.hostname.is_empty() {
                "<catch-all>"
            } else {
                rule.hostname.as_str()
            };
            println!("  {hostname} -> {}", rule.service);
        }

        println!("dns records in {}:", state.zone.name);
        for record in &state.records {
            println!(
                "  {} {} -> {} ({})",
                record.record_type,
                record.name,
                record.content,
                record.comment.as_deref().unwrap_or("-"),
            );
        }
    }
}

#[async_trait::async_trait]
impl DnsApi for InMemoryApi {
    async fn get_tunnel_ingress(
        &self,
        _account_id: &str,
        _tunnel_id: &str,
    ) -> Result<Vec<IngressRule>> {
        Ok(self.state.lock().unwrap().ingress.clone())
    }

    async fn set_tunnel_ingress(
        &self,
        _account_id: &str,
        _tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<()> {
        self.state.lock().unwrap().ingress = rules.to_vec();
        Ok(())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        Ok(vec![self.state.lock().unwrap().zone.clone()])
    }

    async fn list_zone_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>> {
        Ok(self.state.lock().unwrap().records.clone())
    }

    async fn create_record(&self, mut record: DnsRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        record.id = format!("record{}", state.next_id);
        state.next_id += 1;
        state.records.push(record);
        Ok(())
    }

    async fn update_record(&self, record: DnsRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        }
        Ok(())
    }

    async fn delete_record(&self, _zone_id: &str, record_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.records.retain(|r| r.id != record_id);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let tunnel_id = "tunnel123";
    let uri = tunnel_uri(tunnel_id);

    // A tunnel with one routed hostname and a trailing catch-all, and a
    // zone holding one stale record plus one orphan still pointing at the
    // tunnel.
    let api = Arc::new(InMemoryApi::new(
        vec![
            IngressRule::new("a.example.com", "http://web:8080"),
            IngressRule::new("", "http_status:404"),
        ],
        Zone::new("zone1", "example.com"),
        vec![
            DnsRecord {
                id: "record1".to_string(),
                zone_id: "zone1".to_string(),
                name: "a.example.com".to_string(),
                record_type: "CNAME".to_string(),
                content: "old-target.example.net".to_string(),
                ttl: 1,
                proxied: true,
                comment: None,
            },
            DnsRecord {
                id: "record2".to_string(),
                zone_id: "zone1".to_string(),
                name: "stale.example.com".to_string(),
                record_type: "CNAME".to_string(),
                content: uri.clone(),
                ttl: 1,
                proxied: true,
                comment: Some("tunnel-dns/old-service".to_string()),
            },
        ],
    ));

    let config = ReconcilerConfig::new("account123", tunnel_id).with_sync_dns(true);
    let reconciler = Reconciler::new(api.clone(), config)?;

    println!("--- before ---");
    api.dump();

    // Route one new hostname; a.example.com converges, stale.example.com
    // is cleaned up as an orphan.
    let changes = EndpointChanges {
        create: vec![Endpoint::cname("b.example.com", "http://api:9090")],
        ..Default::default()
    };
    reconciler.apply_desired_state(&changes).await?;

    println!("--- after ---");
    api.dump();

    let endpoints = reconciler.routable_endpoints().await?;
    println!("routable endpoints: {}", serde_json::to_string(&endpoints)?);

    Ok(())
}
