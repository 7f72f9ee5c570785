//! Test doubles and common utilities for contract tests
//!
//! Provides a recording mock of the `DnsApi` port: seeded with tunnel
//! ingress and zone state, it records every mutation and can inject
//! failures per record name or id.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tunnel_dns_core::error::{Error, Result};
use tunnel_dns_core::rules::IngressRule;
use tunnel_dns_core::traits::DnsApi;
use tunnel_dns_core::zones::{DnsRecord, Zone};

#[derive(Default)]
struct MockState {
    ingress: Vec<IngressRule>,
    zones: Vec<(Zone, Vec<DnsRecord>)>,
    created: Vec<DnsRecord>,
    updated: Vec<DnsRecord>,
    deleted: Vec<(String, String)>,
    ingress_writes: Vec<Vec<IngressRule>>,
    fail_record_names: HashSet<String>,
    fail_record_ids: HashSet<String>,
}

/// A recording DnsApi double
#[derive(Default)]
pub struct MockDnsApi {
    state: Mutex<MockState>,
    get_ingress_calls: AtomicUsize,
    list_zones_calls: AtomicUsize,
}

impl MockDnsApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed the tunnel's current ingress rules
    pub fn seed_ingress(self: &Arc<Self>, rules: Vec<IngressRule>) -> Arc<Self> {
        self.state.lock().unwrap().ingress = rules;
        Arc::clone(self)
    }

    /// Seed a zone together with its records
    pub fn seed_zone(self: &Arc<Self>, zone: Zone, records: Vec<DnsRecord>) -> Arc<Self> {
        self.state.lock().unwrap().zones.push((zone, records));
        Arc::clone(self)
    }

    /// Make create/update fail for a record name
    pub fn fail_mutations_for(self: &Arc<Self>, name: &str) -> Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .fail_record_names
            .insert(name.to_string());
        Arc::clone(self)
    }

    /// Make delete fail for a record id
    pub fn fail_delete_of(self: &Arc<Self>, record_id: &str) -> Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .fail_record_ids
            .insert(record_id.to_string());
        Arc::clone(self)
    }

    pub fn created(&self) -> Vec<DnsRecord> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<DnsRecord> {
        self.state.lock().unwrap().updated.clone()
    }

    /// Deleted (zone id, record id) pairs in call order
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Every ingress list written, in call order
    pub fn ingress_writes(&self) -> Vec<Vec<IngressRule>> {
        self.state.lock().unwrap().ingress_writes.clone()
    }

    pub fn get_ingress_calls(&self) -> usize {
        self.get_ingress_calls.load(Ordering::SeqCst)
    }

    pub fn list_zones_calls(&self) -> usize {
        self.list_zones_calls.load(Ordering::SeqCst)
    }

    /// Whether any DNS record mutation was issued
    pub fn mutated_records(&self) -> bool {
        let state = self.state.lock().unwrap();
        !state.created.is_empty() || !state.updated.is_empty() || !state.deleted.is_empty()
    }
}

#[async_trait]
impl DnsApi for MockDnsApi {
    async fn get_tunnel_ingress(
        &self,
        _account_id: &str,
        _tunnel_id: &str,
    ) -> Result<Vec<IngressRule>> {
        self.get_ingress_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().ingress.clone())
    }

    async fn set_tunnel_ingress(
        &self,
        _account_id: &str,
        _tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ingress = rules.to_vec();
        state.ingress_writes.push(rules.to_vec());
        Ok(())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.list_zones_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.zones.iter().map(|(zone, _)| zone.clone()).collect())
    }

    async fn list_zone_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let state = self.state.lock().unwrap();
        let records = state
            .zones
            .iter()
            .find(|(zone, _)| zone.id == zone_id)
            .map(|(_, records)| records.clone())
            .unwrap_or_default();
        Ok(records)
    }

    async fn create_record(&self, record: DnsRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_record_names.contains(&record.name) {
            return Err(Error::provider(
                "create dns record",
                &record.name,
                "injected failure",
            ));
        }

        state.created.push(record);
        Ok(())
    }

    async fn update_record(&self, record: DnsRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_record_names.contains(&record.name) {
            return Err(Error::provider(
                "update dns record",
                &record.name,
                "injected failure",
            ));
        }

        state.updated.push(record);
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_record_ids.contains(record_id) {
            return Err(Error::provider(
                "delete dns record",
                record_id,
                "injected failure",
            ));
        }

        state
            .deleted
            .push((zone_id.to_string(), record_id.to_string()));
        Ok(())
    }
}

/// A CNAME record as the provider would list it
pub fn cname_record(id: &str, zone_id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.to_string(),
        zone_id: zone_id.to_string(),
        name: name.to_string(),
        record_type: "CNAME".to_string(),
        content: content.to_string(),
        ttl: 1,
        proxied: true,
        comment: None,
    }
}
