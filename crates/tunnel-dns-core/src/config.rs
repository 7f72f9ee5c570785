//! Configuration types for the reconciliation engine
//!
//! Credential loading and environment parsing belong to the binary; the
//! engine consumes an already-assembled, validated configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Provider account owning the tunnel
    pub account_id: String,

    /// Tunnel whose ingress rules this engine reconciles
    pub tunnel_id: String,

    /// Allow-list of domains this engine may manage; empty allows all
    #[serde(default)]
    pub domain_filter: Vec<String>,

    /// Plan but never mutate provider state
    #[serde(default)]
    pub dry_run: bool,

    /// Also write the DNS changeset after updating tunnel ingress
    #[serde(default)]
    pub sync_dns: bool,
}

impl ReconcilerConfig {
    /// Create a configuration for one tunnel with default toggles
    pub fn new(account_id: impl Into<String>, tunnel_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            tunnel_id: tunnel_id.into(),
            domain_filter: Vec::new(),
            dry_run: false,
            sync_dns: false,
        }
    }

    /// Set the domain allow-list
    pub fn with_domain_filter(mut self, domains: Vec<String>) -> Self {
        self.domain_filter = domains;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable DNS changeset application
    pub fn with_sync_dns(mut self, sync_dns: bool) -> Self {
        self.sync_dns = sync_dns;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_empty() {
            return Err(crate::Error::config("account id cannot be empty"));
        }

        if self.tunnel_id.is_empty() {
            return Err(crate::Error::config("tunnel id cannot be empty"));
        }

        Ok(())
    }
}
