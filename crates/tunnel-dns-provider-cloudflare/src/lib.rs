// # Cloudflare Provider
//
// Implements the `DnsApi` port against the Cloudflare API v4: tunnel
// configuration (cfd_tunnel) plus zone and DNS record management.
//
// The implementation is deliberately single-shot: one logical port call
// maps to the minimal set of HTTP requests and errors are propagated to
// the engine unmodified. There is no retry, backoff, or caching here;
// batch coordination is owned by the reconciliation core.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Tunnel configuration: GET/PUT `/accounts/:account_id/cfd_tunnel/:tunnel_id/configurations`
// - List zones: GET `/zones`
// - DNS records: GET/POST `/zones/:zone_id/dns_records`,
//   PUT/DELETE `/zones/:zone_id/dns_records/:record_id`
//
// ## Security
//
// Credentials never appear in logs; the `Debug` implementation redacts
// them.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tunnel_dns_core::error::{Error, Result};
use tunnel_dns_core::rules::IngressRule;
use tunnel_dns_core::traits::DnsApi;
use tunnel_dns_core::zones::{DnsRecord, Zone};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size used when listing zones and records
const PAGE_SIZE: u32 = 50;

/// Credentials accepted by the Cloudflare API
enum Auth {
    /// Scoped API token (preferred)
    Token(String),
    /// Legacy global key plus account email
    Key { key: String, email: String },
}

/// Cloudflare implementation of the provider port
pub struct CloudflareApi {
    auth: Auth,
    client: reqwest::Client,
    base_url: String,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.auth {
            Auth::Token(_) => "token <REDACTED>",
            Auth::Key { .. } => "key <REDACTED>",
        };
        f.debug_struct("CloudflareApi")
            .field("auth", &auth)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareApi {
    /// Create a client authenticating with a scoped API token
    pub fn with_api_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::config("cloudflare api token cannot be empty"));
        }

        Ok(Self {
            auth: Auth::Token(token),
            client: http_client()?,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        })
    }

    /// Create a client authenticating with a global API key and email
    pub fn with_api_key(key: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let email = email.into();
        if key.is_empty() {
            return Err(Error::config("cloudflare api key cannot be empty"));
        }
        if email.is_empty() {
            return Err(Error::config(
                "cloudflare api email must be set when using an api key",
            ));
        }

        Ok(Self {
            auth: Auth::Key { key, email },
            client: http_client()?,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API base URL (for tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        match &self.auth {
            Auth::Token(token) => builder.bearer_auth(token),
            Auth::Key { key, email } => builder
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }

    /// Send a request and decode the v4 response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        target: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::provider(operation, target, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());

            let message = match status.as_u16() {
                401 | 403 => format!(
                    "authentication failed: invalid credentials or insufficient permissions ({status})"
                ),
                404 => format!("not found ({status})"),
                409 => format!("conflict: resource is being modified by another process ({status})"),
                429 => format!("rate limit exceeded, retry later ({status})"),
                500..=599 => format!("cloudflare server error (transient): {status} - {body}"),
                _ => format!("{status} - {body}"),
            };

            return Err(Error::provider(operation, target, message));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider(operation, target, format!("failed to parse response: {e}"))
        })?;

        if !envelope.success {
            let message = if envelope.errors.is_empty() {
                "api reported failure without errors".to_string()
            } else {
                envelope
                    .errors
                    .iter()
                    .map(|e| format!("{} (code {})", e.message, e.code))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(Error::provider(operation, target, message));
        }

        Ok(envelope)
    }

    /// Fetch the raw tunnel configuration object
    async fn get_tunnel_config(&self, account_id: &str, tunnel_id: &str) -> Result<Value> {
        let url = format!(
            "{}/accounts/{}/cfd_tunnel/{}/configurations",
            self.base_url, account_id, tunnel_id
        );

        let envelope: Envelope<TunnelConfiguration> = self
            .send(
                "get tunnel configuration",
                tunnel_id,
                self.request(reqwest::Method::GET, &url),
            )
            .await?;

        Ok(envelope.result.unwrap_or_default().config)
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))
}

/// Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Default, Deserialize)]
struct TunnelConfiguration {
    #[serde(default)]
    config: Value,
}

/// Extract the ingress rule list from a raw tunnel configuration
fn ingress_from_config(config: &Value) -> Result<Vec<IngressRule>> {
    match config.get("ingress") {
        Some(ingress) => Ok(serde_json::from_value(ingress.clone())?),
        None => Ok(Vec::new()),
    }
}

/// Wire payload for a DNS record create/update
fn record_payload(record: &DnsRecord) -> Value {
    json!({
        "name": record.name,
        "type": record.record_type,
        "content": record.content,
        "ttl": record.ttl,
        "proxied": record.proxied,
        "comment": record.comment,
    })
}

#[async_trait]
impl DnsApi for CloudflareApi {
    async fn get_tunnel_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<Vec<IngressRule>> {
        let config = self.get_tunnel_config(account_id, tunnel_id).await?;
        let ingress = ingress_from_config(&config)?;

        tracing::debug!(tunnel_id, rules = ingress.len(), "fetched tunnel ingress");
        Ok(ingress)
    }

    async fn set_tunnel_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<()> {
        // Read-modify-write: only the ingress list is replaced, every other
        // configuration field is sent back untouched.
        let mut config = self.get_tunnel_config(account_id, tunnel_id).await?;

        if config.is_null() {
            config = json!({});
        }
        config["ingress"] = serde_json::to_value(rules)?;

        let url = format!(
            "{}/accounts/{}/cfd_tunnel/{}/configurations",
            self.base_url, account_id, tunnel_id
        );

        let _: Envelope<Value> = self
            .send(
                "update tunnel configuration",
                tunnel_id,
                self.request(reqwest::Method::PUT, &url)
                    .json(&json!({ "config": config })),
            )
            .await?;

        tracing::debug!(tunnel_id, rules = rules.len(), "updated tunnel ingress");
        Ok(())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/zones?page={}&per_page={}",
                self.base_url, page, PAGE_SIZE
            );

            let envelope: Envelope<Vec<Zone>> = self
                .send("list zones", "zones", self.request(reqwest::Method::GET, &url))
                .await?;

            zones.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.page < info.total_pages => page += 1,
                _ => break,
            }
        }

        tracing::debug!(zones = zones.len(), "listed zones");
        Ok(zones)
    }

    async fn list_zone_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/zones/{}/dns_records?page={}&per_page={}",
                self.base_url, zone_id, page, PAGE_SIZE
            );

            let envelope: Envelope<Vec<DnsRecord>> = self
                .send(
                    "list dns records",
                    zone_id,
                    self.request(reqwest::Method::GET, &url),
                )
                .await?;

            records.extend(envelope.result.unwrap_or_default());

            match envelope.result_info {
                Some(info) if info.page < info.total_pages => page += 1,
                _ => break,
            }
        }

        tracing::debug!(zone_id, records = records.len(), "listed zone records");
        Ok(records)
    }

    async fn create_record(&self, record: DnsRecord) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, record.zone_id);

        let _: Envelope<Value> = self
            .send(
                "create dns record",
                &record.name,
                self.request(reqwest::Method::POST, &url)
                    .json(&record_payload(&record)),
            )
            .await?;

        tracing::debug!(name = %record.name, zone_id = %record.zone_id, "created dns record");
        Ok(())
    }

    async fn update_record(&self, record: DnsRecord) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, record.zone_id, record.id
        );

        let _: Envelope<Value> = self
            .send(
                "update dns record",
                &record.name,
                self.request(reqwest::Method::PUT, &url)
                    .json(&record_payload(&record)),
            )
            .await?;

        tracing::debug!(name = %record.name, record_id = %record.id, "updated dns record");
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, record_id
        );

        let _: Envelope<Value> = self
            .send(
                "delete dns record",
                record_id,
                self.request(reqwest::Method::DELETE, &url),
            )
            .await?;

        tracing::debug!(record_id, "deleted dns record");
        Ok(())
    }
}
