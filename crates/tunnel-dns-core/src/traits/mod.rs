// # Port Traits
//
// Interfaces the reconciliation core consumes. Implementations live in
// their own crates (e.g. `tunnel-dns-provider-cloudflare`).

pub mod dns_api;

pub use dns_api::DnsApi;
