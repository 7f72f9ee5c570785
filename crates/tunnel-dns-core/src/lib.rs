// # tunnel-dns-core
//
// Core library for the tunnel ingress / DNS reconciliation engine.
//
// ## Architecture Overview
//
// - **RuleSet**: ordered hostname-to-service bindings for one tunnel;
//   first match wins downstream, so ordering is part of the contract
// - **ZoneIndex**: per-pass snapshot of provider zones and records
// - **Planner** (`plan`): diffs routing state against DNS state into a
//   minimal changeset, including orphan cleanup
// - **Applier** (`apply`): executes a changeset with partial-failure
//   aggregation
// - **Reconciler** (`engine`): the port exposed to the routing
//   collaborator, serializing passes per tunnel
// - **DnsApi** (`traits`): the provider port this engine consumes
//
// ## Design Principles
//
// 1. **Snapshots, not shared state**: rule sets and zone indexes are value
//    snapshots passed through the pipeline; nothing here is global
// 2. **Ports at the seams**: all provider I/O goes through the `DnsApi`
//    trait; implementations live in their own crates
// 3. **Fail-fast in, aggregate out**: rule mutation aborts on the first
//    error, DNS application attempts every change and reports a composite

pub mod apply;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod filter;
pub mod plan;
pub mod rules;
pub mod traits;
pub mod zones;

// Re-export core types for convenience
pub use config::ReconcilerConfig;
pub use endpoint::{Endpoint, EndpointChanges, RecordType, TTL_AUTO};
pub use engine::Reconciler;
pub use error::{Error, ErrorList, Result};
pub use filter::DomainFilter;
pub use plan::{Change, ChangeAction, TUNNEL_DOMAIN, tunnel_changeset, tunnel_uri};
pub use rules::{IngressRule, RuleSet};
pub use traits::DnsApi;
pub use zones::{DnsRecord, Zone, ZoneIndex};
