//! Ordered tunnel ingress rules
//!
//! The tunnel router evaluates its ingress rules in sequence and routes a
//! request with the first matching hostname. Ordering is therefore part of
//! the contract, not an implementation detail: new rules are prepended so
//! they are evaluated before older, more general rules such as a trailing
//! catch-all.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::endpoint::{Endpoint, EndpointChanges, RecordType};
use crate::error::{Error, Result};

/// One hostname-to-service binding consumed by the tunnel router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Hostname routed by this rule; empty for a catch-all rule
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Service the hostname is routed to
    pub service: String,
}

impl IngressRule {
    /// Create a new ingress rule
    pub fn new(hostname: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            service: service.into(),
        }
    }
}

/// Ordered collection of ingress rules for one tunnel
///
/// Hostnames are unique across the set whenever the set is consistent; the
/// mutation operations below uphold that invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<IngressRule>);

impl RuleSet {
    /// Create a rule set from an existing ordered rule list
    pub fn new(rules: Vec<IngressRule>) -> Self {
        Self(rules)
    }

    /// The rules in evaluation order
    pub fn rules(&self) -> &[IngressRule] {
        &self.0
    }

    /// Consume the set, yielding the ordered rule list
    pub fn into_inner(self) -> Vec<IngressRule> {
        self.0
    }

    /// Number of rules in the set
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no rules
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bind `hostname` to `service`, prepending the new rule
    ///
    /// Creating an identical binding twice is a no-op. A hostname already
    /// bound to a different service is owned by that service and must not
    /// be silently overwritten; such a create fails with
    /// [`Error::Conflict`] and leaves the set unchanged.
    pub fn create_rule(&mut self, hostname: &str, service: &str) -> Result<()> {
        for rule in &self.0 {
            if rule.hostname == hostname && rule.service == service {
                debug!(hostname, service, "rule already exists, skipping");
                return Ok(());
            }

            if rule.hostname == hostname {
                return Err(Error::Conflict {
                    hostname: hostname.to_string(),
                    service: rule.service.clone(),
                });
            }
        }

        self.0.insert(0, IngressRule::new(hostname, service));
        Ok(())
    }

    /// Rewrite the service of the rule bound to `hostname`, in place
    ///
    /// The rule keeps its position in the evaluation order. Fails with
    /// [`Error::NotFound`] when no rule has that hostname.
    pub fn update_rule(&mut self, hostname: &str, service: &str) -> Result<()> {
        for rule in &mut self.0 {
            if rule.hostname == hostname {
                rule.service = service.to_string();
                return Ok(());
            }
        }

        Err(Error::not_found(hostname))
    }

    /// Remove the first rule bound to `hostname`
    ///
    /// Relative order of the remaining rules is preserved. Fails with
    /// [`Error::NotFound`] when no rule has that hostname.
    pub fn delete_rule(&mut self, hostname: &str) -> Result<()> {
        for (i, rule) in self.0.iter().enumerate() {
            if rule.hostname == hostname {
                self.0.remove(i);
                return Ok(());
            }
        }

        Err(Error::not_found(hostname))
    }

    /// Fold a batch of endpoint changes into the set
    ///
    /// Creates, then updates, then deletes, in that order. Only CNAME
    /// endpoints are considered; other record kinds are ignored. The first
    /// failure aborts the whole call and may leave the set partially
    /// mutated; the caller must treat the entire apply as failed.
    pub fn apply_changes(&mut self, changes: &EndpointChanges) -> Result<()> {
        for endpoint in routable(&changes.create) {
            self.create_rule(&endpoint.dns_name, first_target(endpoint)?)?;
        }

        for endpoint in routable(&changes.update_new) {
            self.update_rule(&endpoint.dns_name, first_target(endpoint)?)?;
        }

        for endpoint in routable(&changes.delete) {
            self.delete_rule(&endpoint.dns_name)?;
        }

        Ok(())
    }
}

fn routable(endpoints: &[Endpoint]) -> impl Iterator<Item = &Endpoint> {
    endpoints
        .iter()
        .filter(|e| e.record_type == RecordType::Cname)
}

fn first_target(endpoint: &Endpoint) -> Result<&str> {
    endpoint
        .targets
        .first()
        .map(String::as_str)
        .ok_or_else(|| Error::config(format!("endpoint {} has no targets", endpoint.dns_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> RuleSet {
        RuleSet::new(vec![IngressRule::new("example.com", "service1")])
    }

    #[test]
    fn create_rule_is_idempotent() {
        let mut rules = seeded();

        rules.create_rule("example.com", "service1").unwrap();
        assert_eq!(rules.len(), 1);

        rules.create_rule("example2.com", "service2").unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn create_rule_prepends_new_rules() {
        let mut rules = seeded();

        rules.create_rule("new.example.com", "service2").unwrap();

        assert_eq!(rules.rules()[0].hostname, "new.example.com");
        assert_eq!(rules.rules()[1].hostname, "example.com");
    }

    #[test]
    fn create_rule_conflict_leaves_set_unchanged() {
        let mut rules = seeded();

        let err = rules.create_rule("example.com", "service2").unwrap_err();

        assert!(
            matches!(&err, Error::Conflict { hostname, service }
                if hostname == "example.com" && service == "service1")
        );
        assert_eq!(rules, seeded());
    }

    #[test]
    fn update_rule_rewrites_in_place() {
        let mut rules = RuleSet::new(vec![
            IngressRule::new("a.example.com", "svc-a"),
            IngressRule::new("b.example.com", "svc-b"),
        ]);

        rules.update_rule("b.example.com", "svc-b2").unwrap();

        assert_eq!(rules.rules()[1], IngressRule::new("b.example.com", "svc-b2"));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn update_rule_missing_hostname_fails() {
        let mut rules = seeded();

        let err = rules.update_rule("example2.com", "service3").unwrap_err();

        assert_eq!(
            err.to_string(),
            "rule for hostname example2.com does not exist"
        );
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn delete_rule_twice_fails_second_time() {
        let mut rules = seeded();

        rules.delete_rule("example.com").unwrap();
        assert!(rules.is_empty());

        let err = rules.delete_rule("example.com").unwrap_err();
        assert!(matches!(err, Error::NotFound(h) if h == "example.com"));
    }

    #[test]
    fn delete_rule_preserves_remaining_order() {
        let mut rules = RuleSet::new(vec![
            IngressRule::new("a.example.com", "svc-a"),
            IngressRule::new("b.example.com", "svc-b"),
            IngressRule::new("c.example.com", "svc-c"),
        ]);

        rules.delete_rule("b.example.com").unwrap();

        assert_eq!(rules.rules()[0].hostname, "a.example.com");
        assert_eq!(rules.rules()[1].hostname, "c.example.com");
    }

    #[test]
    fn apply_changes_runs_creates_updates_deletes_in_order() {
        let mut rules = seeded();

        let changes = EndpointChanges {
            create: vec![Endpoint::cname("example2.com", "service2")],
            update_new: vec![Endpoint::cname("example.com", "service3")],
            delete: vec![Endpoint::cname("example2.com", "service2")],
            ..Default::default()
        };

        rules.apply_changes(&changes).unwrap();

        assert_eq!(
            rules,
            RuleSet::new(vec![IngressRule::new("example.com", "service3")])
        );
    }

    #[test]
    fn apply_changes_ignores_non_cname_endpoints() {
        let mut rules = seeded();

        let changes = EndpointChanges {
            create: vec![Endpoint {
                dns_name: "ip.example.com".to_string(),
                targets: vec!["192.0.2.1".to_string()],
                record_type: RecordType::A,
                record_ttl: 300,
            }],
            ..Default::default()
        };

        rules.apply_changes(&changes).unwrap();
        assert_eq!(rules, seeded());
    }

    #[test]
    fn apply_changes_aborts_on_first_failure() {
        let mut rules = seeded();

        let changes = EndpointChanges {
            update_new: vec![
                Endpoint::cname("missing.example.com", "svc"),
                Endpoint::cname("example.com", "service9"),
            ],
            ..Default::default()
        };

        assert!(rules.apply_changes(&changes).is_err());
        // The failing update aborted before the second one ran.
        assert_eq!(rules.rules()[0].service, "service1");
    }
}
