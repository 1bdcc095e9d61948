//! Capability connectors: named, pluggable behavior + options modules that
//! are mixed into a resource type at construction time.
//!
//! A connector contributes two things. Its `defaults()` fragment is merged
//! into the resource configuration fill-in-only (a connector supplies
//! defaults, never overrides). Its `bind()` step produces a [`Binding`]
//! against the concrete resource type; bindings are collected in declared
//! order and member lookup falls through them first, then to the resource's
//! own members. Binding to the receiver is explicit here, replacing the
//! descriptor-protocol tricks such mixins rely on elsewhere.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::errors::{ConfigError, ResourceError};
use crate::fields::HostValue;
use crate::operations::Operation;
use crate::options::ResourceDecl;
use crate::resource::ResourceType;

/// Everything a handler needs from the inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestCtx {
    /// Identity value addressing a single instance, when the request has one.
    pub slug: Option<String>,
    /// Deserialized request payload, when the request carried one.
    pub body: Option<Value>,
    /// Query filter parameters, attribute path to requested values.
    pub filters: Vec<(String, Vec<String>)>,
}

impl RequestCtx {
    pub fn detail(slug: impl Into<String>) -> Self {
        RequestCtx {
            slug: Some(slug.into()),
            ..RequestCtx::default()
        }
    }
}

/// What an operation handler produced.
pub enum Outcome {
    One(HostValue),
    Many(Vec<HostValue>),
    Nothing,
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::One(_) => f.write_str("One"),
            Outcome::Many(items) => f.debug_tuple("Many").field(&items.len()).finish(),
            Outcome::Nothing => f.write_str("Nothing"),
        }
    }
}

/// An operation handler, bound to its resource type.
pub type Handler = Arc<dyn Fn(&RequestCtx) -> Result<Outcome, ResourceError> + Send + Sync>;

/// A connector's behavior, already bound to a concrete resource type.
pub trait Binding: Send + Sync {
    /// Return the handler this binding defines under `name`, if any.
    /// Lookup across bindings is ordered and first-definition-wins.
    fn member(&self, name: &str) -> Option<Handler>;
}

/// A named capability module.
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Options fragment merged into the resource configuration as defaults.
    fn defaults(&self) -> ResourceDecl {
        ResourceDecl::default()
    }

    /// Bind this connector's behavior to the concrete resource type. The
    /// binding observes the finished type, not the connector itself, so
    /// capability-supplied handlers see the resource they serve.
    fn bind(&self, resource: &Arc<ResourceType>) -> anyhow::Result<Arc<dyn Binding>>;
}

/// A binding with no members; useful for connectors that only carry options.
pub struct EmptyBinding;

impl Binding for EmptyBinding {
    fn member(&self, _name: &str) -> Option<Handler> {
        None
    }
}

/// Convenience binding backed by a member table.
#[derive(Default)]
pub struct MemberTable {
    members: Vec<(String, Handler)>,
}

impl MemberTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Handler) {
        self.members.push((name.into(), handler));
    }

    pub fn operation(&mut self, operation: Operation, handler: Handler) {
        self.insert(operation.as_str(), handler);
    }
}

impl Binding for MemberTable {
    fn member(&self, name: &str) -> Option<Handler> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, handler)| Arc::clone(handler))
    }
}

/// Registration submitted at link time via `inventory::submit!`.
pub struct ConnectorRegistration(pub fn(&ConnectorRegistry));

inventory::collect!(ConnectorRegistration);

/// Process-wide registry of capability connectors, keyed by name.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: DashMap<&'static str, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover link-time registrations and let them fill the registry.
    pub fn discover() -> Self {
        let registry = Self::new();
        for registration in inventory::iter::<ConnectorRegistration> {
            registration.0(&registry);
        }
        registry
    }

    pub fn register(&self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.name(), connector);
    }

    /// Unresolvable connector name is a fatal configuration error; type
    /// construction fails fast rather than deferring to request time.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Connector>, ConfigError> {
        self.connectors
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ConfigError::UnknownConnector(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.connectors.iter().map(|entry| *entry.key()).collect()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("connectors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullConnector;

    impl Connector for NullConnector {
        fn name(&self) -> &'static str {
            "null"
        }

        fn bind(&self, _resource: &Arc<ResourceType>) -> anyhow::Result<Arc<dyn Binding>> {
            Ok(Arc::new(EmptyBinding))
        }
    }

    #[test]
    fn registry_resolves_by_name() {
        let registry = ConnectorRegistry::new();
        registry.register(Arc::new(NullConnector));
        assert!(registry.get("null").is_ok());
    }

    #[test]
    fn unknown_connector_is_fatal() {
        let registry = ConnectorRegistry::new();
        // `unwrap_err` needs the Ok type to be Debug, which the trait
        // object is not.
        let err = registry.get("missing").err().unwrap();
        assert!(matches!(err, ConfigError::UnknownConnector(_)));
    }

    #[test]
    fn member_table_is_ordered_first_wins() {
        let mut table = MemberTable::new();
        table.insert("read", Arc::new(|_: &RequestCtx| Ok(Outcome::Nothing)));
        assert!(table.member("read").is_some());
        assert!(table.member("destroy").is_none());
    }
}
