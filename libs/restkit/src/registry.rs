//! Process-wide registries and the environment handle that groups them.
//!
//! The resource registry maps resource names to their constructed types; it
//! is populated as each type is built (before any request traffic exists)
//! and afterwards only read, by relation resolution and by whatever routing
//! layer sits on top. Grouping the registries in an explicit
//! [`Environment`] keeps construction testable: no globals, each test spins
//! up its own.

use std::sync::Arc;

use dashmap::DashMap;

use crate::connectors::ConnectorRegistry;
use crate::errors::ConfigError;
use crate::negotiation::CodecRegistry;
use crate::options::ResourceDecl;
use crate::resource::ResourceType;

/// Mapping from resource name to constructed resource type.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: DashMap<String, Arc<ResourceType>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, resource: Arc<ResourceType>) -> Result<(), ConfigError> {
        let name = resource.options.name.clone();
        if self.resources.contains_key(&name) {
            return Err(ConfigError::DuplicateResource(name));
        }
        self.resources.insert(name, resource);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResourceType>> {
        self.resources
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn names(&self) -> Vec<String> {
        self.resources.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.names())
            .finish()
    }
}

/// Everything resource-type construction needs: the connector and codec
/// registries, the resource registry being populated, and the process-wide
/// default configuration fragment that seeds every merge.
pub struct Environment {
    pub connectors: ConnectorRegistry,
    pub codecs: CodecRegistry,
    pub resources: ResourceRegistry,
    pub defaults: ResourceDecl,
}

impl Environment {
    /// Environment with link-time discovered connectors and no defaults.
    pub fn new() -> Self {
        Environment {
            connectors: ConnectorRegistry::discover(),
            codecs: CodecRegistry::new(),
            resources: ResourceRegistry::new(),
            defaults: ResourceDecl::default(),
        }
    }

    /// Environment with nothing pre-registered; used by tests that want
    /// full control over the connector set.
    pub fn empty() -> Self {
        Environment {
            connectors: ConnectorRegistry::new(),
            codecs: CodecRegistry::new(),
            resources: ResourceRegistry::new(),
            defaults: ResourceDecl::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: ResourceDecl) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
