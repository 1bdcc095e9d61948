//! Capability connectors for the demo resources.
//!
//! `HttpConnector` is registered at link time via `inventory` and only
//! carries default options (the codec keys a transport-facing resource
//! usually wants). `ModelConnector` wraps a `MemoryStore` and supplies the
//! read/destroy-style handlers, bound late so they observe the concrete
//! resource type they serve.

use std::sync::Arc;

use restkit::{
    Binding, Connector, ConnectorRegistration, EmptyBinding, MemberTable, Operation, RequestCtx,
    ResourceDecl, ResourceError, ResourceType,
};

use crate::store::MemoryStore;

/// Options-only connector mirroring a transport binding: it defaults the
/// codec key lists but defines no members.
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn defaults(&self) -> ResourceDecl {
        ResourceDecl::new()
            .serializers(["json", "url"])
            .deserializers(["json", "url"])
    }

    fn bind(&self, _resource: &Arc<ResourceType>) -> anyhow::Result<Arc<dyn Binding>> {
        Ok(Arc::new(EmptyBinding))
    }
}

inventory::submit! {
    ConnectorRegistration(|registry| registry.register(Arc::new(HttpConnector)))
}

/// Model connector backed by an in-memory store.
pub struct ModelConnector {
    name: &'static str,
    store: Arc<MemoryStore>,
}

impl ModelConnector {
    pub fn new(name: &'static str, store: Arc<MemoryStore>) -> Self {
        ModelConnector { name, store }
    }
}

impl Connector for ModelConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn bind(&self, resource: &Arc<ResourceType>) -> anyhow::Result<Arc<dyn Binding>> {
        let mut table = MemberTable::new();

        // Weak, or the binding would keep its own resource type alive
        // through the member table it is stored in.
        let weak = Arc::downgrade(resource);
        let store = Arc::clone(&self.store);
        table.operation(
            Operation::Read,
            Arc::new(move |ctx: &RequestCtx| {
                let Some(resource) = weak.upgrade() else {
                    return Err(ResourceError::NotFound);
                };
                resource.read(store.as_ref(), ctx)
            }),
        );

        Ok(Arc::new(table))
    }
}
