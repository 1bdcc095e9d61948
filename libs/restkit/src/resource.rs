//! The frozen resource type: one merged configuration, one field table, one
//! negotiation map, one ordered connector binding list.
//!
//! Construction happens once, at startup, through [`ResourceTypeBuilder`];
//! everything it produces is read-only afterwards and shared across
//! arbitrarily many concurrent requests without locking. The only state
//! that mutates later is the per-field accessor cache, which guards itself
//! (see [`crate::fields`]).

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use http::Method;
use serde_json::{Map, Value};

use crate::connectors::{Binding, Handler, Outcome, RequestCtx};
use crate::errors::{ConfigError, ResourceError};
use crate::fields::{Field, Host};
use crate::negotiation::NegotiationMap;
use crate::operations::{self, Operation};
use crate::options::{ResourceDecl, ResourceOptions, Scope};
use crate::registry::Environment;

/// Hook applied to a resolved attribute value before it enters the prepared
/// representation. Defaults to identity.
pub type PrepareFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Stock preparation hook for boolean-ish text values.
pub fn clean_boolean(value: Value) -> Value {
    const TRUE: [&str; 6] = ["true", "t", "yes", "y", "on", "1"];
    const FALSE: [&str; 6] = ["false", "f", "no", "n", "off", "0"];

    match &value {
        Value::String(text) => {
            let lowered = text.trim().to_ascii_lowercase();
            if TRUE.contains(&lowered.as_str()) {
                Value::Bool(true)
            } else if FALSE.contains(&lowered.as_str()) {
                Value::Bool(false)
            } else {
                value
            }
        }
        _ => value,
    }
}

/// Queryable collection supplied by the persistence collaborator. Treated
/// as an opaque host-object source; no query semantics are assumed beyond
/// these three shapes.
pub trait Queryable: Send + Sync {
    fn all(&self) -> Vec<Arc<dyn Host>>;

    /// At most one record whose `path` value renders equal to `value`.
    fn find_by(&self, path: &str, value: &str) -> Option<Arc<dyn Host>>;

    /// All records whose `path` value renders equal to any of `values`.
    fn filter_by(&self, path: &str, values: &[String]) -> Vec<Arc<dyn Host>>;
}

/// A declared schema + configuration unit exposing CRUD-like operations
/// over some backing data.
pub struct ResourceType {
    pub options: ResourceOptions,
    /// Declared attributes as runtime fields, keyed by declared name.
    pub attributes: BTreeMap<String, Field>,
    pub negotiation: NegotiationMap,
    preparers: BTreeMap<String, PrepareFn>,
    own_members: Vec<(String, Handler)>,
    /// Ordered (connector name, binding) pairs; set once during build.
    bindings: OnceLock<Vec<(String, Arc<dyn Binding>)>>,
}

impl ResourceType {
    /// Check verb legality for a scope. HEAD and OPTIONS always pass; every
    /// resource answers metadata verbs regardless of declared operations.
    pub fn assert_method_allowed(
        &self,
        method: &Method,
        scope: Scope,
    ) -> Result<(), ResourceError> {
        if *method == Method::HEAD || *method == Method::OPTIONS {
            return Ok(());
        }

        let allowed = match scope {
            Scope::Resource => &self.options.http_allowed_methods,
            Scope::List => &self.options.http_list_allowed_methods,
            Scope::Detail => &self.options.http_detail_allowed_methods,
        };

        if allowed.contains(method) {
            return Ok(());
        }

        let allowed = self.options.methods_for_scope(scope);
        tracing::warn!(
            resource = %self.options.name,
            method = %method,
            allow = %operations::format_allow(&allowed),
            "method not allowed"
        );
        Err(ResourceError::MethodNotAllowed {
            method: method.clone(),
            allowed,
        })
    }

    /// `Allow` header value for a scope, in canonical order.
    pub fn allow_header(&self, scope: Scope) -> String {
        operations::format_allow(&self.options.methods_for_scope(scope))
    }

    /// Ordered member lookup: connector bindings first (declared order,
    /// first definition wins), then the resource's own member table.
    pub fn member(&self, name: &str) -> Option<Handler> {
        if let Some(bindings) = self.bindings.get() {
            for (_, binding) in bindings {
                if let Some(handler) = binding.member(name) {
                    return Some(handler);
                }
            }
        }
        self.own_members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Run the handler for an abstract operation. A recognized operation
    /// with no handler anywhere is `NotImplemented`.
    pub fn invoke(&self, operation: Operation, ctx: &RequestCtx) -> Result<Outcome, ResourceError> {
        match self.member(operation.as_str()) {
            Some(handler) => handler(ctx),
            None => Err(ResourceError::NotImplemented {
                member: operation.as_str().to_string(),
            }),
        }
    }

    /// Verb-only dispatch: checks legality, then runs the first legal
    /// candidate operation that has a handler. Transports that disambiguate
    /// PUT/PATCH by payload semantics should call [`ResourceType::invoke`]
    /// with the operation they resolved instead.
    pub fn dispatch(
        &self,
        method: &Method,
        scope: Scope,
        ctx: &RequestCtx,
    ) -> Result<Outcome, ResourceError> {
        self.assert_method_allowed(method, scope)?;

        if *method == Method::HEAD || *method == Method::OPTIONS {
            return Ok(Outcome::Nothing);
        }

        // A verb the mapper does not know cannot reach here legally; the
        // configured method sets only contain mapped verbs.
        let candidates =
            operations::method_to_operations(method).map_err(|_| ResourceError::MethodNotAllowed {
                method: method.clone(),
                allowed: self.options.methods_for_scope(scope),
            })?;

        let legal = self.options.operations_for_scope(scope);
        let mut recognized = None;
        for candidate in &candidates {
            if !legal.contains(candidate) {
                continue;
            }
            recognized = Some(*candidate);
            if self.member(candidate.as_str()).is_some() {
                return self.invoke(*candidate, ctx);
            }
        }

        match recognized {
            Some(operation) => Err(ResourceError::NotImplemented {
                member: operation.as_str().to_string(),
            }),
            None => Err(ResourceError::MethodNotAllowed {
                method: method.clone(),
                allowed: self.options.methods_for_scope(scope),
            }),
        }
    }

    /// Resolve every visible attribute against a host object and apply the
    /// preparation table. Absent collection values normalize to an empty
    /// array here, at the consuming call site, never inside the resolver;
    /// absent scalar values stay null.
    pub fn prepare_record(&self, host: &dyn Host) -> Map<String, Value> {
        let mut record = Map::new();
        for (name, field) in &self.attributes {
            if !field.attribute.visible {
                continue;
            }
            let value = match field.resolve(host) {
                Some(value) => value.into_json(),
                None if field.attribute.collection => Value::Array(Vec::new()),
                None => Value::Null,
            };
            let value = match self.preparers.get(name) {
                Some(prepare) => prepare(value),
                None => value,
            };
            record.insert(name.clone(), value);
        }
        record
    }

    /// Identity lookup against a queryable collection; an empty result is a
    /// `NotFound` outcome for the transport layer to render.
    pub fn find(&self, store: &dyn Queryable, slug: &str) -> Result<Arc<dyn Host>, ResourceError> {
        let path = self.options.slug.path.as_deref().unwrap_or("id");
        store.find_by(path, slug).ok_or(ResourceError::NotFound)
    }

    /// The read operation shape shared by model-style connectors: slug
    /// lookup, filtered listing, or the whole collection.
    pub fn read(&self, store: &dyn Queryable, ctx: &RequestCtx) -> Result<Outcome, ResourceError> {
        if let Some(slug) = &ctx.slug {
            let record = self.find(store, slug)?;
            return Ok(Outcome::One(crate::fields::HostValue::Object(record)));
        }

        if !ctx.filters.is_empty() {
            let mut records: Vec<Arc<dyn Host>> = Vec::new();
            for (path, values) in &ctx.filters {
                records.extend(store.filter_by(path, values));
            }
            return Ok(Outcome::Many(
                records
                    .into_iter()
                    .map(crate::fields::HostValue::Object)
                    .collect(),
            ));
        }

        Ok(Outcome::Many(
            store
                .all()
                .into_iter()
                .map(crate::fields::HostValue::Object)
                .collect(),
        ))
    }

    /// Connector names in resolution order.
    pub fn connector_names(&self) -> Vec<&str> {
        self.bindings
            .get()
            .map(|bindings| bindings.iter().map(|(name, _)| name.as_str()).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.options.name)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("connectors", &self.connector_names())
            .finish()
    }
}

/// Two-phase construction: collect raw fragments and hooks, then merge,
/// cascade, bind, and register in one pass.
pub struct ResourceTypeBuilder {
    own: ResourceDecl,
    ancestors: Vec<ResourceDecl>,
    preparers: BTreeMap<String, PrepareFn>,
    own_members: Vec<(String, Handler)>,
}

impl ResourceTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ResourceTypeBuilder {
            own: ResourceDecl::new().name(name),
            ancestors: Vec::new(),
            preparers: BTreeMap::new(),
            own_members: Vec::new(),
        }
    }

    /// Append an ancestor fragment. Call in base-to-derived order; later
    /// fragments win ties, and the own fragment wins over all of them.
    pub fn ancestor(mut self, fragment: ResourceDecl) -> Self {
        self.ancestors.push(fragment);
        self
    }

    /// Edit the type's own fragment.
    pub fn configure(mut self, f: impl FnOnce(ResourceDecl) -> ResourceDecl) -> Self {
        self.own = f(self.own);
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: crate::Attribute) -> Self {
        self.own = self.own.attribute(name, attribute);
        self
    }

    /// Override the preparation hook for one attribute.
    pub fn prepare(
        mut self,
        name: impl Into<String>,
        hook: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.preparers.insert(name.into(), Arc::new(hook));
        self
    }

    /// Define an operation handler on the resource itself; connector
    /// bindings are consulted first at lookup time.
    pub fn member(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&RequestCtx) -> Result<Outcome, ResourceError> + Send + Sync + 'static,
    ) -> Self {
        self.own_members.push((name.into(), Arc::new(handler)));
        self
    }

    /// Merge, cascade, freeze, bind connectors, and register the type.
    pub fn build(self, env: &Environment) -> Result<Arc<ResourceType>, ConfigError> {
        let mut merged = ResourceOptions::merge(&env.defaults, &self.ancestors, &self.own);

        // Resolve connector names before cascading so their defaults
        // participate in the merge, fill-in only.
        let connector_names = merged.connectors.clone().unwrap_or_default();
        let mut connectors = Vec::with_capacity(connector_names.len());
        for name in &connector_names {
            let connector = env.connectors.get(name)?;
            merged.apply_defaults(&connector.defaults());
            connectors.push(connector);
        }

        let options = ResourceOptions::resolve(merged)?;
        let negotiation = NegotiationMap::build(
            &env.codecs,
            &options.allowed_serializers,
            &options.allowed_deserializers,
        )?;

        let mut attributes = BTreeMap::new();
        for (name, attribute) in &options.include {
            attributes.insert(
                name.clone(),
                Field::new(options.name.clone(), name.clone(), attribute.clone()),
            );
        }

        // Every attribute gets a preparer; identity unless overridden.
        let mut preparers = self.preparers;
        for name in attributes.keys() {
            preparers
                .entry(name.clone())
                .or_insert_with(|| Arc::new(|value| value));
        }

        let resource = Arc::new(ResourceType {
            options,
            attributes,
            negotiation,
            preparers,
            own_members: self.own_members,
            bindings: OnceLock::new(),
        });

        // The explicit bind-to-receiver step: each connector observes the
        // concrete, fully merged resource type.
        let mut bindings = Vec::with_capacity(connectors.len());
        for connector in &connectors {
            let binding =
                connector
                    .bind(&resource)
                    .map_err(|source| ConfigError::ConnectorBind {
                        connector: connector.name().to_string(),
                        resource: resource.options.name.clone(),
                        source,
                    })?;
            bindings.push((connector.name().to_string(), binding));
        }
        // Freshly created Arc; the cell cannot already be populated.
        let _ = resource.bindings.set(bindings);

        tracing::info!(
            resource = %resource.options.name,
            connectors = ?connector_names,
            allow = %resource.allow_header(Scope::Resource),
            "resource type constructed"
        );

        env.resources.register(Arc::clone(&resource))?;
        Ok(resource)
    }
}
