//! Configuration fragments and the deterministic merge engine.
//!
//! Resource configuration is collected in two phases. Phase one gathers raw
//! [`ResourceDecl`] fragments: the process-wide defaults, every ancestor
//! fragment in base-to-derived order, and the type's own fragment last, so a
//! more derived explicit value always wins ties. Phase two
//! ([`ResourceOptions::resolve`]) runs the cascading derivations over the
//! merged fragment and freezes the result. A `ResourceOptions` is built once
//! per resource type and shared read-only across all request traffic.

use std::collections::BTreeMap;

use crate::attributes::Attribute;
use crate::errors::ConfigError;
use crate::helpers::{Parent, Relation};
use crate::operations::{
    self, methods_to_operations, operations_to_methods, MethodSet, Operation, OperationSet,
};

/// A raw, partial configuration fragment. Every key is optional; merging
/// overwrites a key only when the later fragment actually sets it.
#[derive(Debug, Clone, Default)]
pub struct ResourceDecl {
    pub name: Option<String>,

    /// Identity attribute used to address a single resource instance.
    pub slug: Option<Attribute>,

    /// Extra attributes to expose, keyed by declared name. Merged per key,
    /// derived wins.
    pub include: BTreeMap<String, Attribute>,

    pub allowed_operations: Option<OperationSet>,
    pub list_allowed_operations: Option<OperationSet>,
    pub detail_allowed_operations: Option<OperationSet>,

    pub http_allowed_methods: Option<MethodSet>,
    pub http_list_allowed_methods: Option<MethodSet>,
    pub http_detail_allowed_methods: Option<MethodSet>,

    /// Serializer codec keys this resource may respond with.
    pub allowed_serializers: Option<Vec<String>>,
    /// Deserializer codec keys this resource accepts.
    pub allowed_deserializers: Option<Vec<String>>,

    /// Ordered capability names resolved against the connector registry.
    pub connectors: Option<Vec<String>>,

    /// Declared relations, keyed by attribute name. Merged per key.
    pub relations: BTreeMap<String, Relation>,

    pub parent: Option<Parent>,
}

impl ResourceDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every key the `other` fragment explicitly sets. This is the
    /// base-to-derived application step: callers apply ancestors first and
    /// the most-derived fragment last.
    pub fn apply(&mut self, other: &ResourceDecl) {
        if other.name.is_some() {
            self.name = other.name.clone();
        }
        if other.slug.is_some() {
            self.slug = other.slug.clone();
        }
        for (key, attribute) in &other.include {
            self.include.insert(key.clone(), attribute.clone());
        }
        if other.allowed_operations.is_some() {
            self.allowed_operations = other.allowed_operations.clone();
        }
        if other.list_allowed_operations.is_some() {
            self.list_allowed_operations = other.list_allowed_operations.clone();
        }
        if other.detail_allowed_operations.is_some() {
            self.detail_allowed_operations = other.detail_allowed_operations.clone();
        }
        if other.http_allowed_methods.is_some() {
            self.http_allowed_methods = other.http_allowed_methods.clone();
        }
        if other.http_list_allowed_methods.is_some() {
            self.http_list_allowed_methods = other.http_list_allowed_methods.clone();
        }
        if other.http_detail_allowed_methods.is_some() {
            self.http_detail_allowed_methods = other.http_detail_allowed_methods.clone();
        }
        if other.allowed_serializers.is_some() {
            self.allowed_serializers = other.allowed_serializers.clone();
        }
        if other.allowed_deserializers.is_some() {
            self.allowed_deserializers = other.allowed_deserializers.clone();
        }
        if other.connectors.is_some() {
            self.connectors = other.connectors.clone();
        }
        for (key, relation) in &other.relations {
            self.relations.insert(key.clone(), relation.clone());
        }
        if other.parent.is_some() {
            self.parent = other.parent.clone();
        }
    }

    /// Fill in keys from a connector's defaults fragment. Connector option
    /// resolution happens after the type's own configuration, so a connector
    /// supplies defaults, never overrides: any key already set anywhere in
    /// the chain is skipped.
    pub fn apply_defaults(&mut self, defaults: &ResourceDecl) {
        if self.name.is_none() {
            self.name = defaults.name.clone();
        }
        if self.slug.is_none() {
            self.slug = defaults.slug.clone();
        }
        for (key, attribute) in &defaults.include {
            self.include
                .entry(key.clone())
                .or_insert_with(|| attribute.clone());
        }
        if self.allowed_operations.is_none() {
            self.allowed_operations = defaults.allowed_operations.clone();
        }
        if self.list_allowed_operations.is_none() {
            self.list_allowed_operations = defaults.list_allowed_operations.clone();
        }
        if self.detail_allowed_operations.is_none() {
            self.detail_allowed_operations = defaults.detail_allowed_operations.clone();
        }
        if self.http_allowed_methods.is_none() {
            self.http_allowed_methods = defaults.http_allowed_methods.clone();
        }
        if self.http_list_allowed_methods.is_none() {
            self.http_list_allowed_methods = defaults.http_list_allowed_methods.clone();
        }
        if self.http_detail_allowed_methods.is_none() {
            self.http_detail_allowed_methods = defaults.http_detail_allowed_methods.clone();
        }
        if self.allowed_serializers.is_none() {
            self.allowed_serializers = defaults.allowed_serializers.clone();
        }
        if self.allowed_deserializers.is_none() {
            self.allowed_deserializers = defaults.allowed_deserializers.clone();
        }
        if self.connectors.is_none() {
            self.connectors = defaults.connectors.clone();
        }
        for (key, relation) in &defaults.relations {
            self.relations
                .entry(key.clone())
                .or_insert_with(|| relation.clone());
        }
        if self.parent.is_none() {
            self.parent = defaults.parent.clone();
        }
    }

    // Fluent setters for declaration sites.

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn slug(mut self, slug: Attribute) -> Self {
        self.slug = Some(slug);
        self
    }

    /// Include an attribute under a declared name.
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.include.insert(name.into(), attribute);
        self
    }

    /// Shorthand: include a name whose path is the name itself.
    pub fn field(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let attribute = Attribute::new(name.clone());
        self.attribute(name, attribute)
    }

    pub fn operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.allowed_operations = Some(operations.into_iter().collect());
        self
    }

    pub fn list_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.list_allowed_operations = Some(operations.into_iter().collect());
        self
    }

    pub fn detail_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.detail_allowed_operations = Some(operations.into_iter().collect());
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = http::Method>) -> Self {
        self.http_allowed_methods = Some(methods.into_iter().collect());
        self
    }

    pub fn list_methods(mut self, methods: impl IntoIterator<Item = http::Method>) -> Self {
        self.http_list_allowed_methods = Some(methods.into_iter().collect());
        self
    }

    pub fn detail_methods(mut self, methods: impl IntoIterator<Item = http::Method>) -> Self {
        self.http_detail_allowed_methods = Some(methods.into_iter().collect());
        self
    }

    pub fn serializers<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_serializers = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn deserializers<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_deserializers = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn connectors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.connectors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn relation(mut self, attribute: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(attribute.into(), relation);
        self
    }

    pub fn parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// The frozen per-type configuration record.
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    pub name: String,
    pub slug: Attribute,
    pub include: BTreeMap<String, Attribute>,

    pub allowed_operations: OperationSet,
    pub list_allowed_operations: OperationSet,
    pub detail_allowed_operations: OperationSet,

    pub http_allowed_methods: MethodSet,
    pub http_list_allowed_methods: MethodSet,
    pub http_detail_allowed_methods: MethodSet,

    pub allowed_serializers: Vec<String>,
    pub allowed_deserializers: Vec<String>,

    pub connectors: Vec<String>,
    pub relations: BTreeMap<String, Relation>,
    pub parent: Option<Parent>,
}

impl ResourceOptions {
    /// Merge the fragment chain and run the cascading derivations.
    ///
    /// `ancestors` must be in base-to-derived order; `own` is applied last.
    /// Connector defaults are not handled here; the resource builder applies
    /// them (fill-in only) between the raw merge and this resolution, since
    /// they need the connector registry.
    pub fn resolve(merged: ResourceDecl) -> Result<ResourceOptions, ConfigError> {
        let name = merged.name.clone().ok_or(ConfigError::MissingName)?;

        // Whole-resource axis. When only one side is given the other is
        // derived; when neither is given, the full CRUD set applies; when
        // both are explicit, each is taken verbatim and checked for
        // consistency instead of converted.
        let (allowed_operations, http_allowed_methods) =
            match (&merged.allowed_operations, &merged.http_allowed_methods) {
                (Some(operations), None) => {
                    (operations.clone(), operations_to_methods(operations))
                }
                (None, Some(methods)) => (methods_to_operations(methods)?, methods.clone()),
                (Some(operations), Some(methods)) => {
                    check_access_consistency(operations, methods)?;
                    (operations.clone(), methods.clone())
                }
                (None, None) => {
                    let operations: OperationSet = Operation::ALL.into_iter().collect();
                    let methods = operations_to_methods(&operations);
                    (operations, methods)
                }
            };

        // Scoped axes follow the precedence chain: explicit scoped
        // operations -> explicit scoped methods converted -> resolved
        // unscoped value. The methods side mirrors it. Exactly one
        // conversion may fire per axis, and an explicit pair is held to
        // the same consistency bar as the unscoped one.
        if let (Some(operations), Some(methods)) = (
            &merged.list_allowed_operations,
            &merged.http_list_allowed_methods,
        ) {
            check_access_consistency(operations, methods)?;
        }
        if let (Some(operations), Some(methods)) = (
            &merged.detail_allowed_operations,
            &merged.http_detail_allowed_methods,
        ) {
            check_access_consistency(operations, methods)?;
        }

        let list_allowed_operations = match (
            &merged.list_allowed_operations,
            &merged.http_list_allowed_methods,
        ) {
            (Some(operations), _) => operations.clone(),
            (None, Some(methods)) => methods_to_operations(methods)?,
            (None, None) => allowed_operations.clone(),
        };
        let http_list_allowed_methods = match (
            &merged.http_list_allowed_methods,
            &merged.list_allowed_operations,
        ) {
            (Some(methods), _) => methods.clone(),
            (None, Some(operations)) => operations_to_methods(operations),
            (None, None) => http_allowed_methods.clone(),
        };

        let detail_allowed_operations = match (
            &merged.detail_allowed_operations,
            &merged.http_detail_allowed_methods,
        ) {
            (Some(operations), _) => operations.clone(),
            (None, Some(methods)) => methods_to_operations(methods)?,
            (None, None) => allowed_operations.clone(),
        };
        let http_detail_allowed_methods = match (
            &merged.http_detail_allowed_methods,
            &merged.detail_allowed_operations,
        ) {
            (Some(methods), _) => methods.clone(),
            (None, Some(operations)) => operations_to_methods(operations),
            (None, None) => http_allowed_methods.clone(),
        };

        // The slug defaults to an integer attribute on `id`, which on most
        // model engines is the primary key.
        let slug = merged
            .slug
            .clone()
            .unwrap_or_else(|| Attribute::integer("id"));

        // Attach declared relations to their same-named include attributes.
        let mut include = merged.include.clone();
        for (key, relation) in &merged.relations {
            if let Some(attribute) = include.get_mut(key) {
                if attribute.relation.is_none() {
                    attribute.relation = Some(relation.clone());
                }
            }
        }

        Ok(ResourceOptions {
            name,
            slug,
            include,
            allowed_operations,
            list_allowed_operations,
            detail_allowed_operations,
            http_allowed_methods,
            http_list_allowed_methods,
            http_detail_allowed_methods,
            allowed_serializers: merged.allowed_serializers.clone().unwrap_or_default(),
            allowed_deserializers: merged.allowed_deserializers.clone().unwrap_or_default(),
            connectors: merged.connectors.clone().unwrap_or_default(),
            relations: merged.relations,
            parent: merged.parent,
        })
    }

    /// Collapse a fragment chain into one merged fragment.
    pub fn merge(
        defaults: &ResourceDecl,
        ancestors: &[ResourceDecl],
        own: &ResourceDecl,
    ) -> ResourceDecl {
        let mut merged = defaults.clone();
        for ancestor in ancestors {
            merged.apply(ancestor);
        }
        merged.apply(own);
        merged
    }

    /// Methods legal for the given scope, in canonical render order.
    pub fn methods_for_scope(&self, scope: Scope) -> Vec<http::Method> {
        let set = match scope {
            Scope::Resource => &self.http_allowed_methods,
            Scope::List => &self.http_list_allowed_methods,
            Scope::Detail => &self.http_detail_allowed_methods,
        };
        operations::sorted_methods(set)
    }

    pub fn operations_for_scope(&self, scope: Scope) -> &OperationSet {
        match scope {
            Scope::Resource => &self.allowed_operations,
            Scope::List => &self.list_allowed_operations,
            Scope::Detail => &self.detail_allowed_operations,
        }
    }
}

/// Whether a request addresses the whole resource, its listing, or a single
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Resource,
    List,
    Detail,
}

/// With both sides explicit, every allowed operation must keep at least one
/// of its verbs, otherwise the declaration contradicts itself.
fn check_access_consistency(
    operations: &OperationSet,
    methods: &MethodSet,
) -> Result<(), ConfigError> {
    for operation in operations {
        let verbs = operations::operation_to_methods(*operation);
        if verbs.is_disjoint(methods) {
            return Err(ConfigError::ConflictingAccess {
                operation: operation.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn ops(list: &[Operation]) -> OperationSet {
        list.iter().copied().collect()
    }

    #[test]
    fn defaults_to_full_crud() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new().name("poll"),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        assert_eq!(options.allowed_operations, Operation::ALL.into_iter().collect());
        assert!(options.http_allowed_methods.contains(&Method::GET));
        assert!(options.http_allowed_methods.contains(&Method::DELETE));
        assert!(options.http_allowed_methods.contains(&Method::HEAD));
        assert!(options.http_allowed_methods.contains(&Method::OPTIONS));
    }

    #[test]
    fn read_only_derives_get_head_options() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new().name("poll").operations([Operation::Read]),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        let expected: MethodSet = [Method::GET, Method::HEAD, Method::OPTIONS]
            .into_iter()
            .collect();
        assert_eq!(options.http_allowed_methods, expected);
        assert_eq!(options.http_list_allowed_methods, expected);
        assert_eq!(options.http_detail_allowed_methods, expected);
    }

    #[test]
    fn most_derived_value_wins() {
        let base = ResourceDecl::new()
            .operations([Operation::Read, Operation::Create])
            .serializers(["json"]);
        let middle = ResourceDecl::new().operations([Operation::Read]);
        let own = ResourceDecl::new().name("poll");

        let merged = ResourceOptions::merge(&ResourceDecl::default(), &[base, middle], &own);
        let options = ResourceOptions::resolve(merged).unwrap();
        assert_eq!(options.allowed_operations, ops(&[Operation::Read]));
        // Untouched base keys survive the chain.
        assert_eq!(options.allowed_serializers, vec!["json".to_string()]);
    }

    #[test]
    fn explicit_methods_derive_operations() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .methods([Method::GET, Method::POST]),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        assert_eq!(
            options.allowed_operations,
            ops(&[Operation::Read, Operation::Create])
        );
    }

    #[test]
    fn scoped_methods_derive_scoped_operations() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .operations([Operation::Read, Operation::Create])
                .list_methods([Method::GET]),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        assert_eq!(options.list_allowed_operations, ops(&[Operation::Read]));
        // Detail falls back to the unscoped axis.
        assert_eq!(
            options.detail_allowed_operations,
            ops(&[Operation::Read, Operation::Create])
        );
        let list: MethodSet = [Method::GET].into_iter().collect();
        assert_eq!(options.http_list_allowed_methods, list);
    }

    #[test]
    fn explicit_pair_is_taken_verbatim() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .operations([Operation::Read])
                .methods([Method::GET, Method::HEAD, Method::OPTIONS, Method::POST]),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        // POST stays: no conversion fires when both sides are explicit.
        assert!(options.http_allowed_methods.contains(&Method::POST));
        assert_eq!(options.allowed_operations, ops(&[Operation::Read]));
    }

    #[test]
    fn contradictory_pair_is_rejected() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .operations([Operation::Read])
                .methods([Method::DELETE]),
        );
        let err = ResourceOptions::resolve(merged).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAccess { .. }));
    }

    #[test]
    fn scoped_contradictory_pair_is_rejected() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .list_operations([Operation::Read])
                .list_methods([Method::DELETE]),
        );
        let err = ResourceOptions::resolve(merged).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAccess { .. }));

        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .detail_operations([Operation::Destroy])
                .detail_methods([Method::GET]),
        );
        let err = ResourceOptions::resolve(merged).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAccess { .. }));
    }

    #[test]
    fn slug_defaults_to_integer_id() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new().name("poll"),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        assert_eq!(options.slug, Attribute::integer("id"));
    }

    #[test]
    fn relations_attach_to_same_named_attributes() {
        let merged = ResourceOptions::merge(
            &ResourceDecl::default(),
            &[],
            &ResourceDecl::new()
                .name("poll")
                .field("author")
                .relation("author", crate::helpers::relation("author").local()),
        );
        let options = ResourceOptions::resolve(merged).unwrap();
        let attribute = options.include.get("author").unwrap();
        let relation = attribute.relation.as_ref().unwrap();
        assert_eq!(relation.resource, "author");
        assert!(relation.local);
    }

    #[test]
    fn missing_name_is_fatal() {
        let err = ResourceOptions::resolve(ResourceDecl::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingName));
    }
}
