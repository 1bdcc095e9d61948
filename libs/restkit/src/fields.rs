//! Runtime field resolution: compiles an attribute's declared path into a
//! cached chain of accessors over an arbitrary host object.
//!
//! The host object graph (typically supplied by a persistence collaborator)
//! is opaque to this crate; it is reached only through the [`Host`] trait.
//! Accessors are built lazily on first traversal and memoized per field:
//! the cache only ever appends, and the unresolved segment list only ever
//! shrinks, because the host's shape is assumed stable across requests
//! against the same resource type. The lazy path is guarded by a per-field
//! mutex so concurrent first-use races cannot corrupt the cache.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;

use crate::attributes::Attribute;
use crate::errors::ConfigError;
use crate::registry::ResourceRegistry;
use crate::resource::ResourceType;

/// One step of a resolved traversal.
///
/// The variant records which access style answered for this segment when the
/// accessor was first built; subsequent traversals replay it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// A one/many-to-many collection member, materialized eagerly so no
    /// collaborator-specific lazy handle leaks across the boundary.
    Collection(String),
    /// A bindable member on the host.
    Member(String),
    /// Subscript/key access.
    Index(String),
    /// Raw instance-state access by name; the unconditional fallback.
    Raw(String),
}

impl Accessor {
    /// Decide the access style for `segment` by probing the live host.
    fn probe(host: &dyn Host, segment: &str) -> Accessor {
        if host.collection(segment).is_some() {
            Accessor::Collection(segment.to_string())
        } else if host.member(segment).is_some() {
            Accessor::Member(segment.to_string())
        } else if host.index(segment).is_some() {
            Accessor::Index(segment.to_string())
        } else {
            Accessor::Raw(segment.to_string())
        }
    }

    fn apply(&self, host: &dyn Host) -> Option<HostValue> {
        match self {
            Accessor::Collection(name) => host.collection(name).map(HostValue::List),
            Accessor::Member(name) => host.member(name),
            Accessor::Index(name) => host.index(name),
            Accessor::Raw(name) => host.raw(name),
        }
    }
}

/// A value produced while traversing a host object graph.
#[derive(Clone)]
pub enum HostValue {
    Scalar(Value),
    Object(Arc<dyn Host>),
    List(Vec<HostValue>),
}

impl HostValue {
    /// Collapse into plain JSON for representation building. Nested objects
    /// collapse to their summary representation.
    pub fn into_json(self) -> Value {
        match self {
            HostValue::Scalar(value) => value,
            HostValue::Object(host) => host.repr(),
            HostValue::List(items) => {
                Value::Array(items.into_iter().map(HostValue::into_json).collect())
            }
        }
    }
}

impl std::fmt::Debug for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostValue::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            HostValue::Object(_) => f.debug_tuple("Object").finish(),
            HostValue::List(items) => f.debug_tuple("List").field(&items.len()).finish(),
        }
    }
}

/// Seam to the persistence collaborator's object graph.
///
/// The default implementations answer "not defined here"; a host implements
/// whichever access styles its shape supports. `collection` takes precedence
/// during accessor building and must materialize eagerly.
pub trait Host: Send + Sync {
    /// Bindable member lookup by name.
    fn member(&self, _name: &str) -> Option<HostValue> {
        None
    }

    /// Subscript/key access.
    fn index(&self, _key: &str) -> Option<HostValue> {
        None
    }

    /// Raw instance-state access by name.
    fn raw(&self, _name: &str) -> Option<HostValue> {
        None
    }

    /// Eagerly materialized collection member.
    fn collection(&self, _name: &str) -> Option<Vec<HostValue>> {
        None
    }

    /// Summary representation used when a nested object is collapsed into a
    /// prepared record (commonly the identity value).
    fn repr(&self) -> Value {
        Value::Null
    }
}

struct AccessorState {
    accessors: Vec<Accessor>,
    segments: Vec<String>,
}

/// Runtime specialization of an [`Attribute`]: a named, path-addressable
/// piece of resource state with a memoized accessor chain and a lazily
/// resolved relation target.
pub struct Field {
    /// Declared name on the owning resource type.
    pub name: String,
    /// Name of the owning resource type, for diagnostics.
    pub owner: String,
    pub attribute: Attribute,
    state: Mutex<AccessorState>,
    relation_cell: OnceLock<Arc<ResourceType>>,
}

impl Field {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, attribute: Attribute) -> Self {
        let segments = attribute.segments();
        Field {
            name: name.into(),
            owner: owner.into(),
            attribute,
            state: Mutex::new(AccessorState {
                accessors: Vec::new(),
                segments,
            }),
            relation_cell: OnceLock::new(),
        }
    }

    /// Resolve this field's value against a live host object.
    ///
    /// Already-built accessors run first; if unresolved segments remain
    /// (earlier calls may have short-circuited on an absent host), one
    /// accessor is built per remaining segment, appended to the cache, and
    /// applied in turn. Absence is not an error: a missing key or attribute
    /// resolves to `None`, and the call site that consumes the field decides
    /// what absence means (see `ResourceType::prepare_record` for the
    /// collection normalization rule).
    pub fn resolve(&self, host: &dyn Host) -> Option<HostValue> {
        let mut state = self.state.lock();
        if state.accessors.is_empty() && state.segments.is_empty() {
            // No default source; only a preparation hook can supply a value.
            return None;
        }

        let mut cursor: Option<HostValue> = None;
        for accessor in &state.accessors {
            let next = match &cursor {
                None => accessor.apply(host),
                Some(HostValue::Object(object)) => accessor.apply(object.as_ref()),
                Some(_) => None,
            };
            match next {
                Some(value) => cursor = Some(value),
                None => return None,
            }
        }

        while !state.segments.is_empty() {
            let target: &dyn Host = match &cursor {
                None => host,
                Some(HostValue::Object(object)) => object.as_ref(),
                // A scalar or list mid-path cannot be traversed further.
                Some(_) => return None,
            };

            let segment = state.segments[0].clone();
            let accessor = Accessor::probe(target, &segment);
            let value = accessor.apply(target);
            state.accessors.push(accessor);
            state.segments.remove(0);

            match value {
                Some(next) => cursor = Some(next),
                None => return None,
            }
        }

        cursor
    }

    /// Lazily resolve the relation target against the process-wide resource
    /// registry. The first successful lookup is cached; subsequent reads are
    /// O(1). Targets registered after this field was declared resolve fine,
    /// which is what makes mutually recursive resource types workable.
    pub fn relation(
        &self,
        resources: &ResourceRegistry,
    ) -> Result<Option<Arc<ResourceType>>, ConfigError> {
        let Some(relation) = &self.attribute.relation else {
            return Ok(None);
        };

        if let Some(resolved) = self.relation_cell.get() {
            return Ok(Some(Arc::clone(resolved)));
        }

        let target = resources.get(&relation.resource).ok_or_else(|| {
            ConfigError::UnresolvedRelation {
                resource: self.owner.clone(),
                target: relation.resource.clone(),
            }
        })?;

        Ok(Some(Arc::clone(self.relation_cell.get_or_init(|| target))))
    }

    /// Number of accessors built so far; observable for memoization checks.
    pub fn accessor_count(&self) -> usize {
        self.state.lock().accessors.len()
    }

    /// Number of path segments still unresolved.
    pub fn pending_segments(&self) -> usize {
        self.state.lock().segments.len()
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("path", &self.attribute.path)
            .field("accessors", &self.accessor_count())
            .field("pending", &self.pending_segments())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Key-value host with optional nested objects and collections.
    #[derive(Default)]
    struct MapHost {
        values: BTreeMap<String, Value>,
        objects: BTreeMap<String, Arc<MapHost>>,
        lists: BTreeMap<String, Vec<Value>>,
    }

    impl Host for MapHost {
        fn member(&self, name: &str) -> Option<HostValue> {
            self.objects
                .get(name)
                .map(|o| HostValue::Object(Arc::clone(o) as Arc<dyn Host>))
        }

        fn index(&self, key: &str) -> Option<HostValue> {
            self.values.get(key).cloned().map(HostValue::Scalar)
        }

        fn collection(&self, name: &str) -> Option<Vec<HostValue>> {
            self.lists
                .get(name)
                .map(|items| items.iter().cloned().map(HostValue::Scalar).collect())
        }
    }

    fn host_with_question() -> MapHost {
        let mut host = MapHost::default();
        host.values
            .insert("question".into(), json!("Are you an innie or an outie?"));
        host
    }

    #[test]
    fn resolves_flat_key() {
        let field = Field::new("poll", "question", Attribute::new("question"));
        let value = field.resolve(&host_with_question()).unwrap();
        assert_eq!(value.into_json(), json!("Are you an innie or an outie?"));
        assert_eq!(field.accessor_count(), 1);
        assert_eq!(field.pending_segments(), 0);
    }

    #[test]
    fn resolves_nested_path_through_objects() {
        let mut author = MapHost::default();
        author.values.insert("name".into(), json!("sam"));
        let mut host = MapHost::default();
        host.objects.insert("author".into(), Arc::new(author));

        let field = Field::new("poll", "author_name", Attribute::new("author.name"));
        let value = field.resolve(&host).unwrap();
        assert_eq!(value.into_json(), json!("sam"));
        assert_eq!(field.accessor_count(), 2);
    }

    #[test]
    fn memoized_accessors_are_not_rederived() {
        let field = Field::new("poll", "question", Attribute::new("question"));
        assert!(field.resolve(&host_with_question()).is_some());
        assert_eq!(field.accessor_count(), 1);

        // A second host of the same shape replays the cached chain.
        let mut second = MapHost::default();
        second.values.insert("question".into(), json!("other"));
        let value = field.resolve(&second).unwrap();
        assert_eq!(value.into_json(), json!("other"));
        assert_eq!(field.accessor_count(), 1);
    }

    #[test]
    fn short_circuit_resumes_building_later() {
        let field = Field::new("poll", "author_name", Attribute::new("author.name"));

        // First host lacks the nested object entirely: the first accessor is
        // built (raw fallback yields nothing) and traversal stops.
        let empty = MapHost::default();
        assert!(field.resolve(&empty).is_none());
        assert_eq!(field.accessor_count(), 1);
        assert_eq!(field.pending_segments(), 1);

        // The probe ran against an absent member and fell back to raw
        // access, so a later object-bearing host still resolves nothing:
        // shape is assumed stable, the cache is never invalidated.
        let mut author = MapHost::default();
        author.values.insert("name".into(), json!("sam"));
        let mut host = MapHost::default();
        host.objects.insert("author".into(), Arc::new(author));
        assert!(field.resolve(&host).is_none());
        assert_eq!(field.accessor_count(), 1);
    }

    #[test]
    fn collection_members_materialize_eagerly() {
        let mut host = MapHost::default();
        host.lists
            .insert("choices".into(), vec![json!("yes"), json!("no")]);

        let field = Field::new("poll", "choices", Attribute::collection("choices"));
        let value = field.resolve(&host).unwrap();
        assert_eq!(value.into_json(), json!(["yes", "no"]));
    }

    #[test]
    fn bare_attribute_resolves_to_nothing() {
        let field = Field::new("poll", "computed", Attribute::bare());
        assert!(field.resolve(&MapHost::default()).is_none());
        assert_eq!(field.accessor_count(), 0);
    }
}
