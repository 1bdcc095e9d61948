//! Attribute descriptors: the declared shape of one exposed piece of
//! resource state.
//!
//! An attribute is created once, at declaration time, and never mutated.
//! Its runtime counterpart is [`crate::fields::Field`], which compiles the
//! declared path into a cached chain of accessors.

use crate::helpers::Relation;

/// Coarse value kind, used to pick stock preparation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeKind {
    #[default]
    Text,
    Integer,
    Boolean,
    DateTime,
}

/// Declares one exposed piece of resource state.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Dot-delimited path on the host object. `None` means "no default
    /// source": unless a preparation hook supplies a value, the attribute
    /// resolves to nothing.
    pub path: Option<String>,

    /// Whether the attribute is some kind of collection. Affects what is
    /// returned on absence (empty list rather than null).
    pub collection: bool,

    pub kind: AttributeKind,

    /// Declared relation to another resource type, resolved lazily by name.
    pub relation: Option<Relation>,

    /// Whether this attribute can be modified through `update`/`create`.
    pub editable: bool,

    /// Whether this attribute may appear in query filters.
    pub filterable: bool,

    /// Whether this attribute is present in prepared representations.
    pub visible: bool,
}

impl Attribute {
    pub fn new(path: impl Into<String>) -> Self {
        Attribute {
            path: Some(path.into()),
            ..Attribute::bare()
        }
    }

    /// An attribute with no default source.
    pub fn bare() -> Self {
        Attribute {
            path: None,
            collection: false,
            kind: AttributeKind::Text,
            relation: None,
            editable: false,
            filterable: false,
            visible: true,
        }
    }

    pub fn integer(path: impl Into<String>) -> Self {
        Attribute {
            kind: AttributeKind::Integer,
            ..Attribute::new(path)
        }
    }

    pub fn boolean(path: impl Into<String>) -> Self {
        Attribute {
            kind: AttributeKind::Boolean,
            ..Attribute::new(path)
        }
    }

    pub fn collection(path: impl Into<String>) -> Self {
        Attribute {
            collection: true,
            ..Attribute::new(path)
        }
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Path split into unresolved segments; empty when there is no source.
    pub fn segments(&self) -> Vec<String> {
        match &self.path {
            Some(path) if !path.is_empty() => path.split('.').map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_splits_into_segments() {
        let attr = Attribute::new("author.name");
        assert_eq!(attr.segments(), vec!["author", "name"]);
    }

    #[test]
    fn bare_attribute_has_no_segments() {
        assert!(Attribute::bare().segments().is_empty());
        let empty = Attribute::new("");
        assert!(empty.segments().is_empty());
    }

    #[test]
    fn integer_constructor_sets_kind() {
        let attr = Attribute::integer("id");
        assert_eq!(attr.kind, AttributeKind::Integer);
        assert_eq!(attr.path.as_deref(), Some("id"));
    }
}
