//! Micro value records used when configuring resources.

/// Describes how one attribute relates to another resource type.
///
/// The `resource` field is a name into the process-wide resource registry,
/// never an ownership edge; relations may be mutually recursive between
/// resource types and are resolved lazily on first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Registry name of the target resource type.
    pub resource: String,
    /// Path on the target used when linking back; defaults to its slug.
    pub path: Option<String>,
    /// Whether the related representation is embedded inline.
    pub embed: bool,
    /// True when this resource owns the foreign key, false when the
    /// target owns it.
    pub local: bool,
    /// Name of the reverse accessor on the target, if any.
    pub related_name: Option<String>,
}

/// Shorthand constructor used in the `relations` option.
pub fn relation(resource: impl Into<String>) -> Relation {
    Relation {
        resource: resource.into(),
        path: None,
        embed: false,
        local: false,
        related_name: None,
    }
}

impl Relation {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn embed(mut self) -> Self {
        self.embed = true;
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }
}

/// Describes nesting of one resource under another,
/// e.g. `/parent/{id}/child/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    /// Registry name of the enclosing resource type.
    pub resource: String,
    /// Name of the attribute on the child that points at the parent.
    pub name: String,
    /// Name of the reverse accessor on the parent, if any.
    pub related_name: Option<String>,
}

/// Shorthand constructor used in the resource declaration.
pub fn parent(resource: impl Into<String>, name: impl Into<String>) -> Parent {
    Parent {
        resource: resource.into(),
        name: name.into(),
        related_name: None,
    }
}

impl Parent {
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }
}
