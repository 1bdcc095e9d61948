//! # Restkit - Declarative Resource Dispatch
//!
//! A configuration/dispatch core that sits between an HTTP transport and a
//! persistence backend. Given a declarative description of a resource (its
//! attributes, allowed operations, serialization formats, identity
//! attribute), it produces at definition time an immutable, merged
//! configuration object, then at request time resolves content types,
//! method legality, and field values through that configuration.
//!
//! ## What lives here
//!
//! - **Merge engine**: deterministic multi-level configuration merging
//!   across a declaration chain, with cascading operation/method defaults
//!   ([`options`]).
//! - **Operation/method mapper**: bidirectional translation between
//!   abstract CRUD operations and HTTP verbs ([`operations`]).
//! - **Field resolver**: lazy, memoized resolution of dotted attribute
//!   paths into callable accessors over an opaque host object ([`fields`]).
//! - **Connector resolver**: named capability modules mixed into a resource
//!   type, with ordered member fallthrough ([`connectors`]).
//! - **Negotiation map**: media-type to codec lookup tables built from
//!   declared codec capabilities ([`negotiation`]).
//!
//! ## What deliberately does not live here
//!
//! The HTTP server, router, and streaming transport; the database engine;
//! `Accept`-header quality negotiation; process wiring. Those collaborators
//! consume the frozen [`ResourceType`] surface instead.
//!
//! ## Example
//!
//! ```rust
//! use restkit::{Environment, Operation, ResourceTypeBuilder};
//!
//! let env = Environment::empty();
//! let poll = ResourceTypeBuilder::new("poll")
//!     .configure(|decl| decl.operations([Operation::Read]).field("question"))
//!     .build(&env)
//!     .unwrap();
//!
//! assert_eq!(
//!     poll.allow_header(restkit::Scope::Resource),
//!     "GET, HEAD, OPTIONS"
//! );
//! ```

pub mod attributes;
pub mod connectors;
pub mod errors;
pub mod fields;
pub mod helpers;
pub mod negotiation;
pub mod operations;
pub mod options;
pub mod registry;
pub mod resource;

// Re-export inventory so connector crates can `inventory::submit!` without
// naming the dependency themselves.
pub use inventory;

pub use attributes::{Attribute, AttributeKind};
pub use connectors::{
    Binding, Connector, ConnectorRegistration, ConnectorRegistry, EmptyBinding, Handler,
    MemberTable, Outcome, RequestCtx,
};
pub use errors::{CodecError, ConfigError, ResourceError};
pub use fields::{Field, Host, HostValue};
pub use helpers::{parent, relation, Parent, Relation};
pub use negotiation::{CodecRegistry, Deserializer, NegotiationMap, Serializer};
pub use operations::{
    format_allow, method_to_operations, methods_to_operations, operation_to_methods,
    operations_to_methods, MethodSet, Operation, OperationSet,
};
pub use options::{ResourceDecl, ResourceOptions, Scope};
pub use registry::{Environment, ResourceRegistry};
pub use resource::{clean_boolean, PrepareFn, Queryable, ResourceType, ResourceTypeBuilder};
