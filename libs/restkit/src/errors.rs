//! Error taxonomy for the dispatch core.
//!
//! `ConfigError` is fatal: it is raised while a resource type is being
//! constructed and is intended to fail process startup. `ResourceError`
//! covers the per-request outcomes the transport layer renders into a
//! response; none of its variants should propagate as an unhandled fault.

use http::Method;
use thiserror::Error;

/// Fatal configuration errors, raised at resource-type construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resource declaration has no name")]
    MissingName,

    #[error("resource '{0}' is already registered")]
    DuplicateResource(String),

    #[error("unknown connector '{0}'")]
    UnknownConnector(String),

    #[error("unknown {kind} codec '{key}'")]
    UnknownCodec { kind: &'static str, key: String },

    #[error("unknown HTTP method '{0}' in resource configuration")]
    UnknownMethod(String),

    #[error("unknown operation '{0}' in resource configuration")]
    UnknownOperation(String),

    #[error(
        "operation '{operation}' is allowed but none of its methods are: \
         allowed_operations and http_allowed_methods conflict"
    )]
    ConflictingAccess { operation: String },

    #[error("relation target '{target}' of resource '{resource}' is not registered")]
    UnresolvedRelation { resource: String, target: String },

    #[error("connector '{connector}' failed to bind to resource '{resource}'")]
    ConnectorBind {
        connector: String,
        resource: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Per-request outcomes surfaced to the transport collaborator.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("no such resource")]
    NotFound,

    #[error("method '{method}' is not allowed for this resource")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    #[error("operation '{member}' has no handler on this resource")]
    NotImplemented { member: String },

    #[error("unsupported media type '{media_type}'")]
    UnsupportedMedia { media_type: String },
}

impl ResourceError {
    /// Value for an `Allow` header, when this error carries one.
    pub fn allow_header(&self) -> Option<String> {
        match self {
            ResourceError::MethodNotAllowed { allowed, .. } => {
                Some(crate::operations::format_allow(allowed))
            }
            _ => None,
        }
    }
}

/// Errors produced by serializer/deserializer implementations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The codec cannot represent this value; negotiation may probe another.
    #[error("value cannot be represented by this codec")]
    Unsupported,

    #[error("malformed payload: {0}")]
    Malformed(String),
}
