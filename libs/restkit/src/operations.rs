//! Bidirectional mapping between abstract CRUD operations and HTTP methods.
//!
//! Operations generalize and blur the differences between "PATCH and PUT",
//! "PUT = create / update", etc. The mapping is deliberately not a bijection:
//! `update` and `create` both claim PUT and PATCH, and the verb alone does
//! not decide between them; payload semantics do, at the transport layer.
//!
//! Every derived method set implicitly contains HEAD and OPTIONS: a resource
//! always answers metadata verbs regardless of its declared operations.

use std::collections::BTreeSet;

use http::Method;

use crate::errors::ConfigError;

/// Abstract CRUD operation, decoupled from any protocol verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Destroy,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Destroy => "destroy",
        }
    }

    pub fn parse(name: &str) -> Result<Operation, ConfigError> {
        match name {
            "read" => Ok(Operation::Read),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "destroy" => Ok(Operation::Destroy),
            other => Err(ConfigError::UnknownOperation(other.to_string())),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of operations; `BTreeSet` keeps derivation deterministic.
pub type OperationSet = BTreeSet<Operation>;

/// Set of HTTP methods. `http::Method` is not `Ord`, so ordering is applied
/// only when rendering (see [`format_allow`]).
pub type MethodSet = std::collections::HashSet<Method>;

/// The canonical rendering order for `Allow` headers.
const METHOD_ORDER: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// Methods a single operation answers to.
pub fn operation_to_methods(operation: Operation) -> MethodSet {
    let methods: &[Method] = match operation {
        Operation::Read => &[Method::GET],
        Operation::Update => &[Method::PUT, Method::PATCH],
        Operation::Create => &[Method::PUT, Method::PATCH, Method::POST],
        Operation::Destroy => &[Method::PUT, Method::DELETE],
    };
    methods.iter().cloned().collect()
}

/// Operations a single method may express.
///
/// HEAD and OPTIONS are implicit metadata capability, not operations; they
/// map to the empty set. Any other unrecognized verb is a configuration
/// error, never silently ignored.
pub fn method_to_operations(method: &Method) -> Result<OperationSet, ConfigError> {
    let operations: &[Operation] = match *method {
        Method::GET => &[Operation::Read],
        Method::PUT => &[Operation::Update, Operation::Create, Operation::Destroy],
        Method::POST => &[Operation::Create],
        Method::PATCH => &[Operation::Update, Operation::Create],
        Method::DELETE => &[Operation::Destroy],
        Method::HEAD | Method::OPTIONS => &[],
        _ => return Err(ConfigError::UnknownMethod(method.to_string())),
    };
    Ok(operations.iter().copied().collect())
}

/// Union over the set, plus the implicit HEAD and OPTIONS capability.
pub fn operations_to_methods(operations: &OperationSet) -> MethodSet {
    let mut methods: MethodSet = [Method::HEAD, Method::OPTIONS].into_iter().collect();
    for operation in operations {
        methods.extend(operation_to_methods(*operation));
    }
    methods
}

/// Union over the set.
pub fn methods_to_operations(methods: &MethodSet) -> Result<OperationSet, ConfigError> {
    let mut operations = OperationSet::new();
    for method in methods {
        operations.extend(method_to_operations(method)?);
    }
    Ok(operations)
}

/// Render a method list in canonical order, e.g. `GET, HEAD, OPTIONS`.
pub fn format_allow(methods: &[Method]) -> String {
    let mut ordered: Vec<&str> = METHOD_ORDER
        .iter()
        .filter(|m| methods.contains(*m))
        .map(|m| m.as_str())
        .collect();
    // Anything outside the canonical table goes last, alphabetically.
    let mut extra: Vec<&str> = methods
        .iter()
        .filter(|m| !METHOD_ORDER.contains(*m))
        .map(|m| m.as_str())
        .collect();
    extra.sort_unstable();
    ordered.extend(extra);
    ordered.join(", ")
}

/// Sort a method set into the canonical rendering order.
pub fn sorted_methods(methods: &MethodSet) -> Vec<Method> {
    let mut ordered: Vec<Method> = METHOD_ORDER
        .iter()
        .filter(|m| methods.contains(*m))
        .cloned()
        .collect();
    let mut extra: Vec<Method> = methods
        .iter()
        .filter(|m| !METHOD_ORDER.contains(*m))
        .cloned()
        .collect();
    extra.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
    ordered.extend(extra);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(list: &[Operation]) -> OperationSet {
        list.iter().copied().collect()
    }

    #[test]
    fn read_derives_get_head_options() {
        let methods = operations_to_methods(&ops(&[Operation::Read]));
        let expected: MethodSet = [Method::GET, Method::HEAD, Method::OPTIONS]
            .into_iter()
            .collect();
        assert_eq!(methods, expected);
    }

    #[test]
    fn head_and_options_always_present() {
        let methods = operations_to_methods(&OperationSet::new());
        assert!(methods.contains(&Method::HEAD));
        assert!(methods.contains(&Method::OPTIONS));
    }

    #[test]
    fn put_is_claimed_by_three_operations() {
        let operations = method_to_operations(&Method::PUT).unwrap();
        assert_eq!(
            operations,
            ops(&[Operation::Update, Operation::Create, Operation::Destroy])
        );
    }

    #[test]
    fn delete_maps_to_destroy() {
        let operations = method_to_operations(&Method::DELETE).unwrap();
        assert_eq!(operations, ops(&[Operation::Destroy]));
    }

    #[test]
    fn unknown_method_is_fatal() {
        let err = method_to_operations(&Method::TRACE).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMethod(_)));
    }

    #[test]
    fn round_trip_is_idempotent_after_one_pass() {
        // The mapping is not a bijection, but one full round trip reaches a
        // fixed point: ops -> methods -> ops -> methods == ops -> methods.
        for operation in Operation::ALL {
            let start = ops(&[operation]);
            let once = operations_to_methods(&start);
            let back = methods_to_operations(&once).unwrap();
            let twice = operations_to_methods(&back);
            assert_eq!(once, twice, "fixed point failed for {operation}");
        }
    }

    #[test]
    fn allow_header_renders_in_canonical_order() {
        let methods: MethodSet = [Method::OPTIONS, Method::GET, Method::HEAD]
            .into_iter()
            .collect();
        let rendered = format_allow(&sorted_methods(&methods));
        assert_eq!(rendered, "GET, HEAD, OPTIONS");
    }
}
