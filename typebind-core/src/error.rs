use core::fmt;
use std::sync::Arc;

/// Message for a declared record component with no matching property.
pub const MISSING_PROPERTY: &str = "missing property";

/// Message for a property that matches no declared record component.
pub const UNEXPECTED_PROPERTY: &str = "unexpected property";

/// Message for a record component whose accessor returned nothing.
pub const FIELD_IS_NULL: &str = "field is null";

/// Message that replaces the text of internal errors when flattening.
pub const INTERNAL_ERROR: &str = "internal error";

/// A segment in the path to a failing value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// A record component or map key
    Field(String),
    /// An array element
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Renders a path as `inner.items[2].name`; the root is the empty string.
pub fn format_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Field(name) if out.is_empty() => out.push_str(name),
            segment => out.push_str(&segment.to_string()),
        }
    }
    out
}

/// A tree of path-qualified conversion failures.
///
/// Converters never stop at the first problem: each child failure is wrapped
/// with its own path segment and merged into the parent's accumulator, so a
/// single error can describe everything wrong with a document.
#[derive(Clone, Debug)]
pub enum ErrorNode {
    /// A failure at this location, shown to clients as-is.
    Message(String),
    /// An unexpected failure (missing converter, downcast mismatch). Clients
    /// only ever see [`INTERNAL_ERROR`] for it.
    Internal(Arc<dyn core::error::Error + Send + Sync>),
    /// A failure below this location.
    Nested {
        /// Where the child failure happened, relative to this node
        segment: PathSegment,
        /// The failure itself
        child: Box<ErrorNode>,
    },
    /// Several failures at or below this location.
    Merged(Vec<ErrorNode>),
}

impl ErrorNode {
    /// Creates a single-error node.
    pub fn message(message: impl Into<String>) -> Self {
        ErrorNode::Message(message.into())
    }

    /// Creates a node for an unexpected failure.
    pub fn internal(error: impl core::error::Error + Send + Sync + 'static) -> Self {
        ErrorNode::Internal(Arc::new(error))
    }

    /// Prefixes every path in this node with a field name.
    pub fn under(self, field: impl Into<String>) -> Self {
        ErrorNode::Nested {
            segment: PathSegment::Field(field.into()),
            child: Box::new(self),
        }
    }

    /// Prefixes every path in this node with an array index.
    pub fn at_index(self, index: usize) -> Self {
        ErrorNode::Nested {
            segment: PathSegment::Index(index),
            child: Box::new(self),
        }
    }

    /// Combines two nodes without losing either.
    pub fn and(self, other: ErrorNode) -> Self {
        match (self, other) {
            (ErrorNode::Merged(mut left), ErrorNode::Merged(right)) => {
                left.extend(right);
                ErrorNode::Merged(left)
            }
            (ErrorNode::Merged(mut left), other) => {
                left.push(other);
                ErrorNode::Merged(left)
            }
            (this, other) => ErrorNode::Merged(vec![this, other]),
        }
    }

    /// Returns whichever of `a` and `b` is present, or both combined.
    ///
    /// This is the accumulator step used while looping over fields:
    /// `errors = ErrorNode::merge(errors, Some(e.under(name)))`.
    pub fn merge(a: Option<ErrorNode>, b: Option<ErrorNode>) -> Option<ErrorNode> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.and(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Flattens the tree into `(path, message)` pairs, depth first, in the
    /// order the failures were merged.
    pub fn flatten(&self) -> Vec<FieldError> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.flatten_into(&mut path, &mut out);
        out
    }

    fn flatten_into(&self, path: &mut Vec<PathSegment>, out: &mut Vec<FieldError>) {
        match self {
            ErrorNode::Message(message) => out.push(FieldError {
                path: path.clone(),
                message: message.clone(),
            }),
            ErrorNode::Internal(_) => out.push(FieldError {
                path: path.clone(),
                message: INTERNAL_ERROR.to_owned(),
            }),
            ErrorNode::Nested { segment, child } => {
                path.push(segment.clone());
                child.flatten_into(path, out);
                path.pop();
            }
            ErrorNode::Merged(children) => {
                for child in children {
                    child.flatten_into(path, out);
                }
            }
        }
    }

    /// Returns true if any leaf is an internal error.
    pub fn has_internal(&self) -> bool {
        !self.internal_errors().is_empty()
    }

    /// The sources of all internal leaves, for logging.
    pub fn internal_errors(&self) -> Vec<&(dyn core::error::Error + Send + Sync)> {
        let mut out = Vec::new();
        self.collect_internal(&mut out);
        out
    }

    fn collect_internal<'a>(&'a self, out: &mut Vec<&'a (dyn core::error::Error + Send + Sync)>) {
        match self {
            ErrorNode::Message(_) => {}
            ErrorNode::Internal(source) => out.push(source.as_ref()),
            ErrorNode::Nested { child, .. } => child.collect_internal(out),
            ErrorNode::Merged(children) => {
                for child in children {
                    child.collect_internal(out);
                }
            }
        }
    }
}

/// One flattened failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldError {
    /// Location of the failure, empty for the root
    pub path: Vec<PathSegment>,
    /// What went wrong
    pub message: String,
}

impl FieldError {
    /// The path in `inner.items[2]` notation.
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}

fn write_flattened(node: &ErrorNode, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, error) in node.flatten().iter().enumerate() {
        if i > 0 {
            f.write_str("\n")?;
        }
        write!(f, "{error}")?;
    }
    Ok(())
}

macro_rules! directional_error {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(pub ErrorNode);

        impl $name {
            /// The underlying error tree.
            pub fn node(&self) -> &ErrorNode {
                &self.0
            }

            /// Flattened `(path, message)` pairs.
            pub fn field_errors(&self) -> Vec<FieldError> {
                self.0.flatten()
            }

            /// Returns true if the failure involves an internal error rather
            /// than only bad input.
            pub fn has_internal(&self) -> bool {
                self.0.has_internal()
            }
        }

        impl From<ErrorNode> for $name {
            fn from(node: ErrorNode) -> Self {
                $name(node)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_flattened(&self.0, f)
            }
        }

        impl core::error::Error for $name {}
    };
}

directional_error! {
    /// Client input could not be converted into the requested type.
    ///
    /// This is an expected condition: the flattened field errors are safe to
    /// show to whoever sent the input.
    DeserializeError
}

directional_error! {
    /// An application value could not be represented as JSON.
    ///
    /// This points at a bug in the application rather than bad input.
    SerializeError
}

/// No converter is registered for a type, and it is not a record.
///
/// This is a configuration problem, not a problem with the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotRegistered {
    type_name: String,
}

impl NotRegistered {
    /// Creates the error for a type, by its display name.
    pub fn new(type_name: impl fmt::Display) -> Self {
        NotRegistered {
            type_name: type_name.to_string(),
        }
    }

    /// The display name of the type that has no converter.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for NotRegistered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no converter registered for type {}", self.type_name)
    }
}

impl core::error::Error for NotRegistered {}

/// A type-erased value was not of the type the converter expected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Name of the expected type
    pub expected: String,
}

impl TypeMismatch {
    /// The value was expected to be a `T`.
    pub fn of<T: ?Sized>() -> Self {
        TypeMismatch {
            expected: core::any::type_name::<T>().to_owned(),
        }
    }
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value is not of expected type {}", self.expected)
    }
}

impl core::error::Error for TypeMismatch {}

/// Returned by a record constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstructError {
    /// The components are individually fine but not acceptable together.
    /// The message is shown to the client, attributed to the whole record.
    Invalid(String),
    /// The components did not line up with the record's declaration.
    Internal(String),
}

impl ConstructError {
    /// A validation failure with a client-visible message.
    pub fn invalid(message: impl Into<String>) -> Self {
        ConstructError::Invalid(message.into())
    }
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructError::Invalid(message) => f.write_str(message),
            ConstructError::Internal(message) => write!(f, "cannot construct record: {message}"),
        }
    }
}

impl core::error::Error for ConstructError {}

impl From<ConstructError> for ErrorNode {
    fn from(error: ConstructError) -> Self {
        match error {
            ConstructError::Invalid(message) => ErrorNode::Message(message),
            internal @ ConstructError::Internal(_) => ErrorNode::internal(internal),
        }
    }
}
