use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::{Def, Record, RecordDef};

/// The identity of a type constructor, without its type arguments.
///
/// Equality and hashing only look at the [`TypeId`]; the name is for humans.
/// Generic types are identified by a fixed instantiation, conventionally with
/// `()` for every parameter (`RawType::of::<Vec<()>>("Vec")`).
#[derive(Clone, Copy)]
pub struct RawType {
    name: &'static str,
    id: TypeId,
}

impl RawType {
    /// The raw type identified by `T`, displayed as `name`.
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        RawType {
            name,
            id: TypeId::of::<T>(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns true if this raw type is identified by `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for RawType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RawType {}

impl Hash for RawType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Describes a type to convert: a raw type applied to type arguments, a type
/// variable, or a wildcard.
///
/// Descriptors produced by [`Typed::descriptor`] also carry the [`Def`] that
/// lets container and record converters build values of that exact Rust
/// type. Equality and hashing are structural and ignore the def, so a
/// descriptor written by hand compares equal to the one derived from the Rust
/// type it names.
#[derive(Clone)]
pub enum TypeDescriptor {
    /// A raw type applied to zero or more arguments.
    Applied {
        /// The type constructor
        raw: RawType,
        /// Type arguments, in declaration order
        args: Vec<TypeDescriptor>,
        /// Construction hooks, when known
        def: Option<Def>,
    },
    /// A type variable, bound by the enclosing record's parameter list.
    Variable(&'static str),
    /// An unresolved but acceptable placeholder (`?`).
    Wildcard,
}

impl TypeDescriptor {
    /// The descriptor of `T`.
    pub fn of<T: Typed>() -> Self {
        T::descriptor()
    }

    /// A raw type with no arguments and no def.
    pub fn raw(raw: RawType) -> Self {
        TypeDescriptor::Applied {
            raw,
            args: Vec::new(),
            def: None,
        }
    }

    /// A raw type applied to arguments, with no def.
    pub fn applied(raw: RawType, args: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Applied {
            raw,
            args,
            def: None,
        }
    }

    /// A type variable reference.
    pub fn variable(name: &'static str) -> Self {
        TypeDescriptor::Variable(name)
    }

    /// A wildcard.
    pub fn wildcard() -> Self {
        TypeDescriptor::Wildcard
    }

    /// The descriptor of record type `R`, applied to `args`.
    pub fn record<R: Record>(raw: RawType, args: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Applied {
            raw,
            args,
            def: Some(Def::Record(RecordDef::of::<R>())),
        }
    }

    /// Attaches construction hooks. No effect on variables and wildcards.
    pub fn with_def(self, def: Def) -> Self {
        match self {
            TypeDescriptor::Applied { raw, args, .. } => TypeDescriptor::Applied {
                raw,
                args,
                def: Some(def),
            },
            other => other,
        }
    }

    /// The raw generic type behind `T`, with its arguments left off.
    ///
    /// For `Vec<i32>` this is plain `Vec`, which no converter accepts.
    pub fn unparameterized<T: Typed>() -> Self {
        match T::descriptor() {
            TypeDescriptor::Applied { raw, .. } => TypeDescriptor::raw(raw),
            other => other,
        }
    }

    /// The raw generic type behind `T`, with every argument replaced by a
    /// wildcard: `Vec<?>` for `Vec<i32>`.
    pub fn with_wildcards<T: Typed>() -> Self {
        match T::descriptor() {
            TypeDescriptor::Applied { raw, args, .. } => TypeDescriptor::applied(
                raw,
                args.iter().map(|_| TypeDescriptor::Wildcard).collect(),
            ),
            other => other,
        }
    }

    /// The raw type, unless this is a variable or wildcard.
    pub fn raw_type(&self) -> Option<&RawType> {
        match self {
            TypeDescriptor::Applied { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// The type arguments; empty for variables and wildcards.
    pub fn args(&self) -> &[TypeDescriptor] {
        match self {
            TypeDescriptor::Applied { args, .. } => args,
            _ => &[],
        }
    }

    /// The construction hooks, if this descriptor carries them.
    pub fn def(&self) -> Option<&Def> {
        match self {
            TypeDescriptor::Applied { def, .. } => def.as_ref(),
            _ => None,
        }
    }

    /// Returns true if this is the non-generic type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        match self {
            TypeDescriptor::Applied { raw, args, .. } => raw.is::<T>() && args.is_empty(),
            _ => false,
        }
    }

    /// Returns true if the raw type is `raw` and exactly `arity` arguments
    /// were supplied.
    pub fn is_applied(&self, raw: &RawType, arity: usize) -> bool {
        match self {
            TypeDescriptor::Applied { raw: r, args, .. } => r == raw && args.len() == arity,
            _ => false,
        }
    }

    /// Returns true for a wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, TypeDescriptor::Wildcard)
    }

    /// Returns true if no type variable occurs anywhere in this descriptor.
    /// Wildcards do not make a descriptor non-concrete.
    pub fn is_concrete(&self) -> bool {
        match self {
            TypeDescriptor::Applied { args, .. } => args.iter().all(TypeDescriptor::is_concrete),
            TypeDescriptor::Variable(_) => false,
            TypeDescriptor::Wildcard => true,
        }
    }

    /// Replaces each type variable with the argument at the position of its
    /// name in `params`, recursing into nested arguments.
    ///
    /// `params` is the parameter list of the record that declared this type;
    /// variables never refer to parameters of any other record.
    pub fn concretize(
        &self,
        params: &[&'static str],
        args: &[TypeDescriptor],
    ) -> Result<TypeDescriptor, TypeError> {
        if params.len() != args.len() {
            return Err(TypeError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            });
        }
        self.substitute(params, args)
    }

    fn substitute(
        &self,
        params: &[&'static str],
        bound: &[TypeDescriptor],
    ) -> Result<TypeDescriptor, TypeError> {
        match self {
            TypeDescriptor::Variable(name) => params
                .iter()
                .position(|p| p == name)
                .map(|i| bound[i].clone())
                .ok_or(TypeError::UnboundVariable { name: *name }),
            TypeDescriptor::Wildcard => Ok(TypeDescriptor::Wildcard),
            TypeDescriptor::Applied { raw, args, def } => Ok(TypeDescriptor::Applied {
                raw: *raw,
                args: args
                    .iter()
                    .map(|arg| arg.substitute(params, bound))
                    .collect::<Result<_, _>>()?,
                def: *def,
            }),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                TypeDescriptor::Applied { raw: a, args: aa, .. },
                TypeDescriptor::Applied { raw: b, args: ba, .. },
            ) => a == b && aa == ba,
            (TypeDescriptor::Variable(a), TypeDescriptor::Variable(b)) => a == b,
            (TypeDescriptor::Wildcard, TypeDescriptor::Wildcard) => true,
            _ => false,
        }
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            TypeDescriptor::Applied { raw, args, .. } => {
                raw.hash(state);
                args.hash(state);
            }
            TypeDescriptor::Variable(name) => name.hash(state),
            TypeDescriptor::Wildcard => {}
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Applied { raw, args, .. } => {
                write!(f, "{raw}")?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeDescriptor::Variable(name) => f.write_str(name),
            TypeDescriptor::Wildcard => f.write_str("?"),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Failure to turn a declared type into a concrete one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// A variable that is not one of the record's own parameters.
    UnboundVariable {
        /// The variable's name
        name: &'static str,
    },
    /// The record was given the wrong number of type arguments.
    ArityMismatch {
        /// Number of declared type parameters
        expected: usize,
        /// Number of supplied type arguments
        found: usize,
    },
    /// The substituted component type disagrees with the record's
    /// monomorphised component type.
    BindingMismatch {
        /// The component
        component: &'static str,
        /// What substitution produced
        substituted: String,
        /// What the record reported
        declared: String,
    },
    /// A descriptor lacks the construction hooks its converter needs.
    MissingDef {
        /// The descriptor
        ty: String,
        /// Which kind of def was expected
        expected: &'static str,
    },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnboundVariable { name } => {
                write!(f, "type variable {name} is not a parameter of the record")
            }
            TypeError::ArityMismatch { expected, found } => {
                write!(f, "expected {expected} type arguments, found {found}")
            }
            TypeError::BindingMismatch {
                component,
                substituted,
                declared,
            } => write!(
                f,
                "component {component}: substituted type {substituted} does not match {declared}"
            ),
            TypeError::MissingDef { ty, expected } => {
                write!(f, "type {ty} has no {expected} definition")
            }
        }
    }
}

impl core::error::Error for TypeError {}

/// A Rust type that can describe itself as a [`TypeDescriptor`].
pub trait Typed: 'static {
    /// The descriptor of this type, with construction hooks attached.
    fn descriptor() -> TypeDescriptor;
}
