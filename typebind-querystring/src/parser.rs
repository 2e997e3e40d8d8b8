use std::sync::Arc;

use typebind_core::{
    AnyValue, Dispatch, NotRegistered, Registry, TypeDescriptor, Typed, downcast_owned,
};

use crate::{MISSING_PARAMETER, ParseError, builtin};

/// Parses single parameter values for the types it supports.
pub trait FromStringParser: Send + Sync {
    /// Returns true if this parser handles `ty`.
    fn supports_type(&self, ty: &TypeDescriptor) -> bool;

    /// Parses `text` into an instance of `ty`.
    ///
    /// `parsers` resolves the parsers of type arguments.
    fn parse_from_string(
        &self,
        text: &str,
        ty: &TypeDescriptor,
        parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError>;

    /// Produces a value for a parameter that was not given at all.
    ///
    /// Fails with "missing parameter" unless the type has an absent state.
    fn parse_from_absent_string(
        &self,
        ty: &TypeDescriptor,
        parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        let _ = (ty, parsers);
        Err(ParseError::invalid(MISSING_PARAMETER))
    }
}

impl Dispatch for dyn FromStringParser {
    type Key = TypeDescriptor;

    fn supports(&self, key: &TypeDescriptor) -> bool {
        self.supports_type(key)
    }
}

/// The registry of [`FromStringParser`]s.
///
/// Same lifecycle as the converter registries: register while configuring,
/// [`seal`](FromStringParserRegistry::seal), then resolve from any thread.
/// Later registrations win.
#[derive(Debug)]
pub struct FromStringParserRegistry {
    parsers: Registry<dyn FromStringParser>,
}

impl Default for FromStringParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStringParserRegistry {
    /// Creates a registry with no parsers.
    pub fn new() -> Self {
        FromStringParserRegistry {
            parsers: Registry::new("from-string parser"),
        }
    }

    /// Creates a registry holding the builtin parsers: strings, integers,
    /// booleans, dates and optional fields.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Registers a parser. It takes precedence over all earlier ones.
    ///
    /// # Panics
    ///
    /// If the registry is sealed.
    pub fn register(&mut self, parser: impl FromStringParser + 'static) {
        self.parsers.register(Arc::new(parser));
    }

    /// Removes all registered parsers, builtins included.
    ///
    /// # Panics
    ///
    /// If the registry is sealed.
    pub fn clear(&mut self) {
        self.parsers.clear();
    }

    /// Ends configuration.
    pub fn seal(&mut self) {
        self.parsers.seal();
    }

    /// Returns true once [`FromStringParserRegistry::seal`] has been called.
    pub fn is_sealed(&self) -> bool {
        self.parsers.is_sealed()
    }

    /// Resolves the parser for a concrete type.
    ///
    /// # Panics
    ///
    /// If the registry is not sealed yet.
    pub fn get(&self, ty: &TypeDescriptor) -> Result<Arc<dyn FromStringParser>, NotRegistered> {
        self.parsers.find(ty).ok_or_else(|| NotRegistered::new(ty))
    }

    /// Returns true if some parser handles `ty`.
    ///
    /// # Panics
    ///
    /// If the registry is not sealed yet.
    pub fn supports(&self, ty: &TypeDescriptor) -> bool {
        self.parsers.supports(ty)
    }

    /// Parses one value into a `T`.
    pub fn parse<T: Typed>(&self, text: &str) -> Result<T, ParseError> {
        let ty = T::descriptor();
        let parsed = self
            .get(&ty)
            .map_err(ParseError::internal)?
            .parse_from_string(text, &ty, self)?;
        downcast_owned::<T>(parsed).map_err(ParseError::internal)
    }
}
