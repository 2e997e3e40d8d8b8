use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;
use typebind_core::{
    AnyValue, Def, Dispatch, NotRegistered, RawType, RecordShape, Registry, TypeDescriptor,
    Typed, downcast_owned,
};

use crate::{
    DUPLICATE_PARAMETER, Error, FromStringParserRegistry, PARSE_ERROR, QuerystringError,
    QuerystringToRecordParser, ROOT,
};

/// Turns a whole set of parameters into one value.
pub trait QuerystringParser: Send + Sync {
    /// Returns true if this parser handles `ty`.
    fn supports_type(&self, ty: &TypeDescriptor) -> bool;

    /// Parses `params` into an instance of `ty`. Single values are parsed
    /// with `parsers`.
    fn parse(
        &self,
        params: &BTreeMap<String, String>,
        ty: &TypeDescriptor,
        parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, QuerystringError>;
}

impl Dispatch for dyn QuerystringParser {
    type Key = TypeDescriptor;

    fn supports(&self, key: &TypeDescriptor) -> bool {
        self.supports_type(key)
    }
}

/// Query parameters, flattened to one value per name.
///
/// Names given more than once are remembered, and reported as
/// "duplicate parameter" when the parameters are parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: BTreeMap<String, String>,
    duplicates: BTreeSet<String>,
}

impl Parameters {
    /// The value of each parameter. For a repeated name, the last value.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Names that were given more than once.
    pub fn duplicates(&self) -> &BTreeSet<String> {
        &self.duplicates
    }
}

/// Flattens raw `(name, value)` pairs, as decoded from a URL, into
/// [`Parameters`].
pub fn parse_querystring<I, K, V>(pairs: I) -> Parameters
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut parameters = Parameters::default();
    for (name, value) in pairs {
        let name = name.into();
        if parameters.values.contains_key(&name) {
            parameters.duplicates.insert(name.clone());
        }
        parameters.values.insert(name, value.into());
    }
    parameters
}

/// The registry of [`QuerystringParser`]s, with its
/// [`FromStringParserRegistry`] for single values.
///
/// Record types need no registration: a [`QuerystringToRecordParser`] is
/// generated on first use, once per raw record type, and shared by every
/// instantiation of a generic record.
#[derive(Debug)]
pub struct QuerystringParserRegistry {
    parsers: Registry<dyn QuerystringParser>,
    from_string: FromStringParserRegistry,
    records: RwLock<HashMap<RawType, Arc<QuerystringToRecordParser>>>,
}

impl Default for QuerystringParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerystringParserRegistry {
    /// Creates a registry that parses records, with the builtin
    /// [`FromStringParser`](crate::FromStringParser)s for their components.
    pub fn new() -> Self {
        Self::with_from_string_parsers(FromStringParserRegistry::with_builtins())
    }

    /// Creates a registry that parses single values with `from_string`.
    pub fn with_from_string_parsers(from_string: FromStringParserRegistry) -> Self {
        QuerystringParserRegistry {
            parsers: Registry::new("querystring parser"),
            from_string,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// The parsers for single values.
    pub fn from_string_parsers(&self) -> &FromStringParserRegistry {
        &self.from_string
    }

    /// The parsers for single values, for registering more of them.
    pub fn from_string_parsers_mut(&mut self) -> &mut FromStringParserRegistry {
        &mut self.from_string
    }

    /// Registers a parser. It takes precedence over all earlier ones and over
    /// generated record parsers.
    ///
    /// # Panics
    ///
    /// If the registry is sealed.
    pub fn register(&mut self, parser: impl QuerystringParser + 'static) {
        self.parsers.register(Arc::new(parser));
    }

    /// Removes all registered parsers.
    ///
    /// # Panics
    ///
    /// If the registry is sealed.
    pub fn clear(&mut self) {
        self.parsers.clear();
    }

    /// Ends configuration of this registry and of its single-value parsers.
    pub fn seal(&mut self) {
        self.from_string.seal();
        self.parsers.seal();
    }

    /// Returns true once [`QuerystringParserRegistry::seal`] has been called.
    pub fn is_sealed(&self) -> bool {
        self.parsers.is_sealed()
    }

    /// Resolves the parser for a concrete type: the cached one, else the last
    /// registered one that supports it, else a generated record parser.
    ///
    /// # Panics
    ///
    /// If the registry is not sealed yet.
    pub fn get(&self, ty: &TypeDescriptor) -> Result<Arc<dyn QuerystringParser>, NotRegistered> {
        if let Some(found) = self.parsers.find(ty) {
            return Ok(found);
        }
        let (Some(raw), Some(Def::Record(def))) = (ty.raw_type(), ty.def()) else {
            return Err(NotRegistered::new(ty));
        };
        let generated = self.record_parser(*raw, def.shape);
        Ok(self.parsers.insert_generated(ty.clone(), generated))
    }

    /// Returns true if a parser would be found for `ty`.
    ///
    /// # Panics
    ///
    /// If the registry is not sealed yet.
    pub fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        self.parsers.supports(ty) || matches!(ty.def(), Some(Def::Record(_)))
    }

    fn record_parser(
        &self,
        raw: RawType,
        shape: fn() -> RecordShape,
    ) -> Arc<QuerystringToRecordParser> {
        if let Some(existing) = self.records.read().get(&raw) {
            return Arc::clone(existing);
        }
        let mut records = self.records.write();
        let parser = records
            .entry(raw)
            .or_insert_with(|| Arc::new(QuerystringToRecordParser::new(raw, shape())));
        Arc::clone(parser)
    }

    /// Parses flattened parameters into a `T`.
    ///
    /// Every failing parameter is reported, and a repeated parameter is
    /// reported as "duplicate parameter" in place of any other error for it.
    pub fn parse<T: Typed>(&self, parameters: &Parameters) -> Result<T, Error> {
        let any = self.parse_dyn(parameters, &T::descriptor())?;
        downcast_owned::<T>(any).map_err(|e| {
            error!(error = %e, "cannot parse querystring");
            Error::Parameters(QuerystringError::single(ROOT, PARSE_ERROR))
        })
    }

    /// Parses flattened parameters into an instance of `ty`.
    ///
    /// # Panics
    ///
    /// If `ty` is not concrete.
    pub fn parse_dyn(&self, parameters: &Parameters, ty: &TypeDescriptor) -> Result<AnyValue, Error> {
        assert!(ty.is_concrete(), "cannot parse into non-concrete type {ty}");
        let parser = self.get(ty)?;
        let result = parser.parse(&parameters.values, ty, &self.from_string);
        if parameters.duplicates.is_empty() {
            return Ok(result?);
        }

        let mut fields = match result {
            Ok(_) => BTreeMap::new(),
            Err(e) => e.into_fields(),
        };
        for name in &parameters.duplicates {
            fields.insert(name.clone(), DUPLICATE_PARAMETER.to_owned());
        }
        Err(Error::Parameters(QuerystringError::new(fields)))
    }

    /// Parses parameters that are already one value per name.
    pub fn parse_map<T: Typed>(&self, params: &BTreeMap<String, String>) -> Result<T, Error> {
        self.parse(&Parameters {
            values: params.clone(),
            duplicates: BTreeSet::new(),
        })
    }
}
