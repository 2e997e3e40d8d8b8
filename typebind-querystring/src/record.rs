use std::collections::BTreeMap;

use tracing::{debug, error, trace};
use typebind_core::{
    AnyValue, Components, ConstructError, Def, RawType, RecordShape, TypeDescriptor,
};

use crate::{
    FromStringParserRegistry, PARSE_ERROR, ParseError, QuerystringError, QuerystringParser, ROOT,
    UNEXPECTED_PARAMETER,
};

/// The generated parser for one raw record type: one parameter per record
/// component, each parsed by the [`FromStringParser`](crate::FromStringParser)
/// of the component's type.
///
/// All parameters are parsed before reporting, so a request with three bad
/// parameters gets three errors.
#[derive(Debug)]
pub struct QuerystringToRecordParser {
    raw: RawType,
    shape: RecordShape,
}

impl QuerystringToRecordParser {
    pub(crate) fn new(raw: RawType, shape: RecordShape) -> Self {
        debug!(record = %raw, components = shape.components.len(), "generating querystring parser");
        QuerystringToRecordParser { raw, shape }
    }

    fn parse_component(
        &self,
        index: usize,
        text: Option<&String>,
        ty: &TypeDescriptor,
        monomorphized: &[TypeDescriptor],
        parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, ParseError> {
        let component_ty = self
            .shape
            .component_type(index, ty, monomorphized)
            .map_err(ParseError::internal)?;
        let parser = parsers.get(&component_ty).map_err(ParseError::internal)?;
        match text {
            Some(text) => parser.parse_from_string(text, &component_ty, parsers),
            None => parser.parse_from_absent_string(&component_ty, parsers),
        }
    }
}

impl QuerystringParser for QuerystringToRecordParser {
    fn supports_type(&self, ty: &TypeDescriptor) -> bool {
        ty.raw_type() == Some(&self.raw)
    }

    fn parse(
        &self,
        params: &BTreeMap<String, String>,
        ty: &TypeDescriptor,
        parsers: &FromStringParserRegistry,
    ) -> Result<AnyValue, QuerystringError> {
        let Some(Def::Record(def)) = ty.def() else {
            error!(%ty, "record type without record hooks");
            return Err(QuerystringError::single(ROOT, PARSE_ERROR));
        };
        trace!(record = %ty, "parsing querystring");

        let monomorphized = (def.component_types)();
        let mut values = Vec::with_capacity(self.shape.components.len());
        let mut errors = BTreeMap::new();
        let mut present = 0;

        for (index, component) in self.shape.components.iter().enumerate() {
            let text = params.get(component.name);
            if text.is_some() {
                present += 1;
            }
            match self.parse_component(index, text, ty, &monomorphized, parsers) {
                Ok(value) => values.push(value),
                Err(e) => {
                    if let ParseError::Internal(source) = &e {
                        error!(record = %ty, parameter = component.name, error = %source, "cannot parse parameter");
                    }
                    errors.insert(component.name.to_owned(), e.client_message().to_owned());
                }
            }
        }

        if present != params.len() {
            for key in params.keys().filter(|key| !self.shape.has_component(key)) {
                errors.insert(key.clone(), UNEXPECTED_PARAMETER.to_owned());
            }
        }

        if !errors.is_empty() {
            return Err(QuerystringError::new(errors));
        }
        (def.construct)(Components::new(values)).map_err(|e| match e {
            ConstructError::Invalid(message) => QuerystringError::single(ROOT, message),
            internal @ ConstructError::Internal(_) => {
                error!(record = %ty, error = %internal, "cannot construct record");
                QuerystringError::single(ROOT, PARSE_ERROR)
            }
        })
    }
}
