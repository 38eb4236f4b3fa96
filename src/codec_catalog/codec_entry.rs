use crate::{
    filter::{FilterError, FilterId},
    metadata::{raw_configuration, raw_parameters, MetadataConfiguration},
};

/// How a parameter word is represented in codec configuration metadata.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParameterKind {
    /// An unsigned 32-bit integer.
    Unsigned,
    /// A signed 32-bit integer, stored as its two's complement word.
    Signed,
}

impl ParameterKind {
    /// Convert a parameter word to a JSON value.
    #[must_use]
    pub fn to_json(self, word: u32) -> serde_json::Value {
        match self {
            Self::Unsigned => word.into(),
            Self::Signed => i32::from_ne_bytes(word.to_ne_bytes()).into(),
        }
    }

    /// Convert a JSON value to a parameter word.
    ///
    /// Returns [`None`] if `value` is not an integer in range.
    #[must_use]
    pub fn from_json(self, value: &serde_json::Value) -> Option<u32> {
        match self {
            Self::Unsigned => value.as_u64().and_then(|value| u32::try_from(value).ok()),
            Self::Signed => value
                .as_i64()
                .and_then(|value| i32::try_from(value).ok())
                .map(|value| u32::from_ne_bytes(value.to_ne_bytes())),
        }
    }
}

/// The default of a parameter absent from codec configuration metadata.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParameterDefault {
    /// The parameter has no default.
    Required,
    /// A fixed value.
    Value(u32),
    /// The size in bytes of the variable's element type.
    TypeSize,
}

impl ParameterDefault {
    /// Resolve the default for a variable with elements of `type_size` bytes.
    #[must_use]
    pub fn resolve(self, type_size: usize) -> Option<u32> {
        match self {
            Self::Required => None,
            Self::Value(value) => Some(value),
            Self::TypeSize => u32::try_from(type_size).ok(),
        }
    }
}

/// A named codec parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodecParameter {
    name: String,
    kind: ParameterKind,
    default: ParameterDefault,
}

impl CodecParameter {
    /// Create a new codec parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterKind, default: ParameterDefault) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    /// Return the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the parameter kind.
    #[must_use]
    pub const fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Return the parameter default.
    #[must_use]
    pub const fn default(&self) -> &ParameterDefault {
        &self.default
    }
}

/// The codec description of a filter.
///
/// A codec either has a named parameter schema, or takes the raw parameter vector as `{"parameters": [..]}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodecEntry {
    id: FilterId,
    name: String,
    aliases: Vec<String>,
    parameters: Vec<CodecParameter>,
    raw_parameters: bool,
}

impl CodecEntry {
    /// Create a new codec entry without parameters.
    #[must_use]
    pub fn new(id: FilterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            aliases: Vec::new(),
            parameters: Vec::new(),
            raw_parameters: false,
        }
    }

    /// Create a new codec entry that takes any number of parameters as a raw parameter vector.
    #[must_use]
    pub fn new_raw(id: FilterId, name: impl Into<String>) -> Self {
        Self {
            raw_parameters: true,
            ..Self::new(id, name)
        }
    }

    /// Add an alias for the codec name.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Append a parameter to the schema.
    ///
    /// The codec no longer takes raw parameters.
    #[must_use]
    pub fn with_parameter(mut self, parameter: CodecParameter) -> Self {
        self.parameters.push(parameter);
        self.raw_parameters = false;
        self
    }

    /// Return the filter identifier.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Return the codec name that is serialised in metadata.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the codec name aliases.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Return the parameter schema.
    #[must_use]
    pub fn parameters(&self) -> &[CodecParameter] {
        &self.parameters
    }

    /// Iterate over the codec name and its aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Returns true if the codec takes a raw parameter vector rather than named parameters.
    #[must_use]
    pub const fn has_raw_parameters(&self) -> bool {
        self.raw_parameters
    }

    /// Returns true if a filter with `count` parameters can be described by this codec.
    #[must_use]
    pub fn accepts_parameter_count(&self, count: usize) -> bool {
        self.raw_parameters || count == self.parameters.len()
    }

    /// Create the configuration of a filter with `parameters`.
    ///
    /// Returns [`None`] if the number of parameters does not match the schema.
    #[must_use]
    pub fn configuration(&self, parameters: &[u32]) -> Option<MetadataConfiguration> {
        if self.raw_parameters {
            return Some(raw_configuration(parameters));
        }
        if parameters.len() != self.parameters.len() {
            return None;
        }
        Some(
            self.parameters
                .iter()
                .zip(parameters)
                .map(|(parameter, &word)| (parameter.name.clone(), parameter.kind.to_json(word)))
                .collect(),
        )
    }

    /// Create the parameters of a filter from its `configuration`.
    ///
    /// Absent parameters take their default, with [`ParameterDefault::TypeSize`] resolved from `type_size`.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::InvalidParameterCount`] if `configuration` has a field not in the schema, or lacks a required field, or
    ///  - [`FilterError::JsonMalformed`] if a field is not an integer in range.
    pub fn parameters_from_configuration(
        &self,
        configuration: &MetadataConfiguration,
        type_size: usize,
    ) -> Result<Vec<u32>, FilterError> {
        if self.raw_parameters {
            return raw_parameters(self.id, configuration);
        }
        let count_error = || FilterError::InvalidParameterCount {
            id: self.id,
            expected: self.parameters.len(),
            actual: configuration.len(),
        };
        if configuration
            .keys()
            .any(|key| !self.parameters.iter().any(|parameter| &parameter.name == key))
        {
            return Err(count_error());
        }
        self.parameters
            .iter()
            .map(|parameter| match configuration.get(&parameter.name) {
                Some(value) => parameter.kind.from_json(value).ok_or_else(|| {
                    FilterError::JsonMalformed(format!(
                        "codec {} parameter {} has invalid value {value}",
                        self.name, parameter.name
                    ))
                }),
                None => parameter.default.resolve(type_size).ok_or_else(count_error),
            })
            .collect()
    }
}
