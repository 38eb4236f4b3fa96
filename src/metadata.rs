//! Codec metadata.
//!
//! Translates filter chains to and from the ordered JSON codec array persisted in variable metadata under [`CODECS_METADATA_KEY`].
//! Each element is a [`CodecMetadata`]:
//!  - filters with a registered codec whose schema matches their parameters are serialised by codec name with named parameters, and
//!  - other filters are serialised with a raw codec name `hdf5filter.<id>` and their parameter vector, e.g. `{"codec": "hdf5filter.40000", "configuration": {"parameters": [1, 2]}}`.
//!
//! Plugin resolution does not affect serialisation, so chains referencing missing plugins can still be round tripped.

mod codec_metadata;

pub use codec_metadata::CodecMetadata;

use crate::{
    codec_catalog::ParameterKind,
    context::FilterContext,
    filter::{Filter, FilterChain, FilterError, FilterId, FilterVariable},
    plugin::FilterClass,
};

/// Configuration metadata, a JSON object.
pub type MetadataConfiguration = serde_json::Map<String, serde_json::Value>;

/// The variable metadata key of the codec array.
pub const CODECS_METADATA_KEY: &str = "codecs";

/// The name of the attribute exposing the primary filter parameters.
pub const CODECS_ATTRIBUTE: &str = "_Codecs";

/// The codec name prefix of filters serialised by identifier.
pub const RAW_CODEC_PREFIX: &str = "hdf5filter.";

const RAW_PARAMETERS_KEY: &str = "parameters";

/// Return the codec metadata of `filter`.
///
/// The codec is taken from the filter if resolved, otherwise from the codec catalog of `context`.
#[must_use]
pub fn filter_to_metadata(context: &FilterContext, filter: &Filter) -> CodecMetadata {
    let codec = filter
        .codec()
        .or_else(|| context.try_resolve_codec_by_id(filter.id()));
    if let Some(codec) = codec {
        if let Some(configuration) = codec.configuration(filter.parameters()) {
            return CodecMetadata::new(codec.name(), configuration);
        }
    }
    raw_codec_metadata(filter.id(), filter.parameters())
}

fn raw_codec_metadata(id: FilterId, parameters: &[u32]) -> CodecMetadata {
    CodecMetadata::new(
        format!("{RAW_CODEC_PREFIX}{id}"),
        raw_configuration(parameters),
    )
}

/// Create the raw configuration `{"parameters": [..]}`.
pub(crate) fn raw_configuration(parameters: &[u32]) -> MetadataConfiguration {
    let mut configuration = MetadataConfiguration::new();
    configuration.insert(RAW_PARAMETERS_KEY.to_string(), parameters.into());
    configuration
}

/// Return the codec metadata of every filter in `chain`, in chain order.
#[must_use]
pub fn to_json(context: &FilterContext, chain: &FilterChain) -> Vec<CodecMetadata> {
    chain
        .filters()
        .iter()
        .map(|filter| filter_to_metadata(context, filter))
        .collect()
}

/// Return the codec array of `chain` as a JSON value.
#[must_use]
pub fn to_json_value(context: &FilterContext, chain: &FilterChain) -> serde_json::Value {
    serde_json::Value::Array(
        to_json(context, chain)
            .into_iter()
            .map(CodecMetadata::into_value)
            .collect(),
    )
}

/// Return the filter identifier and parameters described by `metadata`.
///
/// Parameters absent from the configuration take their codec default, with type size defaults resolved from `type_size`.
///
/// # Errors
/// Returns
///  - [`FilterError::NotInitialized`] if `context` is not initialized,
///  - [`FilterError::InvalidParameterCount`] if the configuration does not match the codec schema, or
///  - [`FilterError::JsonMalformed`] if the codec is unknown or a value is invalid.
pub fn filter_from_metadata(
    context: &FilterContext,
    metadata: &CodecMetadata,
    type_size: usize,
) -> Result<(FilterId, Vec<u32>), FilterError> {
    match context.resolve_codec_by_name(metadata.codec()) {
        Ok(codec) => Ok((
            codec.id(),
            codec.parameters_from_configuration(metadata.configuration(), type_size)?,
        )),
        Err(FilterError::CodecNotFound(_)) => {
            let id = raw_filter_id(metadata.codec()).ok_or_else(|| {
                FilterError::JsonMalformed(format!("unknown codec {}", metadata.codec()))
            })?;
            Ok((id, raw_parameters(id, metadata.configuration())?))
        }
        Err(err) => Err(err),
    }
}

fn raw_filter_id(codec: &str) -> Option<FilterId> {
    codec.strip_prefix(RAW_CODEC_PREFIX)?.parse().ok()
}

/// Read the parameters of the raw configuration `{"parameters": [..]}`.
///
/// An absent parameter array is empty.
pub(crate) fn raw_parameters(
    id: FilterId,
    configuration: &MetadataConfiguration,
) -> Result<Vec<u32>, FilterError> {
    if configuration.keys().any(|key| key != RAW_PARAMETERS_KEY) {
        return Err(FilterError::JsonMalformed(format!(
            "filter {id} raw configuration must only have {RAW_PARAMETERS_KEY}"
        )));
    }
    let Some(parameters) = configuration.get(RAW_PARAMETERS_KEY) else {
        return Ok(Vec::new());
    };
    let malformed = || {
        FilterError::JsonMalformed(format!(
            "filter {id} raw parameters must be an array of unsigned 32-bit integers, got {parameters}"
        ))
    };
    parameters
        .as_array()
        .ok_or_else(malformed)?
        .iter()
        .map(|value| ParameterKind::Unsigned.from_json(value).ok_or_else(malformed))
        .collect()
}

/// Create a filter chain from a JSON codec array.
///
/// Elements with a raw codec name keep their parameter vector as is, even if a codec with a different schema is registered for the filter.
///
/// # Errors
/// Returns
///  - [`FilterError::JsonMalformed`] if `json` is not an array of codec metadata or an element is invalid,
///  - [`FilterError::InvalidParameterCount`] if a configuration does not match its codec schema, or
///  - [`FilterError::DuplicateFilter`] if a filter appears twice.
pub fn from_json(
    context: &FilterContext,
    type_size: usize,
    json: &serde_json::Value,
) -> Result<FilterChain, FilterError> {
    let elements = json
        .as_array()
        .ok_or_else(|| FilterError::JsonMalformed(format!("expected a codec array, got {json}")))?;
    let mut chain = FilterChain::new();
    for element in elements {
        let metadata: CodecMetadata = serde_json::from_value(element.clone())
            .map_err(|err| FilterError::JsonMalformed(format!("{element}: {err}")))?;
        let (id, parameters) = filter_from_metadata(context, &metadata, type_size)?;
        if is_raw_codec_name(metadata.codec(), id) {
            chain.add_raw(id, parameters)?;
        } else {
            chain.add(context, id, parameters)?;
        }
    }
    Ok(chain)
}

/// Set the filter chain of `variable` from a JSON codec array.
///
/// The chain of `variable` is left unset on error.
///
/// # Errors
/// See [`from_json`].
pub fn filters_from_json(
    context: &FilterContext,
    variable: &mut impl FilterVariable,
    json: &serde_json::Value,
) -> Result<(), FilterError> {
    let chain = from_json(context, variable.type_size(), json);
    match chain {
        Ok(chain) => {
            *variable.filter_chain_slot() = Some(chain);
            Ok(())
        }
        Err(err) => {
            *variable.filter_chain_slot() = None;
            Err(err)
        }
    }
}

/// Return the JSON codec array of the filter chain of `variable`.
///
/// An unset chain is an empty array.
#[must_use]
pub fn filters_to_json(context: &FilterContext, variable: &impl FilterVariable) -> serde_json::Value {
    variable.filter_chain().map_or_else(
        || serde_json::Value::Array(Vec::new()),
        |chain| to_json_value(context, chain),
    )
}

/// Set the filter chain of `variable` from the [`CODECS_METADATA_KEY`] entry of `metadata`.
///
/// If `metadata` has no codec array, the chain is set empty.
///
/// # Errors
/// See [`from_json`].
pub fn filters_from_metadata(
    context: &FilterContext,
    variable: &mut impl FilterVariable,
    metadata: &MetadataConfiguration,
) -> Result<(), FilterError> {
    match metadata.get(CODECS_METADATA_KEY) {
        Some(json) => filters_from_json(context, variable, json),
        None => {
            *variable.filter_chain_slot() = Some(FilterChain::new());
            Ok(())
        }
    }
}

/// Write the codec array of `variable` to the [`CODECS_METADATA_KEY`] entry of `metadata`.
pub fn filters_to_metadata(
    context: &FilterContext,
    variable: &impl FilterVariable,
    metadata: &mut MetadataConfiguration,
) {
    metadata.insert(
        CODECS_METADATA_KEY.to_string(),
        filters_to_json(context, variable),
    );
}

/// Return the primary filter of `chain`.
///
/// This is the first filter resolved to a compression plugin, or the first filter if none are.
#[must_use]
pub fn primary_filter(chain: &FilterChain) -> Option<&Filter> {
    chain
        .filters()
        .iter()
        .find(|filter| {
            filter
                .plugin()
                .is_some_and(|plugin| plugin.class() == FilterClass::Compression)
        })
        .or_else(|| chain.filters().first())
}

/// Return the parameters of the primary filter of `variable` as little endian bytes.
///
/// This is the value of the [`CODECS_ATTRIBUTE`] attribute.
/// Returns [`None`] if the variable has no filters.
#[must_use]
pub fn codec_attribute(variable: &impl FilterVariable) -> Option<Vec<u8>> {
    let filter = primary_filter(variable.filter_chain()?)?;
    Some(
        filter
            .parameters()
            .iter()
            .flat_map(|parameter| parameter.to_le_bytes())
            .collect(),
    )
}

/// Returns true if `codec` is a raw codec name for filter `id`.
#[must_use]
pub fn is_raw_codec_name(codec: &str, id: FilterId) -> bool {
    raw_filter_id(codec) == Some(id)
}
