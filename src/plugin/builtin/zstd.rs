//! The zstandard filter.

use crate::{
    filter::FILTER_ID_ZSTD,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

const NAME: &str = "zstd";

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_ZSTD, NAME, FilterClass::Compression, create_plugin_zstd)
}

fn create_plugin_zstd() -> Box<dyn FilterPluginTraits> {
    Box::new(ZstdFilter)
}

/// A zstandard filter implementation.
///
/// Parameters: `[level]`, where `level` is a signed compression level stored as its two's complement word.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZstdFilter;

impl FilterPluginTraits for ZstdFilter {
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let [level] = parameters else {
            return Err(PluginError::invalid_parameters(
                parameters,
                "expected one parameter",
            ));
        };
        let level = i32::from_ne_bytes(level.to_ne_bytes());
        Ok(zstd::encode_all(decoded_value.as_slice(), level)?)
    }

    fn decode(&self, encoded_value: Vec<u8>, _parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        Ok(zstd::decode_all(encoded_value.as_slice())?)
    }
}
