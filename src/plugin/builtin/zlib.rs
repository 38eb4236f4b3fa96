//! The zlib filter, compatible with the HDF5 deflate filter.

use std::io::Read;

use flate2::bufread::{ZlibDecoder, ZlibEncoder};

use crate::{
    filter::FILTER_ID_DEFLATE,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

use super::single_parameter;

const NAME: &str = "zlib";

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_DEFLATE, NAME, FilterClass::Compression, create_plugin_zlib)
}

fn create_plugin_zlib() -> Box<dyn FilterPluginTraits> {
    Box::new(ZlibFilter)
}

/// A zlib filter implementation.
///
/// Parameters: `[level]` with `level` in `0..=9`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZlibFilter;

impl FilterPluginTraits for ZlibFilter {
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let level = single_parameter(parameters, 0..=9)?;
        let mut encoder =
            ZlibEncoder::new(decoded_value.as_slice(), flate2::Compression::new(level));
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>, _parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let mut decoder = ZlibDecoder::new(encoded_value.as_slice());
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
