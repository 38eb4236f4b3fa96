//! The bzip2 filter.

use std::io::Read;

use crate::{
    filter::FILTER_ID_BZIP2,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

use super::single_parameter;

const NAME: &str = "bz2";

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_BZIP2, NAME, FilterClass::Compression, create_plugin_bz2)
}

fn create_plugin_bz2() -> Box<dyn FilterPluginTraits> {
    Box::new(Bz2Filter)
}

/// A bzip2 filter implementation.
///
/// Parameters: `[level]` with `level` in `1..=9`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bz2Filter;

impl FilterPluginTraits for Bz2Filter {
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let level = single_parameter(parameters, 1..=9)?;
        let mut encoder = bzip2::read::BzEncoder::new(
            decoded_value.as_slice(),
            bzip2::Compression::new(level),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>, _parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let mut decoder = bzip2::read::BzDecoder::new(encoded_value.as_slice());
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
