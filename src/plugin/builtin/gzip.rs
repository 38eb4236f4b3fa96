//! The gzip filter.

use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};

use crate::{
    filter::FILTER_ID_GZIP,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

use super::single_parameter;

const NAME: &str = "gzip";

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_GZIP, NAME, FilterClass::Compression, create_plugin_gzip)
}

fn create_plugin_gzip() -> Box<dyn FilterPluginTraits> {
    Box::new(GzipFilter)
}

/// A gzip filter implementation.
///
/// Parameters: `[level]` with `level` in `0..=9`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GzipFilter;

impl FilterPluginTraits for GzipFilter {
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let level = single_parameter(parameters, 0..=9)?;
        let mut encoder = GzEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(level),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>, _parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip() {
        let elements: Vec<u16> = (0..32).collect();
        let bytes = bytemuck::cast_slice::<u16, u8>(&elements).to_vec();
        let encoded = GzipFilter.encode(bytes.clone(), &[5]).unwrap();
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
        let decoded = GzipFilter.decode(encoded, &[5]).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn gzip_empty() {
        let encoded = GzipFilter.encode(vec![], &[1]).unwrap();
        assert!(GzipFilter.decode(encoded, &[1]).unwrap().is_empty());
    }
}
