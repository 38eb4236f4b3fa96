//! The HDF5 shuffle filter.
//!
//! Reorders the bytes of fixed size elements so that byte `j` of every element is stored contiguously.
//! Trailing bytes that do not form a whole element are left in place.

use crate::{
    filter::FILTER_ID_SHUFFLE,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

const NAME: &str = "shuffle";

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_SHUFFLE, NAME, FilterClass::Reordering, create_plugin_shuffle)
}

fn create_plugin_shuffle() -> Box<dyn FilterPluginTraits> {
    Box::new(ShuffleFilter)
}

/// A shuffle filter implementation.
///
/// Parameters: `[elementsize]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShuffleFilter;

fn element_size(parameters: &[u32]) -> Result<usize, PluginError> {
    match parameters {
        [element_size] if *element_size > 0 => usize::try_from(*element_size)
            .map_err(|_| PluginError::invalid_parameters(parameters, "element size too large")),
        _ => Err(PluginError::invalid_parameters(
            parameters,
            "expected one non-zero element size",
        )),
    }
}

impl FilterPluginTraits for ShuffleFilter {
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let element_size = element_size(parameters)?;
        let elements = decoded_value.len() / element_size;
        if element_size == 1 || elements <= 1 {
            return Ok(decoded_value);
        }
        let mut out = vec![0; decoded_value.len()];
        for (i, element) in decoded_value.chunks_exact(element_size).enumerate() {
            for (j, byte) in element.iter().enumerate() {
                out[j * elements + i] = *byte;
            }
        }
        let shuffled_len = elements * element_size;
        out[shuffled_len..].copy_from_slice(&decoded_value[shuffled_len..]);
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        let element_size = element_size(parameters)?;
        let elements = encoded_value.len() / element_size;
        if element_size == 1 || elements <= 1 {
            return Ok(encoded_value);
        }
        let mut out = vec![0; encoded_value.len()];
        for (i, element) in out.chunks_exact_mut(element_size).enumerate() {
            for (j, byte) in element.iter_mut().enumerate() {
                *byte = encoded_value[j * elements + i];
            }
        }
        let shuffled_len = elements * element_size;
        out[shuffled_len..].copy_from_slice(&encoded_value[shuffled_len..]);
        Ok(out)
    }
}
