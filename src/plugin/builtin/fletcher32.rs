//! The HDF5 fletcher32 checksum filter.
//!
//! Appends the HDF5 fletcher32 checksum of the data as 4 little endian bytes on encode.
//! Decode validates and strips the checksum, unless disabled with [`Config::set_validate_checksums`](crate::config::Config::set_validate_checksums).

use crate::{
    config::global_config,
    filter::FILTER_ID_FLETCHER32,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

use super::no_parameters;

const NAME: &str = "fletcher32";
const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();

/// The maximum number of 16-bit words summed before folding without overflowing.
const BLOCK_WORDS: usize = 360;

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_FLETCHER32, NAME, FilterClass::Checksum, create_plugin_fletcher32)
}

fn create_plugin_fletcher32() -> Box<dyn FilterPluginTraits> {
    Box::new(Fletcher32Filter)
}

/// Compute the HDF5 fletcher32 checksum of `bytes`.
///
/// Bytes are summed as big endian 16-bit words, and an odd trailing byte as the high byte of a word.
#[must_use]
pub fn fletcher32(bytes: &[u8]) -> u32 {
    const fn fold(sum: u32) -> u32 {
        (sum & 0xFFFF) + (sum >> 16)
    }

    let mut sum1: u32 = 0;
    let mut sum2: u32 = 0;
    let (words, remainder) = bytes.split_at(bytes.len() & !1);
    for block in words.chunks(2 * BLOCK_WORDS) {
        for word in block.chunks_exact(2) {
            sum1 = sum1.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
            sum2 = sum2.wrapping_add(sum1);
        }
        sum1 = fold(sum1);
        sum2 = fold(sum2);
    }
    if let [byte] = remainder {
        sum1 = sum1.wrapping_add(u32::from(*byte) << 8);
        sum2 = sum2.wrapping_add(sum1);
        sum1 = fold(sum1);
        sum2 = fold(sum2);
    }
    sum1 = fold(sum1);
    sum2 = fold(sum2);
    (sum2 << 16) | sum1
}

/// A fletcher32 checksum filter implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fletcher32Filter;

impl FilterPluginTraits for Fletcher32Filter {
    fn encode(
        &self,
        mut decoded_value: Vec<u8>,
        parameters: &[u32],
    ) -> Result<Vec<u8>, PluginError> {
        no_parameters(parameters)?;
        let checksum = fletcher32(&decoded_value).to_le_bytes();
        decoded_value.reserve_exact(checksum.len());
        decoded_value.extend(&checksum);
        Ok(decoded_value)
    }

    fn decode(
        &self,
        mut encoded_value: Vec<u8>,
        _parameters: &[u32],
    ) -> Result<Vec<u8>, PluginError> {
        if encoded_value.len() < CHECKSUM_SIZE {
            return Err(PluginError::Other(
                "fletcher32 checksum decoder expects a 32 bit input".to_string(),
            ));
        }
        let decoded_len = encoded_value.len() - CHECKSUM_SIZE;
        if global_config().validate_checksums() {
            let checksum = fletcher32(&encoded_value[..decoded_len]).to_le_bytes();
            if checksum != encoded_value[decoded_len..] {
                return Err(PluginError::InvalidChecksum);
            }
        }
        encoded_value.truncate(decoded_len);
        Ok(encoded_value)
    }
}
