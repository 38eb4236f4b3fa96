//! The CRC32C checksum filter.
//!
//! Appends a little endian CRC32C checksum of the data on encode, and validates and strips it on decode.
//! Validation can be disabled with [`Config::set_validate_checksums`](crate::config::Config::set_validate_checksums).

use crate::{
    config::global_config,
    filter::FILTER_ID_CRC32C,
    plugin::{BuiltinPlugin, FilterClass, FilterPluginTraits, PluginError},
};

use super::no_parameters;

const NAME: &str = "crc32c";
const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();

// Register the plugin.
inventory::submit! {
    BuiltinPlugin::new(FILTER_ID_CRC32C, NAME, FilterClass::Checksum, create_plugin_crc32c)
}

fn create_plugin_crc32c() -> Box<dyn FilterPluginTraits> {
    Box::new(Crc32cFilter)
}

/// A CRC32C checksum filter implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32cFilter;

impl FilterPluginTraits for Crc32cFilter {
    fn encode(
        &self,
        mut decoded_value: Vec<u8>,
        parameters: &[u32],
    ) -> Result<Vec<u8>, PluginError> {
        no_parameters(parameters)?;
        let checksum = crc32c::crc32c(&decoded_value).to_le_bytes();
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
                "CRC32C checksum decoder expects a 32 bit input".to_string(),
            ));
        }
        let decoded_len = encoded_value.len() - CHECKSUM_SIZE;
        if global_config().validate_checksums() {
            let checksum = crc32c::crc32c(&encoded_value[..decoded_len]).to_le_bytes();
            if checksum != encoded_value[decoded_len..] {
                return Err(PluginError::InvalidChecksum);
            }
        }
        encoded_value.truncate(decoded_len);
        Ok(encoded_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32c_round_trip() {
        let bytes: Vec<u8> = (0..64).collect();
        let encoded = Crc32cFilter.encode(bytes.clone(), &[]).unwrap();
        assert_eq!(encoded.len(), bytes.len() + CHECKSUM_SIZE);
        assert_eq!(
            &encoded[bytes.len()..],
            &crc32c::crc32c(&bytes).to_le_bytes()
        );
        let decoded = Crc32cFilter.decode(encoded, &[]).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn crc32c_corrupt() {
        let mut encoded = Crc32cFilter.encode(vec![1, 2, 3, 4], &[]).unwrap();
        encoded[1] ^= 1;
        assert!(matches!(
            Crc32cFilter.decode(encoded, &[]),
            Err(PluginError::InvalidChecksum)
        ));
        assert!(Crc32cFilter.decode(vec![1, 2], &[]).is_err());
    }
}
