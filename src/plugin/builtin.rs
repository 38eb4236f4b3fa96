//! Built-in filter plugins.
//!
//! Rust implementations of common HDF5 filters, so chains using them work without native plugins installed.
//! Each plugin is registered at compile time and installed into a context by [`FilterContext::register_builtin_plugins`](crate::context::FilterContext::register_builtin_plugins).
//!
//! | Filter | Identifier | Parameters | Feature |
//! |--------|------------|------------|---------|
//! | zlib (HDF5 deflate) | [`FILTER_ID_DEFLATE`](crate::filter::FILTER_ID_DEFLATE) | `level` | `zlib` |
//! | shuffle | [`FILTER_ID_SHUFFLE`](crate::filter::FILTER_ID_SHUFFLE) | `elementsize` | |
//! | fletcher32 | [`FILTER_ID_FLETCHER32`](crate::filter::FILTER_ID_FLETCHER32) | | |
//! | bz2 | [`FILTER_ID_BZIP2`](crate::filter::FILTER_ID_BZIP2) | `level` | `bz2` |
//! | zstd | [`FILTER_ID_ZSTD`](crate::filter::FILTER_ID_ZSTD) | `level` | `zstd` |
//! | gzip | [`FILTER_ID_GZIP`](crate::filter::FILTER_ID_GZIP) | `level` | `gzip` |
//! | crc32c | [`FILTER_ID_CRC32C`](crate::filter::FILTER_ID_CRC32C) | | `crc32c` |

#[cfg(feature = "bz2")]
pub mod bz2;
#[cfg(feature = "crc32c")]
pub mod crc32c;
pub mod fletcher32;
#[cfg(feature = "gzip")]
pub mod gzip;
pub mod shuffle;
#[cfg(feature = "zlib")]
pub mod zlib;
#[cfg(feature = "zstd")]
pub mod zstd;

use super::PluginError;

/// Return the only parameter in `parameters`, checking it is in `range`.
#[cfg(any(feature = "bz2", feature = "gzip", feature = "zlib"))]
pub(crate) fn single_parameter(
    parameters: &[u32],
    range: std::ops::RangeInclusive<u32>,
) -> Result<u32, PluginError> {
    match parameters {
        [value] if range.contains(value) => Ok(*value),
        [_] => Err(PluginError::invalid_parameters(
            parameters,
            format!("expected a value in {}..={}", range.start(), range.end()),
        )),
        _ => Err(PluginError::invalid_parameters(
            parameters,
            "expected one parameter",
        )),
    }
}

/// Check that `parameters` is empty.
pub(crate) fn no_parameters(parameters: &[u32]) -> Result<(), PluginError> {
    if parameters.is_empty() {
        Ok(())
    } else {
        Err(PluginError::invalid_parameters(
            parameters,
            "expected no parameters",
        ))
    }
}
