//! Filters and filter chains.
//!
//! A [`Filter`] is one stage of the data transformation pipeline attached to a variable.
//! It is identified by an HDF5 style [`FilterId`] and carries a vector of `u32` parameters.
//!
//! A [`FilterChain`] is the ordered sequence of filters applied to a variable's chunks.
//! Encoding applies the filters in chain order and decoding applies them in reverse.
//! Variables expose their chain to this crate through the [`FilterVariable`] trait.

mod filter_chain;
mod filter_errors;
mod filter_variable;

pub use filter_chain::FilterChain;
pub use filter_errors::{FilterError, FilterExecutionError};
pub use filter_variable::{
    add_filter, free_filters, remove_filter, setup_filters, FilterVariable,
};

#[cfg(test)]
pub(crate) use filter_variable::tests::TestVariable;

use std::sync::{Arc, Weak};

use derive_more::Display;

use crate::{codec_catalog::CodecEntry, plugin::Plugin};

/// A filter identifier.
///
/// Identifiers follow the HDF5 filter registry.
pub type FilterId = u32;

/// The HDF5 deflate filter, exposed as the `zlib` codec.
pub const FILTER_ID_DEFLATE: FilterId = 1;
/// The HDF5 shuffle filter.
pub const FILTER_ID_SHUFFLE: FilterId = 2;
/// The HDF5 fletcher32 checksum filter.
pub const FILTER_ID_FLETCHER32: FilterId = 3;
/// The registered bzip2 filter.
pub const FILTER_ID_BZIP2: FilterId = 307;
/// The registered LZ4 filter.
pub const FILTER_ID_LZ4: FilterId = 32004;
/// The registered zstandard filter.
pub const FILTER_ID_ZSTD: FilterId = 32015;

/// The first identifier of the private range used by built-in filters without a registered HDF5 identifier.
///
/// Registered HDF5 identifiers fit in 16 bits, so this range cannot collide with them.
pub const FILTER_ID_PRIVATE_BASE: FilterId = 0x8000_0000;
/// The built-in gzip filter.
pub const FILTER_ID_GZIP: FilterId = FILTER_ID_PRIVATE_BASE + 1;
/// The built-in CRC32C checksum filter.
pub const FILTER_ID_CRC32C: FilterId = FILTER_ID_PRIVATE_BASE + 2;

/// The direction a filter chain is applied in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum FilterDirection {
    /// Write-time, chain order.
    #[display("encode")]
    Encode,
    /// Read-time, reverse chain order.
    #[display("decode")]
    Decode,
}

/// One stage of a [`FilterChain`].
///
/// The plugin and codec resolved by [`FilterChain::setup`] are held as weak references.
/// If the owning [`FilterContext`](crate::context::FilterContext) is finalized, they no longer resolve and the filter is treated as unresolved.
#[derive(Clone, Debug)]
pub struct Filter {
    id: FilterId,
    parameters: Vec<u32>,
    resolved_plugin: Option<Weak<Plugin>>,
    resolved_codec: Option<Weak<CodecEntry>>,
}

impl Filter {
    /// Create a new unresolved filter.
    #[must_use]
    pub fn new(id: FilterId, parameters: Vec<u32>) -> Self {
        Self {
            id,
            parameters,
            resolved_plugin: None,
            resolved_codec: None,
        }
    }

    /// Return the filter identifier.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Return the filter parameters.
    #[must_use]
    pub fn parameters(&self) -> &[u32] {
        &self.parameters
    }

    /// Return the resolved plugin, if it was resolved and is still registered.
    #[must_use]
    pub fn plugin(&self) -> Option<Arc<Plugin>> {
        self.resolved_plugin.as_ref().and_then(Weak::upgrade)
    }

    /// Return the resolved codec, if it was resolved and is still registered.
    #[must_use]
    pub fn codec(&self) -> Option<Arc<CodecEntry>> {
        self.resolved_codec.as_ref().and_then(Weak::upgrade)
    }

    /// Returns true if the filter has a live plugin supporting `direction`.
    #[must_use]
    pub fn is_executable(&self, direction: FilterDirection) -> bool {
        self.plugin()
            .is_some_and(|plugin| plugin.supports(direction))
    }

    pub(crate) fn resolve(
        &mut self,
        plugin: Option<&Arc<Plugin>>,
        codec: Option<&Arc<CodecEntry>>,
    ) {
        self.resolved_plugin = plugin.map(Arc::downgrade);
        self.resolved_codec = codec.map(Arc::downgrade);
    }

    /// Apply the filter to `bytes` as stage `stage` of a chain.
    pub(crate) fn apply(
        &self,
        stage: usize,
        bytes: Vec<u8>,
        direction: FilterDirection,
    ) -> Result<Vec<u8>, FilterError> {
        let plugin = self
            .plugin()
            .filter(|plugin| plugin.supports(direction))
            .ok_or(FilterError::UnresolvedFilter {
                id: self.id,
                direction,
            })?;
        let input_len = bytes.len();
        let output = match direction {
            FilterDirection::Encode => plugin.encode(bytes, &self.parameters),
            FilterDirection::Decode => plugin.decode(bytes, &self.parameters),
        }
        .map_err(|source| FilterExecutionError::new(self.id, stage, direction, source))?;
        tracing::trace!(
            filter = self.id,
            stage,
            %direction,
            input_len,
            output_len = output.len(),
            "applied filter"
        );
        Ok(output)
    }
}
