use thiserror::Error;

use crate::{codec_catalog::CodecConflictError, plugin::PluginError};

use super::{FilterDirection, FilterId};

/// A filter chain error.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter context has not been initialized.
    #[error("the filter context is not initialized")]
    NotInitialized,
    /// No plugin is registered for the filter identifier.
    #[error("no plugin is registered for filter {_0}")]
    PluginNotFound(FilterId),
    /// A plugin is already registered for the filter identifier.
    #[error("a plugin is already registered for filter {_0}")]
    DuplicatePlugin(FilterId),
    /// No codec is registered with the name or identifier.
    #[error("no codec is registered for {_0}")]
    CodecNotFound(String),
    /// A conflicting codec registration.
    #[error(transparent)]
    CodecConflict(#[from] CodecConflictError),
    /// The filter is already present in the chain.
    #[error("filter {_0} is already present in the filter chain")]
    DuplicateFilter(FilterId),
    /// The filter is not present in the chain.
    #[error("filter {_0} is not present in the filter chain")]
    FilterNotFound(FilterId),
    /// The number of parameters does not match the codec schema.
    #[error("filter {id} expects {expected} parameters, got {actual}")]
    InvalidParameterCount {
        /// The filter identifier.
        id: FilterId,
        /// The number of parameters in the codec schema.
        expected: usize,
        /// The number of parameters supplied.
        actual: usize,
    },
    /// Malformed codec metadata.
    #[error("malformed codec metadata: {_0}")]
    JsonMalformed(String),
    /// The filter has no plugin able to apply it in the requested direction.
    #[error("filter {id} cannot {direction}: no plugin is resolved")]
    UnresolvedFilter {
        /// The filter identifier.
        id: FilterId,
        /// The requested direction.
        direction: FilterDirection,
    },
    /// A plugin failed while applying a filter.
    #[error(transparent)]
    FilterExecutionFailure(#[from] FilterExecutionError),
}

/// A plugin failure while applying one stage of a filter chain.
#[derive(Debug, Error)]
#[error("filter {id} failed to {direction} at stage {stage}: {source}")]
pub struct FilterExecutionError {
    id: FilterId,
    stage: usize,
    direction: FilterDirection,
    #[source]
    source: PluginError,
}

impl FilterExecutionError {
    /// Create a new [`FilterExecutionError`].
    #[must_use]
    pub fn new(
        id: FilterId,
        stage: usize,
        direction: FilterDirection,
        source: PluginError,
    ) -> Self {
        Self {
            id,
            stage,
            direction,
            source,
        }
    }

    /// Return the identifier of the failed filter.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Return the index of the failed filter in the chain.
    #[must_use]
    pub const fn stage(&self) -> usize {
        self.stage
    }

    /// Return the direction the chain was applied in.
    #[must_use]
    pub const fn direction(&self) -> FilterDirection {
        self.direction
    }

    /// Return the cause reported by the plugin.
    #[must_use]
    pub const fn plugin_error(&self) -> &PluginError {
        &self.source
    }
}
