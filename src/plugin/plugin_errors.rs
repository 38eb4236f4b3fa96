use std::path::PathBuf;

use thiserror::Error;

/// The cause of a plugin failure while encoding or decoding.
#[derive(Debug, Error)]
pub enum PluginError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An embedded checksum does not match the decoded value.
    #[error("the checksum is invalid")]
    InvalidChecksum,
    /// The filter parameters are not supported by the plugin.
    #[error("invalid parameters {parameters:?}: {reason}")]
    InvalidParameters {
        /// The supplied parameters.
        parameters: Vec<u32>,
        /// Why the parameters are invalid.
        reason: String,
    },
    /// A native filter function reported failure.
    #[error("native filter {_0} reported failure")]
    NativeFailure(String),
    /// A buffer for a native filter could not be allocated.
    #[error("failed to allocate a {_0} byte buffer")]
    AllocationFailure(usize),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl PluginError {
    /// Create a new [`PluginError::InvalidParameters`].
    #[must_use]
    pub fn invalid_parameters(parameters: &[u32], reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            parameters: parameters.to_vec(),
            reason: reason.into(),
        }
    }
}

/// A plugin candidate that could not be loaded.
///
/// These are recorded as warnings during discovery, they are never fatal.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    /// The shared library could not be opened.
    #[error("failed to load plugin library {path}: {source}")]
    Library {
        /// The plugin path.
        path: PathBuf,
        /// The loader error.
        #[source]
        source: libloading::Error,
    },
    /// The shared library does not export a required entry point.
    #[error("plugin library {path} does not export {symbol}")]
    MissingEntryPoint {
        /// The plugin path.
        path: PathBuf,
        /// The missing symbol.
        symbol: &'static str,
    },
    /// The shared library is a plugin, but not a filter plugin.
    #[error("plugin library {path} is not a filter plugin (type {plugin_type})")]
    NotAFilter {
        /// The plugin path.
        path: PathBuf,
        /// The reported plugin type.
        plugin_type: i32,
    },
    /// The plugin descriptor is null or invalid.
    #[error("plugin library {path} has an invalid descriptor: {reason}")]
    InvalidDescriptor {
        /// The plugin path.
        path: PathBuf,
        /// Why the descriptor is invalid.
        reason: String,
    },
    /// A plugin for the same filter identifier is already registered.
    #[error("plugin library {path} provides filter {id}, which is already registered")]
    DuplicateIdentifier {
        /// The plugin path.
        path: PathBuf,
        /// The filter identifier.
        id: u32,
    },
}

impl PluginLoadError {
    /// Return the path of the plugin candidate.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Library { path, .. }
            | Self::MissingEntryPoint { path, .. }
            | Self::NotAFilter { path, .. }
            | Self::InvalidDescriptor { path, .. }
            | Self::DuplicateIdentifier { path, .. } => path,
        }
    }
}
