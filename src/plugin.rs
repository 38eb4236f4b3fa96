//! Filter plugins.
//!
//! A [`Plugin`] implements the encode and decode transforms of one filter identifier through the [`FilterPluginTraits`] capability interface.
//! Plugins come from three sources:
//!  - native HDF5 filter plugins discovered in shared libraries on the plugin search path (see [`discover_plugins`] and [`NativePluginLoader`]),
//!  - built-in Rust implementations of common filters (see [`builtin`]), registered at compile time using the [inventory] crate, and
//!  - plugins registered directly by the application.
//!
//! Only the [`native_plugin`] module touches platform specific dynamic loading.
//! The filter chain engine depends only on [`FilterPluginTraits`].

pub mod builtin;
mod discovery;
pub mod native_plugin;
mod plugin_errors;
mod plugin_loader;
mod plugin_registry;

pub use discovery::{
    default_plugin_search_paths, discover_plugins, is_plugin_candidate, plugin_search_paths,
    search_paths_from, DiscoveredPlugins, PLUGIN_PATH_ENV,
};
pub use native_plugin::NativePluginLoader;
pub use plugin_errors::{PluginError, PluginLoadError};
pub use plugin_loader::PluginLoaderTraits;
pub use plugin_registry::PluginRegistry;

use std::path::PathBuf;

use crate::{
    codec_catalog::CodecEntry,
    filter::{FilterDirection, FilterId},
};

/// The encode and decode transforms of a filter.
pub trait FilterPluginTraits: Send + Sync + core::fmt::Debug {
    /// Encode `decoded_value` with `parameters`.
    ///
    /// The input buffer is consumed, and may be returned transformed in place.
    ///
    /// # Errors
    /// Returns a [`PluginError`] if the parameters are invalid or encoding fails.
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError>;

    /// Decode `encoded_value` with `parameters`.
    ///
    /// # Errors
    /// Returns a [`PluginError`] if the parameters are invalid or decoding fails.
    fn decode(&self, encoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError>;

    /// Returns true if the plugin provides the transform for `direction`.
    fn supports(&self, _direction: FilterDirection) -> bool {
        true
    }
}

/// The class of transform a plugin applies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum FilterClass {
    /// Compression.
    Compression,
    /// A checksum.
    Checksum,
    /// A reordering of bytes, such as shuffle.
    Reordering,
    /// Unknown or other.
    #[default]
    Other,
}

/// Where a plugin came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PluginSource {
    /// A built-in Rust implementation.
    Builtin,
    /// Registered by the application.
    Registered,
    /// A native shared library.
    Native(PathBuf),
}

/// A filter plugin.
///
/// Plugins are owned by a [`PluginRegistry`] and referenced weakly by filters.
#[derive(Debug)]
pub struct Plugin {
    id: FilterId,
    name: String,
    version: u32,
    class: FilterClass,
    source: PluginSource,
    implementation: Box<dyn FilterPluginTraits>,
    codec_defaults: Vec<CodecEntry>,
}

impl Plugin {
    /// Create a new plugin for filter `id`.
    #[must_use]
    pub fn new(
        id: FilterId,
        name: impl Into<String>,
        implementation: Box<dyn FilterPluginTraits>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            version: 1,
            class: FilterClass::Other,
            source: PluginSource::Registered,
            implementation,
            codec_defaults: Vec::new(),
        }
    }

    /// Set the plugin version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the plugin class.
    #[must_use]
    pub fn with_class(mut self, class: FilterClass) -> Self {
        self.class = class;
        self
    }

    /// Set the codecs the plugin offers as defaults for the codec catalog.
    #[must_use]
    pub fn with_codec_defaults(mut self, codec_defaults: Vec<CodecEntry>) -> Self {
        self.codec_defaults = codec_defaults;
        self
    }

    #[must_use]
    pub(crate) fn with_source(mut self, source: PluginSource) -> Self {
        self.source = source;
        self
    }

    /// Return the filter identifier.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Return the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the plugin version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Return the plugin class.
    #[must_use]
    pub const fn class(&self) -> FilterClass {
        self.class
    }

    /// Return where the plugin came from.
    #[must_use]
    pub const fn source(&self) -> &PluginSource {
        &self.source
    }

    /// Return the codecs offered by the plugin as catalog defaults.
    #[must_use]
    pub fn codec_defaults(&self) -> &[CodecEntry] {
        &self.codec_defaults
    }

    /// Returns true if the plugin provides the transform for `direction`.
    #[must_use]
    pub fn supports(&self, direction: FilterDirection) -> bool {
        self.implementation.supports(direction)
    }

    /// Encode `decoded_value` with `parameters`.
    ///
    /// # Errors
    /// Returns a [`PluginError`] if encoding fails.
    pub fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        self.implementation.encode(decoded_value, parameters)
    }

    /// Decode `encoded_value` with `parameters`.
    ///
    /// # Errors
    /// Returns a [`PluginError`] if decoding fails.
    pub fn decode(&self, encoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        self.implementation.decode(encoded_value, parameters)
    }
}

/// A built-in plugin, registered at compile time.
pub struct BuiltinPlugin {
    /// The filter identifier of the plugin.
    identifier: FilterId,
    /// The plugin name.
    name: &'static str,
    /// The plugin class.
    class: FilterClass,
    /// Create the plugin implementation.
    create_fn: fn() -> Box<dyn FilterPluginTraits>,
}

inventory::collect!(BuiltinPlugin);

impl BuiltinPlugin {
    /// Create a new built-in plugin for registration.
    pub const fn new(
        identifier: FilterId,
        name: &'static str,
        class: FilterClass,
        create_fn: fn() -> Box<dyn FilterPluginTraits>,
    ) -> Self {
        Self {
            identifier,
            name,
            class,
            create_fn,
        }
    }

    /// Returns the filter identifier of the plugin.
    #[must_use]
    pub const fn identifier(&self) -> FilterId {
        self.identifier
    }

    /// Create a [`Plugin`].
    #[must_use]
    pub fn create(&self) -> Plugin {
        Plugin::new(self.identifier, self.name, (self.create_fn)())
            .with_class(self.class)
            .with_source(PluginSource::Builtin)
    }
}

/// Iterate over the built-in plugins registered at compile time.
pub fn builtin_plugins() -> impl Iterator<Item = &'static BuiltinPlugin> {
    inventory::iter::<BuiltinPlugin>.into_iter()
}
