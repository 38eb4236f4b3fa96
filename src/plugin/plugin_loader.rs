use std::path::Path;

use super::{Plugin, PluginLoadError};

/// Loads a [`Plugin`] from a plugin candidate file.
///
/// [`NativePluginLoader`](super::NativePluginLoader) loads HDF5 filter plugins from shared libraries.
/// Other implementations can be supplied to [`discover_plugins`](super::discover_plugins), for example to load plugins from another container format.
pub trait PluginLoaderTraits: Send + Sync {
    /// Load the plugin at `path`.
    ///
    /// # Errors
    /// Returns a [`PluginLoadError`] if `path` is not a usable plugin.
    fn load(&self, path: &Path) -> Result<Plugin, PluginLoadError>;
}
