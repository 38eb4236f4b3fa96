//! Zarrs filters global configuration options.

use std::{
    path::PathBuf,
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Global configuration options for the zarrs filters crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Validate Checksums
///  > default: [`true`]
///
/// If enabled, checksum filters (e.g. `fletcher32` and `crc32c`) will validate that decoded data matches stored checksums, otherwise validation is skipped.
///
/// ## Plugin Search Paths
///  > default: [`None`]
///
/// Directories searched for native filter plugins when the `HDF5_PLUGIN_PATH` environment variable is unset.
/// If [`None`], the platform default plugin directory is searched instead.
/// See [`plugin_search_paths`](crate::plugin::plugin_search_paths).
#[derive(Debug)]
pub struct Config {
    validate_checksums: bool,
    plugin_search_paths: Option<Vec<PathBuf>>,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            validate_checksums: true,
            plugin_search_paths: None,
        }
    }
}

impl Config {
    /// Get the [validate checksums](#validate-checksums) configuration.
    #[must_use]
    pub fn validate_checksums(&self) -> bool {
        self.validate_checksums
    }

    /// Set the [validate checksums](#validate-checksums) configuration.
    pub fn set_validate_checksums(&mut self, validate_checksums: bool) {
        self.validate_checksums = validate_checksums;
    }

    /// Get the [plugin search paths](#plugin-search-paths) configuration.
    #[must_use]
    pub fn plugin_search_paths(&self) -> Option<&[PathBuf]> {
        self.plugin_search_paths.as_deref()
    }

    /// Set the [plugin search paths](#plugin-search-paths) configuration.
    pub fn set_plugin_search_paths(&mut self, plugin_search_paths: Option<Vec<PathBuf>>) {
        self.plugin_search_paths = plugin_search_paths;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global zarrs filters configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global zarrs filters configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_plugin_search_paths() {
        assert!(global_config().plugin_search_paths().is_none());
        global_config_mut().set_plugin_search_paths(Some(vec!["/opt/plugins".into()]));
        assert_eq!(
            global_config().plugin_search_paths(),
            Some([PathBuf::from("/opt/plugins")].as_slice())
        );
        global_config_mut().set_plugin_search_paths(None);
    }
}
