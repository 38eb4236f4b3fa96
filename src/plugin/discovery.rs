//! Plugin discovery on the plugin search path.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::config::global_config;

use super::{Plugin, PluginLoadError, PluginLoaderTraits, PluginSource};

/// The environment variable holding the plugin search path.
///
/// Directories are separated by the platform path list separator (`:` on Unix, `;` on Windows).
pub const PLUGIN_PATH_ENV: &str = "HDF5_PLUGIN_PATH";

#[cfg(not(windows))]
const PLUGIN_DIR_UNIX: &str = "/usr/local/hdf5/plugin";

#[cfg(windows)]
const WIN32_ROOT_ENV: &str = "ALLUSERSPROFILE";

/// The plugins and load warnings of a discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveredPlugins {
    /// The loaded plugins, in discovery order.
    pub plugins: Vec<Plugin>,
    /// The plugin candidates that could not be loaded.
    pub warnings: Vec<PluginLoadError>,
}

/// Return the plugin search path.
///
/// This is [`PLUGIN_PATH_ENV`] if set, otherwise the [plugin search paths](crate::config::Config#plugin-search-paths) configuration if set, otherwise [`default_plugin_search_paths`].
#[must_use]
pub fn plugin_search_paths() -> Vec<PathBuf> {
    let configured = global_config().plugin_search_paths().map(<[PathBuf]>::to_vec);
    search_paths_from(std::env::var_os(PLUGIN_PATH_ENV), configured.as_deref())
}

/// Return the plugin search path given the value of [`PLUGIN_PATH_ENV`] and the configured search paths.
#[must_use]
pub fn search_paths_from(env_value: Option<OsString>, configured: Option<&[PathBuf]>) -> Vec<PathBuf> {
    match env_value.filter(|value| !value.is_empty()) {
        Some(value) => std::env::split_paths(&value)
            .filter(|path| !path.as_os_str().is_empty())
            .collect(),
        None => configured.map_or_else(default_plugin_search_paths, <[PathBuf]>::to_vec),
    }
}

/// Return the platform default plugin directories.
///
/// This is `/usr/local/hdf5/plugin` on Unix and `%ALLUSERSPROFILE%/hdf5/lib/plugin` on Windows.
#[must_use]
pub fn default_plugin_search_paths() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var_os(WIN32_ROOT_ENV)
            .map(|root| vec![PathBuf::from(root).join("hdf5").join("lib").join("plugin")])
            .unwrap_or_default()
    }
    #[cfg(not(windows))]
    {
        vec![PathBuf::from(PLUGIN_DIR_UNIX)]
    }
}

/// Returns true if the file name of `path` follows the platform shared library naming convention.
///
/// That is `lib*.so` on Unix, `lib*.dylib` or `lib*.so` on macOS, and `*.dll` on Windows.
#[must_use]
pub fn is_plugin_candidate(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
        return false;
    };
    let Some(stem) = file_name.strip_prefix(std::env::consts::DLL_PREFIX) else {
        return false;
    };
    let suffixes: &[&str] = if cfg!(target_os = "macos") {
        &[std::env::consts::DLL_SUFFIX, ".so"]
    } else {
        &[std::env::consts::DLL_SUFFIX]
    };
    suffixes
        .iter()
        .any(|suffix| stem.len() > suffix.len() && stem.ends_with(suffix))
}

/// Load every plugin candidate in `search_paths` with `loader`.
///
/// Directories are scanned in order, and the files of each directory in file name order.
/// Directories that do not exist or cannot be read are skipped.
/// Candidates that fail to load are logged and recorded as warnings, discovery continues.
pub fn discover_plugins(
    loader: &dyn PluginLoaderTraits,
    search_paths: &[PathBuf],
) -> DiscoveredPlugins {
    let mut discovered = DiscoveredPlugins::default();
    for dir in search_paths {
        if !dir.is_dir() {
            tracing::debug!("skipping plugin directory {}: not a directory", dir.display());
            continue;
        }
        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping plugin directory entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_plugin_candidate(entry.path()) {
                continue;
            }
            match loader.load(entry.path()) {
                Ok(plugin) => {
                    let plugin =
                        plugin.with_source(PluginSource::Native(entry.path().to_path_buf()));
                    tracing::debug!(
                        filter = plugin.id(),
                        "loaded plugin {} from {}",
                        plugin.name(),
                        entry.path().display()
                    );
                    discovered.plugins.push(plugin);
                }
                Err(err) => {
                    tracing::warn!("skipping plugin candidate: {err}");
                    discovered.warnings.push(err);
                }
            }
        }
    }
    discovered
}
