//! The filter context.
//!
//! A [`FilterContext`] owns the [`PluginRegistry`] and the [`CodecCatalog`].
//! It is reference counted by [`initialize`](FilterContext::initialize) and [`finalize`](FilterContext::finalize): the state is created by the first initialize and dropped, unloading native plugins, by the matching last finalize.
//!
//! Most applications use the process wide [`global_filter_context`].
//! Independent contexts can be created with [`FilterContext::new`], which is how tests isolate plugin registrations.

use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use parking_lot::{Mutex, RwLock};

use crate::{
    codec_catalog::{CodecCatalog, CodecEntry},
    filter::{FilterError, FilterId},
    plugin::{
        builtin_plugins, discover_plugins, plugin_search_paths, DiscoveredPlugins,
        NativePluginLoader, Plugin, PluginLoadError, PluginLoaderTraits, PluginRegistry,
        PluginSource,
    },
};

#[derive(Debug)]
struct FilterState {
    registry: PluginRegistry,
    catalog: CodecCatalog,
}

/// The outcome of a plugin discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// The identifiers of the registered plugins, in discovery order.
    pub loaded: Vec<FilterId>,
    /// The plugin candidates that were skipped.
    pub warnings: Vec<PluginLoadError>,
}

/// The plugin registry and codec catalog shared by filter chains.
#[derive(Debug, Default)]
pub struct FilterContext {
    /// The initialize count. Held for the duration of administrative operations.
    admin: Mutex<usize>,
    state: RwLock<Option<FilterState>>,
}

impl FilterContext {
    /// Create a new uninitialized filter context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the context.
    ///
    /// The first call creates an empty plugin registry and a codec catalog holding the [built-in codecs](crate::codec_catalog::builtin_codecs).
    /// Later calls only increment the initialize count.
    ///
    /// # Errors
    /// Returns [`FilterError::CodecConflict`] if the built-in codecs conflict.
    pub fn initialize(&self) -> Result<(), FilterError> {
        let mut count = self.admin.lock();
        if *count == 0 {
            let catalog = CodecCatalog::with_builtin_codecs()?;
            *self.state.write() = Some(FilterState {
                registry: PluginRegistry::new(),
                catalog,
            });
        }
        *count += 1;
        Ok(())
    }

    /// Finalize the context.
    ///
    /// The call matching the first [`initialize`](FilterContext::initialize) drops the registry and catalog.
    /// Filters resolved against this context become unresolved.
    /// Plugins still referenced elsewhere are logged and released when their last reference drops.
    ///
    /// # Errors
    /// Returns [`FilterError::NotInitialized`] if the context is not initialized.
    pub fn finalize(&self) -> Result<(), FilterError> {
        let mut count = self.admin.lock();
        if *count == 0 {
            return Err(FilterError::NotInitialized);
        }
        *count -= 1;
        if *count == 0 {
            let state = self.state.write().take();
            if let Some(state) = state {
                for plugin in state.registry.referenced_plugins() {
                    tracing::warn!(
                        filter = plugin.id(),
                        "plugin {} is still in use at finalize",
                        plugin.name()
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns true if the context is initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Discover native plugins in `search_paths`.
    ///
    /// See [`discover_with_loader`](FilterContext::discover_with_loader).
    ///
    /// # Errors
    /// Returns [`FilterError::NotInitialized`] if the context is not initialized.
    pub fn discover(&self, search_paths: &[PathBuf]) -> Result<DiscoveryReport, FilterError> {
        self.discover_with_loader(&NativePluginLoader, search_paths)
    }

    /// Discover native plugins in the [plugin search paths](crate::plugin::plugin_search_paths).
    ///
    /// # Errors
    /// Returns [`FilterError::NotInitialized`] if the context is not initialized.
    pub fn discover_default(&self) -> Result<DiscoveryReport, FilterError> {
        self.discover(&plugin_search_paths())
    }

    /// Discover plugins in `search_paths` with `loader`.
    ///
    /// Plugins are registered in discovery order.
    /// A plugin for an identifier that is already registered is skipped and reported as a warning.
    /// The codec defaults of each registered plugin are offered to the codec catalog, where the first registration of an identifier or name wins.
    ///
    /// # Errors
    /// Returns [`FilterError::NotInitialized`] if the context is not initialized.
    pub fn discover_with_loader(
        &self,
        loader: &dyn PluginLoaderTraits,
        search_paths: &[PathBuf],
    ) -> Result<DiscoveryReport, FilterError> {
        let _admin = self.admin.lock();
        if !self.is_initialized() {
            return Err(FilterError::NotInitialized);
        }
        let DiscoveredPlugins { plugins, warnings } = discover_plugins(loader, search_paths);
        let mut report = DiscoveryReport {
            loaded: Vec::with_capacity(plugins.len()),
            warnings,
        };

        let mut state = self.state.write();
        let state = state.as_mut().ok_or(FilterError::NotInitialized)?;
        for plugin in plugins {
            let id = plugin.id();
            if state.registry.contains(id) {
                let path = match plugin.source() {
                    PluginSource::Native(path) => path.clone(),
                    PluginSource::Builtin | PluginSource::Registered => PathBuf::new(),
                };
                let warning = PluginLoadError::DuplicateIdentifier { path, id };
                tracing::warn!("skipping plugin candidate: {warning}");
                report.warnings.push(warning);
                continue;
            }
            let plugin = state.registry.insert(plugin)?;
            for entry in plugin.codec_defaults() {
                state.catalog.register_default(entry.clone());
            }
            report.loaded.push(id);
        }
        Ok(report)
    }

    /// Register an in-process `plugin`.
    ///
    /// The codec defaults of the plugin are offered to the codec catalog.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::NotInitialized`] if the context is not initialized, or
    ///  - [`FilterError::DuplicatePlugin`] if a plugin is registered for the same identifier.
    pub fn register_plugin(&self, plugin: Plugin) -> Result<Arc<Plugin>, FilterError> {
        let _admin = self.admin.lock();
        let mut state = self.state.write();
        let state = state.as_mut().ok_or(FilterError::NotInitialized)?;
        let plugin = state.registry.insert(plugin)?;
        for entry in plugin.codec_defaults() {
            state.catalog.register_default(entry.clone());
        }
        Ok(plugin)
    }

    /// Register the built-in plugins enabled by crate features.
    ///
    /// Built-in plugins whose identifier is already registered are skipped, so native plugins discovered earlier take precedence.
    /// Returns the number of registered plugins.
    ///
    /// # Errors
    /// Returns [`FilterError::NotInitialized`] if the context is not initialized.
    pub fn register_builtin_plugins(&self) -> Result<usize, FilterError> {
        let _admin = self.admin.lock();
        let mut state = self.state.write();
        let state = state.as_mut().ok_or(FilterError::NotInitialized)?;
        let mut registered = 0;
        for builtin in builtin_plugins() {
            if state.registry.contains(builtin.identifier()) {
                tracing::debug!(
                    filter = builtin.identifier(),
                    "skipping built-in plugin: already registered"
                );
                continue;
            }
            state.registry.insert(builtin.create())?;
            registered += 1;
        }
        Ok(registered)
    }

    /// Register a codec `entry` in the codec catalog.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::NotInitialized`] if the context is not initialized, or
    ///  - [`FilterError::CodecConflict`] if `entry` conflicts with a registered codec.
    pub fn register_codec(&self, entry: CodecEntry) -> Result<Arc<CodecEntry>, FilterError> {
        let _admin = self.admin.lock();
        let mut state = self.state.write();
        let state = state.as_mut().ok_or(FilterError::NotInitialized)?;
        Ok(state.catalog.register(entry)?)
    }

    /// Lookup the plugin for filter `id`.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::NotInitialized`] if the context is not initialized, or
    ///  - [`FilterError::PluginNotFound`] if no plugin is registered for `id`.
    pub fn lookup_plugin(&self, id: FilterId) -> Result<Arc<Plugin>, FilterError> {
        self.state
            .read()
            .as_ref()
            .ok_or(FilterError::NotInitialized)?
            .registry
            .lookup(id)
    }

    /// Return the identifiers of the registered plugins in registration order.
    ///
    /// Empty if the context is not initialized.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<FilterId> {
        self.state.read().as_ref().map_or_else(Vec::new, |state| {
            state.registry.plugins().iter().map(|plugin| plugin.id()).collect()
        })
    }

    /// Resolve the codec entry for filter `id`.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::NotInitialized`] if the context is not initialized, or
    ///  - [`FilterError::CodecNotFound`] if no codec is registered for `id`.
    pub fn resolve_codec_by_id(&self, id: FilterId) -> Result<Arc<CodecEntry>, FilterError> {
        self.state
            .read()
            .as_ref()
            .ok_or(FilterError::NotInitialized)?
            .catalog
            .resolve_by_id(id)
    }

    /// Resolve the codec entry with name or alias `name`.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::NotInitialized`] if the context is not initialized, or
    ///  - [`FilterError::CodecNotFound`] if no codec is registered with `name`.
    pub fn resolve_codec_by_name(&self, name: &str) -> Result<Arc<CodecEntry>, FilterError> {
        self.state
            .read()
            .as_ref()
            .ok_or(FilterError::NotInitialized)?
            .catalog
            .resolve_by_name(name)
    }

    /// Resolve the codec entry for filter `id`, if the context is initialized and has one.
    #[must_use]
    pub fn try_resolve_codec_by_id(&self, id: FilterId) -> Option<Arc<CodecEntry>> {
        self.resolve_codec_by_id(id).ok()
    }
}

static GLOBAL_FILTER_CONTEXT: OnceLock<FilterContext> = OnceLock::new();

/// Returns the process wide filter context.
///
/// The context is created uninitialized on first use.
pub fn global_filter_context() -> &'static FilterContext {
    GLOBAL_FILTER_CONTEXT.get_or_init(FilterContext::new)
}
