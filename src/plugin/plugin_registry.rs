use std::{collections::HashMap, sync::Arc};

use crate::filter::{FilterError, FilterId};

use super::Plugin;

/// A table of plugins keyed by filter identifier.
///
/// Plugins are kept in registration order.
/// Dropping the registry unloads every plugin not referenced elsewhere.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<Plugin>>,
    index: HashMap<FilterId, usize>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `plugin`.
    ///
    /// # Errors
    /// Returns [`FilterError::DuplicatePlugin`] if a plugin is already registered for the same identifier.
    pub fn insert(&mut self, plugin: Plugin) -> Result<Arc<Plugin>, FilterError> {
        let id = plugin.id();
        if self.index.contains_key(&id) {
            return Err(FilterError::DuplicatePlugin(id));
        }
        let plugin = Arc::new(plugin);
        self.index.insert(id, self.plugins.len());
        self.plugins.push(plugin.clone());
        Ok(plugin)
    }

    /// Lookup the plugin for filter `id`.
    ///
    /// # Errors
    /// Returns [`FilterError::PluginNotFound`] if no plugin is registered for `id`.
    pub fn lookup(&self, id: FilterId) -> Result<Arc<Plugin>, FilterError> {
        self.index
            .get(&id)
            .map(|&index| self.plugins[index].clone())
            .ok_or(FilterError::PluginNotFound(id))
    }

    /// Returns true if a plugin is registered for filter `id`.
    #[must_use]
    pub fn contains(&self, id: FilterId) -> bool {
        self.index.contains_key(&id)
    }

    /// Return the plugins in registration order.
    #[must_use]
    pub fn plugins(&self) -> &[Arc<Plugin>] {
        &self.plugins
    }

    /// Return the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Return the plugins still referenced outside of the registry.
    pub(crate) fn referenced_plugins(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.plugins
            .iter()
            .filter(|plugin| Arc::strong_count(plugin) > 1)
    }
}
