//! The codec catalog.
//!
//! A [`CodecEntry`] is the metadata facing description of a filter: a codec name, optional aliases, and a named parameter schema with defaults.
//! The [`CodecCatalog`] maps filter identifiers to codec entries and codec names back to identifiers.
//!
//! The catalog is populated from the [built-in codecs](builtin_codecs) and then from the codec defaults of discovered plugins.
//! Defaults only fill gaps: the first registration for an identifier or name wins.

mod builtin_codecs;
mod codec_entry;

pub use builtin_codecs::builtin_codecs;
pub use codec_entry::{CodecEntry, CodecParameter, ParameterDefault, ParameterKind};

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::filter::{FilterError, FilterId};

/// A codec registration conflicting with a registered codec.
#[derive(Debug, Error)]
#[error("codec {name} for filter {id} conflicts with registered codec {existing_name} for filter {existing_id}")]
pub struct CodecConflictError {
    id: FilterId,
    name: String,
    existing_id: FilterId,
    existing_name: String,
}

impl CodecConflictError {
    fn new(entry: &CodecEntry, existing: &CodecEntry) -> Self {
        Self {
            id: entry.id(),
            name: entry.name().to_string(),
            existing_id: existing.id(),
            existing_name: existing.name().to_string(),
        }
    }

    /// Return the identifier of the rejected codec.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// Return the identifier of the registered codec.
    #[must_use]
    pub const fn existing_id(&self) -> FilterId {
        self.existing_id
    }
}

/// A mapping between filter identifiers, codec names, and codec entries.
#[derive(Debug, Default)]
pub struct CodecCatalog {
    entries: Vec<Arc<CodecEntry>>,
    by_id: HashMap<FilterId, usize>,
    by_name: HashMap<String, usize>,
}

impl CodecCatalog {
    /// Create a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new catalog populated with the [built-in codecs](builtin_codecs).
    ///
    /// # Errors
    /// Returns a [`CodecConflictError`] if the built-in codecs conflict.
    pub fn with_builtin_codecs() -> Result<Self, CodecConflictError> {
        let mut catalog = Self::new();
        for entry in builtin_codecs() {
            catalog.register(entry)?;
        }
        Ok(catalog)
    }

    /// Register `entry`.
    ///
    /// Registering an entry identical to a registered entry does nothing.
    ///
    /// # Errors
    /// Returns a [`CodecConflictError`] if the identifier is registered with a different entry, or a name or alias is registered to another identifier.
    pub fn register(&mut self, entry: CodecEntry) -> Result<Arc<CodecEntry>, CodecConflictError> {
        if let Some(existing) = self.get_by_id(entry.id()) {
            return if **existing == entry {
                Ok(existing.clone())
            } else {
                Err(CodecConflictError::new(&entry, existing))
            };
        }
        if let Some(existing) = self.name_conflict(&entry) {
            return Err(CodecConflictError::new(&entry, existing));
        }
        Ok(self.insert(entry))
    }

    /// Register `entry` if neither its identifier nor its names are registered.
    ///
    /// Returns true if `entry` was registered.
    pub fn register_default(&mut self, entry: CodecEntry) -> bool {
        if self.by_id.contains_key(&entry.id()) || self.name_conflict(&entry).is_some() {
            tracing::debug!(
                filter = entry.id(),
                "ignoring default codec {}: already registered",
                entry.name()
            );
            false
        } else {
            self.insert(entry);
            true
        }
    }

    /// Resolve the codec entry for filter `id`.
    ///
    /// # Errors
    /// Returns [`FilterError::CodecNotFound`] if no codec is registered for `id`.
    pub fn resolve_by_id(&self, id: FilterId) -> Result<Arc<CodecEntry>, FilterError> {
        self.get_by_id(id)
            .cloned()
            .ok_or_else(|| FilterError::CodecNotFound(format!("filter {id}")))
    }

    /// Resolve the codec entry with name or alias `name`.
    ///
    /// # Errors
    /// Returns [`FilterError::CodecNotFound`] if no codec is registered with `name`.
    pub fn resolve_by_name(&self, name: &str) -> Result<Arc<CodecEntry>, FilterError> {
        self.by_name
            .get(name)
            .map(|&index| self.entries[index].clone())
            .ok_or_else(|| FilterError::CodecNotFound(name.to_string()))
    }

    /// Return the registered entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[Arc<CodecEntry>] {
        &self.entries
    }

    fn get_by_id(&self, id: FilterId) -> Option<&Arc<CodecEntry>> {
        self.by_id.get(&id).map(|&index| &self.entries[index])
    }

    fn name_conflict(&self, entry: &CodecEntry) -> Option<&Arc<CodecEntry>> {
        entry
            .names()
            .find_map(|name| self.by_name.get(name))
            .map(|&index| &self.entries[index])
    }

    fn insert(&mut self, entry: CodecEntry) -> Arc<CodecEntry> {
        let index = self.entries.len();
        self.by_id.insert(entry.id(), index);
        for name in entry.names() {
            self.by_name.insert(name.to_string(), index);
        }
        let entry = Arc::new(entry);
        self.entries.push(entry.clone());
        entry
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::{FILTER_ID_BZIP2, FILTER_ID_GZIP};

    use super::*;

    fn entry(id: FilterId, name: &str) -> CodecEntry {
        CodecEntry::new(id, name).with_parameter(CodecParameter::new(
            "level",
            ParameterKind::Unsigned,
            ParameterDefault::Value(1),
        ))
    }

    #[test]
    fn codec_catalog_register() {
        let mut catalog = CodecCatalog::new();
        catalog.register(entry(40_000, "a")).unwrap();
        catalog.register(entry(40_000, "a")).unwrap();
        assert_eq!(catalog.entries().len(), 1);

        let conflict = catalog.register(entry(40_000, "b")).unwrap_err();
        assert_eq!(conflict.id(), 40_000);
        let conflict = catalog.register(entry(40_001, "a")).unwrap_err();
        assert_eq!(conflict.existing_id(), 40_000);
        assert!(catalog
            .register(entry(40_000, "a").with_alias("a2"))
            .is_err());

        assert_eq!(catalog.resolve_by_name("a").unwrap().id(), 40_000);
        assert_eq!(catalog.resolve_by_id(40_000).unwrap().name(), "a");
        assert!(matches!(
            catalog.resolve_by_id(40_001),
            Err(FilterError::CodecNotFound(_))
        ));
        assert!(matches!(
            catalog.resolve_by_name("b"),
            Err(FilterError::CodecNotFound(name)) if name == "b"
        ));
    }

    #[test]
    fn codec_catalog_register_default() {
        let mut catalog = CodecCatalog::new();
        assert!(catalog.register_default(entry(40_000, "a")));
        assert!(!catalog.register_default(entry(40_000, "b")));
        assert!(!catalog.register_default(entry(40_001, "a")));
        assert_eq!(catalog.entries().len(), 1);
        assert_eq!(catalog.resolve_by_id(40_000).unwrap().name(), "a");
    }

    #[test]
    fn codec_catalog_builtin() {
        let catalog = CodecCatalog::with_builtin_codecs().unwrap();
        assert_eq!(catalog.resolve_by_name("gzip").unwrap().id(), FILTER_ID_GZIP);
        assert_eq!(catalog.resolve_by_name("bzip2").unwrap().id(), FILTER_ID_BZIP2);
        assert_eq!(catalog.resolve_by_id(FILTER_ID_BZIP2).unwrap().name(), "bz2");
    }
}
