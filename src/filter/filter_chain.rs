//! An ordered sequence of filters and its execution.

use itertools::Itertools;

use crate::context::FilterContext;

use super::{Filter, FilterDirection, FilterError, FilterId};

/// An ordered sequence of [`Filter`]s owned by a single variable.
///
/// Chain order is encode order.
/// A chain never contains two filters with the same identifier.
///
/// A resolved chain is immutable during [`apply`](FilterChain::apply), so it can be applied concurrently from multiple threads.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    /// Create a new empty filter chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Return the filters in encode order.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Return the filter with identifier `id`.
    #[must_use]
    pub fn filter(&self, id: FilterId) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.id() == id)
    }

    /// Returns true if the chain contains a filter with identifier `id`.
    #[must_use]
    pub fn contains(&self, id: FilterId) -> bool {
        self.filter(id).is_some()
    }

    /// Return the filter identifiers in encode order.
    #[must_use]
    pub fn ids(&self) -> Vec<FilterId> {
        self.filters.iter().map(Filter::id).collect()
    }

    /// Return the number of filters in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Append a filter with identifier `id` and `parameters`.
    ///
    /// If `context` is initialized and has a codec registered for `id`, the parameter count must match the codec schema.
    /// The chain is unchanged on error.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::DuplicateFilter`] if the chain already contains `id`, or
    ///  - [`FilterError::InvalidParameterCount`] if `parameters` do not match the codec schema.
    pub fn add(
        &mut self,
        context: &FilterContext,
        id: FilterId,
        parameters: Vec<u32>,
    ) -> Result<(), FilterError> {
        if let Some(codec) = context.try_resolve_codec_by_id(id) {
            if !codec.accepts_parameter_count(parameters.len()) {
                return Err(FilterError::InvalidParameterCount {
                    id,
                    expected: codec.parameters().len(),
                    actual: parameters.len(),
                });
            }
        }
        self.add_raw(id, parameters)
    }

    /// Append a filter with identifier `id` and a raw parameter vector, without checking it against a codec schema.
    ///
    /// # Errors
    /// Returns [`FilterError::DuplicateFilter`] if the chain already contains `id`.
    pub(crate) fn add_raw(&mut self, id: FilterId, parameters: Vec<u32>) -> Result<(), FilterError> {
        if self.contains(id) {
            return Err(FilterError::DuplicateFilter(id));
        }
        self.filters.push(Filter::new(id, parameters));
        Ok(())
    }

    /// Remove the filter with identifier `id`.
    ///
    /// # Errors
    /// Returns [`FilterError::FilterNotFound`] if the chain does not contain `id`.
    pub fn remove(&mut self, id: FilterId) -> Result<Filter, FilterError> {
        let index = self
            .filters
            .iter()
            .position(|filter| filter.id() == id)
            .ok_or(FilterError::FilterNotFound(id))?;
        Ok(self.filters.remove(index))
    }

    /// Remove all filters from the chain.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Resolve the plugin and codec of every filter in the chain.
    ///
    /// A filter without a registered plugin stays unresolved and only fails when applied.
    /// Returns the identifiers of filters without a plugin.
    ///
    /// # Errors
    /// Returns [`FilterError::NotInitialized`] if `context` is not initialized.
    pub fn setup(&mut self, context: &FilterContext) -> Result<Vec<FilterId>, FilterError> {
        let mut unresolved = Vec::new();
        for filter in &mut self.filters {
            let plugin = match context.lookup_plugin(filter.id()) {
                Ok(plugin) => Some(plugin),
                Err(FilterError::PluginNotFound(_)) => None,
                Err(err) => return Err(err),
            };
            let codec = context.try_resolve_codec_by_id(filter.id());
            if plugin.is_none() {
                unresolved.push(filter.id());
            }
            filter.resolve(plugin.as_ref(), codec.as_ref());
        }
        if !unresolved.is_empty() {
            tracing::debug!(
                "filters without a plugin: {}",
                unresolved.iter().join(", ")
            );
        }
        Ok(unresolved)
    }

    /// Apply the chain to `bytes` in `direction`.
    ///
    /// Encoding applies filters in chain order, decoding in reverse chain order.
    /// Each stage consumes the buffer produced by the previous stage.
    /// An empty chain returns `bytes` unchanged.
    ///
    /// # Errors
    /// Returns
    ///  - [`FilterError::UnresolvedFilter`] if a stage has no plugin supporting `direction`, or
    ///  - [`FilterError::FilterExecutionFailure`] if a plugin fails.
    ///
    /// No partial output is returned on error.
    pub fn apply(&self, bytes: Vec<u8>, direction: FilterDirection) -> Result<Vec<u8>, FilterError> {
        match direction {
            FilterDirection::Encode => self
                .filters
                .iter()
                .enumerate()
                .try_fold(bytes, |bytes, (stage, filter)| {
                    filter.apply(stage, bytes, direction)
                }),
            FilterDirection::Decode => self
                .filters
                .iter()
                .enumerate()
                .rev()
                .try_fold(bytes, |bytes, (stage, filter)| {
                    filter.apply(stage, bytes, direction)
                }),
        }
    }

    /// Encode `decoded_value` through the chain.
    ///
    /// # Errors
    /// See [`apply`](FilterChain::apply).
    pub fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, FilterError> {
        self.apply(decoded_value, FilterDirection::Encode)
    }

    /// Decode `encoded_value` through the chain.
    ///
    /// # Errors
    /// See [`apply`](FilterChain::apply).
    pub fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, FilterError> {
        self.apply(encoded_value, FilterDirection::Decode)
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::{FILTER_ID_FLETCHER32, FILTER_ID_SHUFFLE, FILTER_ID_ZSTD};

    use super::*;

    fn context() -> FilterContext {
        let context = FilterContext::new();
        context.initialize().unwrap();
        context.register_builtin_plugins().unwrap();
        context
    }

    #[test]
    fn filter_chain_empty() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.encode(vec![]).unwrap(), Vec::<u8>::new());
        assert_eq!(chain.decode(vec![1, 2, 3]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn filter_chain_add_remove() {
        let context = context();
        let mut chain = FilterChain::new();
        chain.add(&context, FILTER_ID_SHUFFLE, vec![4]).unwrap();
        chain.add(&context, FILTER_ID_FLETCHER32, vec![]).unwrap();
        assert_eq!(chain.ids(), vec![FILTER_ID_SHUFFLE, FILTER_ID_FLETCHER32]);

        assert!(matches!(
            chain.add(&context, FILTER_ID_SHUFFLE, vec![8]),
            Err(FilterError::DuplicateFilter(FILTER_ID_SHUFFLE))
        ));
        assert!(matches!(
            chain.add(&context, FILTER_ID_ZSTD, vec![]),
            Err(FilterError::InvalidParameterCount {
                id: FILTER_ID_ZSTD,
                expected: 1,
                actual: 0
            })
        ));
        assert_eq!(chain.ids(), vec![FILTER_ID_SHUFFLE, FILTER_ID_FLETCHER32]);
        assert_eq!(chain.filter(FILTER_ID_SHUFFLE).unwrap().parameters(), &[4]);

        let removed = chain.remove(FILTER_ID_SHUFFLE).unwrap();
        assert_eq!(removed.id(), FILTER_ID_SHUFFLE);
        assert!(matches!(
            chain.remove(FILTER_ID_SHUFFLE),
            Err(FilterError::FilterNotFound(FILTER_ID_SHUFFLE))
        ));
        assert_eq!(chain.ids(), vec![FILTER_ID_FLETCHER32]);
        chain.clear();
        assert!(chain.is_empty());
    }

    #[test]
    fn filter_chain_add_unknown_codec() {
        let context = context();
        let mut chain = FilterChain::new();
        chain.add(&context, 60_000, vec![1, 2, 3]).unwrap();
        assert_eq!(chain.filter(60_000).unwrap().parameters(), &[1, 2, 3]);
    }

    #[test]
    fn filter_chain_setup_not_initialized() {
        let context = FilterContext::new();
        let mut chain = FilterChain::new();
        chain.add(&context, FILTER_ID_SHUFFLE, vec![4]).unwrap();
        assert!(matches!(
            chain.setup(&context),
            Err(FilterError::NotInitialized)
        ));
    }

    #[test]
    fn filter_chain_round_trip() {
        let context = context();
        let mut chain = FilterChain::new();
        chain.add(&context, FILTER_ID_SHUFFLE, vec![2]).unwrap();
        chain.add(&context, FILTER_ID_FLETCHER32, vec![]).unwrap();
        assert!(chain.setup(&context).unwrap().is_empty());

        let elements: Vec<u16> = (0..64).collect();
        let bytes = bytemuck::cast_slice::<u16, u8>(&elements).to_vec();
        let encoded = chain.encode(bytes.clone()).unwrap();
        assert_eq!(encoded.len(), bytes.len() + 4);
        assert_ne!(&encoded[..bytes.len()], bytes.as_slice());
        let decoded = chain.decode(encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn filter_chain_execution_failure() {
        let context = context();
        let mut chain = FilterChain::new();
        chain.add(&context, FILTER_ID_SHUFFLE, vec![2]).unwrap();
        chain.add(&context, FILTER_ID_FLETCHER32, vec![]).unwrap();
        chain.setup(&context).unwrap();

        let mut encoded = chain.encode(vec![1, 2, 3, 4, 5, 6]).unwrap();
        encoded[0] ^= 0xFF;
        match chain.decode(encoded) {
            Err(FilterError::FilterExecutionFailure(err)) => {
                assert_eq!(err.id(), FILTER_ID_FLETCHER32);
                assert_eq!(err.stage(), 1);
                assert_eq!(err.direction(), FilterDirection::Decode);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
