use crate::context::FilterContext;

use super::{FilterChain, FilterError, FilterId};

/// The narrow view of a variable needed by the filter engine.
///
/// The variable model itself (attributes, dimensions, storage) lives outside of this crate.
/// A variable exclusively owns its filter chain, which is unset until filters are first declared.
pub trait FilterVariable {
    /// The variable name, used in diagnostics.
    fn name(&self) -> &str;

    /// The size in bytes of one element of the variable's declared type.
    fn type_size(&self) -> usize;

    /// The variable's filter chain, if set.
    fn filter_chain(&self) -> Option<&FilterChain>;

    /// The storage slot of the variable's filter chain.
    fn filter_chain_slot(&mut self) -> &mut Option<FilterChain>;

    /// The variable's filter chain, created empty if unset.
    fn filter_chain_mut(&mut self) -> &mut FilterChain {
        self.filter_chain_slot().get_or_insert_with(FilterChain::new)
    }
}

/// Append filter `id` with `parameters` to the filter chain of `variable`.
///
/// # Errors
/// See [`FilterChain::add`].
pub fn add_filter(
    context: &FilterContext,
    variable: &mut impl FilterVariable,
    id: FilterId,
    parameters: Vec<u32>,
) -> Result<(), FilterError> {
    variable.filter_chain_mut().add(context, id, parameters)
}

/// Remove filter `id` from the filter chain of `variable`.
///
/// # Errors
/// Returns [`FilterError::FilterNotFound`] if the variable has no filter `id`.
pub fn remove_filter(variable: &mut impl FilterVariable, id: FilterId) -> Result<(), FilterError> {
    variable
        .filter_chain_slot()
        .as_mut()
        .ok_or(FilterError::FilterNotFound(id))?
        .remove(id)
        .map(|_| ())
}

/// Resolve the plugins and codecs of the filter chain of `variable`.
///
/// Returns the identifiers of filters without a plugin.
///
/// # Errors
/// Returns [`FilterError::NotInitialized`] if `context` is not initialized.
pub fn setup_filters(
    context: &FilterContext,
    variable: &mut impl FilterVariable,
) -> Result<Vec<FilterId>, FilterError> {
    let name = variable.name().to_string();
    match variable.filter_chain_slot() {
        Some(chain) => {
            let unresolved = chain.setup(context)?;
            if !unresolved.is_empty() {
                tracing::debug!(
                    variable = name,
                    "{} of {} filters have no plugin",
                    unresolved.len(),
                    chain.len()
                );
            }
            Ok(unresolved)
        }
        None => Ok(Vec::new()),
    }
}

/// Release the filter chain of `variable`.
pub fn free_filters(variable: &mut impl FilterVariable) {
    *variable.filter_chain_slot() = None;
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::filter::{FILTER_ID_DEFLATE, FILTER_ID_SHUFFLE};

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct TestVariable {
        pub(crate) type_size: usize,
        pub(crate) filters: Option<FilterChain>,
    }

    impl FilterVariable for TestVariable {
        fn name(&self) -> &str {
            "test"
        }

        fn type_size(&self) -> usize {
            self.type_size
        }

        fn filter_chain(&self) -> Option<&FilterChain> {
            self.filters.as_ref()
        }

        fn filter_chain_slot(&mut self) -> &mut Option<FilterChain> {
            &mut self.filters
        }
    }

    #[test]
    fn filter_variable_chain_lifecycle() {
        let context = FilterContext::new();
        context.initialize().unwrap();
        let mut variable = TestVariable {
            type_size: 4,
            filters: None,
        };
        assert!(setup_filters(&context, &mut variable).unwrap().is_empty());
        assert!(matches!(
            remove_filter(&mut variable, FILTER_ID_SHUFFLE),
            Err(FilterError::FilterNotFound(FILTER_ID_SHUFFLE))
        ));

        add_filter(&context, &mut variable, FILTER_ID_SHUFFLE, vec![4]).unwrap();
        add_filter(&context, &mut variable, FILTER_ID_DEFLATE, vec![6]).unwrap();
        assert_eq!(
            variable.filter_chain().unwrap().ids(),
            vec![FILTER_ID_SHUFFLE, FILTER_ID_DEFLATE]
        );
        assert_eq!(
            setup_filters(&context, &mut variable).unwrap(),
            vec![FILTER_ID_SHUFFLE, FILTER_ID_DEFLATE]
        );

        remove_filter(&mut variable, FILTER_ID_SHUFFLE).unwrap();
        assert_eq!(variable.filter_chain().unwrap().ids(), vec![FILTER_ID_DEFLATE]);

        free_filters(&mut variable);
        assert!(variable.filter_chain().is_none());
        free_filters(&mut variable);
        assert!(variable.filter_chain().is_none());
    }
}
