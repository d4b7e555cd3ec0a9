//! Generation options.

use crate::backend::CustomAttribute;
use crate::filter::{InterceptionFilter, SharedFilter};

/// Per-request knobs that change the generated type.
///
/// Options are part of the cache key, so two requests share a proxy only when
/// their options compare equal. The filter compares by identity; reuse one
/// `GenerationOptions` (or one `SharedFilter`) to share cache entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GenerationOptions {
    filter: SharedFilter,
    attributes: Box<[CustomAttribute]>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl InterceptionFilter + 'static) -> Self {
        self.filter = SharedFilter::new(filter);
        self
    }

    #[must_use]
    pub fn with_shared_filter(mut self, filter: SharedFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Add an attribute emitted after the proxy marker.
    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        let mut attributes = std::mem::take(&mut self.attributes).into_vec();
        attributes.push(attribute);
        self.attributes = attributes.into_boxed_slice();
        self
    }

    pub fn filter(&self) -> &SharedFilter {
        &self.filter
    }

    pub fn attributes(&self) -> &[CustomAttribute] {
        &self.attributes
    }
}
