//! Interception filters: which members of a shape get intercepted.
//!
//! A filter answers one yes/no question per member kind. Answers must depend
//! only on the descriptor, so that generating the same template twice yields
//! the same proxy and a cached proxy is interchangeable with a fresh one.
//! Rejection is never an error; a rejected member is simply emitted as a
//! pass-through to the target.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use veneer_ir::{EventDesc, MethodDesc, Modifiers, PropertyDesc};

/// Per-member interception policy.
pub trait InterceptionFilter: Send + Sync {
    fn accept_event(&self, event: &EventDesc) -> bool;

    fn accept_property(&self, property: &PropertyDesc) -> bool;

    fn accept_method(&self, method: &MethodDesc) -> bool;
}

/// Whether an accessor can be intercepted at all.
///
/// Interface members always can; class members must be overridable
/// (virtual or abstract, and neither sealed nor static).
pub fn is_interceptable(method: &MethodDesc) -> bool {
    method.modifiers.is_overridable()
}

fn is_opted_in(method: &MethodDesc) -> bool {
    is_interceptable(method) && !method.modifiers.contains(Modifiers::NON_INTERCEPTED)
}

/// Intercepts every overridable member not marked `NON_INTERCEPTED`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultFilter;

impl InterceptionFilter for DefaultFilter {
    fn accept_event(&self, event: &EventDesc) -> bool {
        event.accessors().all(is_opted_in)
    }

    fn accept_property(&self, property: &PropertyDesc) -> bool {
        property.accessors().all(is_opted_in)
    }

    fn accept_method(&self, method: &MethodDesc) -> bool {
        is_opted_in(method)
    }
}

/// Intercepts every member that can be intercepted, ignoring opt-out markers.
#[derive(Copy, Clone, Debug, Default)]
pub struct AcceptAll;

impl InterceptionFilter for AcceptAll {
    fn accept_event(&self, event: &EventDesc) -> bool {
        event.accessors().all(is_interceptable)
    }

    fn accept_property(&self, property: &PropertyDesc) -> bool {
        property.accessors().all(is_interceptable)
    }

    fn accept_method(&self, method: &MethodDesc) -> bool {
        is_interceptable(method)
    }
}

/// Intercepts nothing; every member becomes a pass-through.
#[derive(Copy, Clone, Debug, Default)]
pub struct RejectAll;

impl InterceptionFilter for RejectAll {
    fn accept_event(&self, _: &EventDesc) -> bool {
        false
    }

    fn accept_property(&self, _: &PropertyDesc) -> bool {
        false
    }

    fn accept_method(&self, _: &MethodDesc) -> bool {
        false
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Filter built from closures.
///
/// Closures only ever see interceptable members: anything the default
/// interceptability check rejects is rejected before the closure runs.
/// Kinds without a closure accept everything interceptable.
///
/// Closures must be pure; the generator may call them in any order.
#[derive(Default)]
pub struct PredicateFilter {
    events: Option<Predicate<EventDesc>>,
    properties: Option<Predicate<PropertyDesc>>,
    methods: Option<Predicate<MethodDesc>>,
}

impl PredicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(mut self, f: impl Fn(&EventDesc) -> bool + Send + Sync + 'static) -> Self {
        self.events = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn properties(
        mut self,
        f: impl Fn(&PropertyDesc) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.properties = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn methods(mut self, f: impl Fn(&MethodDesc) -> bool + Send + Sync + 'static) -> Self {
        self.methods = Some(Box::new(f));
        self
    }
}

impl InterceptionFilter for PredicateFilter {
    fn accept_event(&self, event: &EventDesc) -> bool {
        AcceptAll.accept_event(event) && self.events.as_ref().map_or(true, |f| f(event))
    }

    fn accept_property(&self, property: &PropertyDesc) -> bool {
        AcceptAll.accept_property(property)
            && self.properties.as_ref().map_or(true, |f| f(property))
    }

    fn accept_method(&self, method: &MethodDesc) -> bool {
        AcceptAll.accept_method(method) && self.methods.as_ref().map_or(true, |f| f(method))
    }
}

impl fmt::Debug for PredicateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateFilter")
            .field("events", &self.events.is_some())
            .field("properties", &self.properties.is_some())
            .field("methods", &self.methods.is_some())
            .finish()
    }
}

/// Shared handle to a filter, usable inside cache keys.
///
/// Equality and hashing use the identity of the shared filter: two handles
/// are equal when they were cloned from the same `SharedFilter`. Equivalent
/// but separately created filters produce separate cache entries.
#[derive(Clone)]
pub struct SharedFilter(Arc<dyn InterceptionFilter>);

impl SharedFilter {
    pub fn new(filter: impl InterceptionFilter + 'static) -> Self {
        SharedFilter(Arc::new(filter))
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl Default for SharedFilter {
    /// One process-wide `DefaultFilter`, so default options share cache entries.
    fn default() -> Self {
        static DEFAULT: std::sync::OnceLock<SharedFilter> = std::sync::OnceLock::new();
        DEFAULT.get_or_init(|| SharedFilter::new(DefaultFilter)).clone()
    }
}

impl std::ops::Deref for SharedFilter {
    type Target = dyn InterceptionFilter;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for SharedFilter {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for SharedFilter {}

impl Hash for SharedFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for SharedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedFilter({:#x})", self.addr())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
