//! Generated proxies and their instances.

mod object;

use std::fmt;
use std::sync::Arc;

use veneer_ir::{EventDesc, MethodDesc, PropertyDesc, TypeRegistry, Value};

use crate::backend::GeneratedType;
use crate::cache::ProxyKey;
use crate::invocation::{SharedInterceptor, SharedTarget};
use crate::template::ProxyTemplate;
use crate::ProxyError;

pub use object::ProxyObject;

/// Result of one successful generation. Immutable and freely shared.
pub struct Proxy {
    key: ProxyKey,
    registry: Arc<TypeRegistry>,
    template: ProxyTemplate,
    ty: Arc<dyn GeneratedType>,
    events: Box<[EventDesc]>,
    properties: Box<[PropertyDesc]>,
    methods: Box<[MethodDesc]>,
}

impl Proxy {
    pub(crate) fn new(
        key: ProxyKey,
        registry: Arc<TypeRegistry>,
        template: ProxyTemplate,
        ty: Arc<dyn GeneratedType>,
        accepted: Accepted,
    ) -> Self {
        Proxy {
            key,
            registry,
            template,
            ty,
            events: accepted.events.into_boxed_slice(),
            properties: accepted.properties.into_boxed_slice(),
            methods: accepted.methods.into_boxed_slice(),
        }
    }

    /// Cache key this proxy was generated for.
    pub fn key(&self) -> &ProxyKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.ty.name()
    }

    pub fn template(&self) -> &ProxyTemplate {
        &self.template
    }

    pub fn generated_type(&self) -> &Arc<dyn GeneratedType> {
        &self.ty
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Intercepted events, in template order.
    pub fn events(&self) -> &[EventDesc] {
        &self.events
    }

    /// Intercepted properties, in template order.
    pub fn properties(&self) -> &[PropertyDesc] {
        &self.properties
    }

    /// Intercepted methods, in template order.
    pub fn methods(&self) -> &[MethodDesc] {
        &self.methods
    }

    /// Create an instance, picking the first constructor that accepts
    /// `args`. Without a target, calls that reach the end of the interceptor
    /// chain fail with `CallError::NoTarget`.
    pub fn instantiate(
        &self,
        args: Vec<Value>,
        target: Option<SharedTarget>,
        interceptors: Vec<SharedInterceptor>,
    ) -> Result<ProxyObject, ProxyError> {
        let ctor = self
            .ty
            .constructors()
            .iter()
            .find(|ctor| ctor.accepts(&args))
            .ok_or_else(|| ProxyError::NoMatchingConstructor {
                type_name: self.ty.name().to_owned(),
                arity: args.len(),
            })?;
        tracing::trace!(proxy = self.name(), arity = args.len(), "instantiate");
        Ok(ProxyObject::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.ty),
            ctor.clone(),
            args,
            target,
            interceptors,
        ))
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("name", &self.ty.name())
            .field("key", &self.key)
            .field("events", &self.events.len())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

/// Members the filter accepted during one generation.
#[derive(Default)]
pub(crate) struct Accepted {
    pub events: Vec<EventDesc>,
    pub properties: Vec<PropertyDesc>,
    pub methods: Vec<MethodDesc>,
}
