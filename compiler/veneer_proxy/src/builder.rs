//! Host surface: one registry, one cache, proxies on demand.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use veneer_ir::{TypeId, TypeRegistry};

use crate::backend::DynamicBackend;
use crate::cache::{ProxyCache, ProxyKey, SharedProxyCache};
use crate::generator::ProxyGenerator;
use crate::template::{ProxyTemplate, TemplateBuilder};
use crate::{GenerationOptions, Proxy, ProxyError};

/// Generates proxies with the in-process backend and caches them by shape.
///
/// ```
/// use std::sync::Arc;
/// use veneer_ir::{Modifiers, TypeRegistry, Value, ValueType};
/// use veneer_proxy::{interceptor_fn, GenerationOptions, ProxyBuilder};
///
/// let mut registry = TypeRegistry::new();
/// let greeter = registry
///     .declare_interface("Greeter")
///     .method("greet", &[("name", ValueType::Str)], ValueType::Str, Modifiers::empty())
///     .finish()?;
///
/// let builder = ProxyBuilder::new(Arc::new(registry));
/// let proxy = builder.get_or_create(None, &[greeter], &GenerationOptions::default())?;
/// let hello = interceptor_fn(|inv| {
///     let name = inv.argument(0).and_then(Value::as_str).unwrap_or_default().to_owned();
///     inv.set_return_value(Value::str(format!("hello {name}")));
///     Ok(())
/// });
/// let object = proxy.instantiate(vec![], None, vec![hello])?;
/// assert_eq!(object.call("greet", vec![Value::str("world")])?, Value::str("hello world"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ProxyBuilder {
    registry: Arc<TypeRegistry>,
    cache: Arc<dyn ProxyCache>,
    name_prefix: String,
    counter: AtomicU32,
}

impl ProxyBuilder {
    /// Builder with a fresh [`SharedProxyCache`].
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        ProxyBuilder {
            registry,
            cache: Arc::new(SharedProxyCache::new()),
            name_prefix: "Proxy".to_owned(),
            counter: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ProxyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Prefix of generated type names; a per-builder counter follows it.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn ProxyCache> {
        &self.cache
    }

    /// Generate a proxy for `template`, bypassing the cache.
    pub fn generate_proxy(
        &self,
        template: ProxyTemplate,
        options: &GenerationOptions,
    ) -> Result<Proxy, ProxyError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let backend = DynamicBackend::new(format!("{}{n}", self.name_prefix));
        ProxyGenerator::new(&self.registry, options).generate(template, backend)
    }

    /// The cached proxy for this shape, generating it on first request.
    ///
    /// Concurrent requests for the same shape generate once and share the
    /// result. Failures are not cached.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(base = ?base, interfaces = interfaces.len())
    )]
    pub fn get_or_create(
        &self,
        base: Option<TypeId>,
        interfaces: &[TypeId],
        options: &GenerationOptions,
    ) -> Result<Arc<Proxy>, ProxyError> {
        let key = ProxyKey::new(
            &self.registry,
            base,
            interfaces.iter().copied(),
            options.clone(),
        );
        let proxy = self.cache.get_or_create(&key, &mut || {
            let template = TemplateBuilder::new(&self.registry)
                .base_opt(base)
                .interfaces(interfaces.iter().copied())
                .build()?;
            self.generate_proxy(template, options)
        })?;

        if proxy.key() != &key {
            return Err(ProxyError::CacheKeyCollision {
                requested: format!("{key:?}"),
                cached: format!("{:?}", proxy.key()),
            });
        }
        Ok(proxy)
    }
}

impl std::fmt::Debug for ProxyBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBuilder")
            .field("registry", &self.registry.len())
            .field("name_prefix", &self.name_prefix)
            .field("generated", &self.counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
