//! Structural cache keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use veneer_ir::{TypeId, TypeRegistry};

use crate::template::ProxyTemplate;
use crate::GenerationOptions;

/// Identity of a requested proxy shape.
///
/// Interfaces are stored as a sorted set including everything they inherit,
/// so request order, repetition and spelled-out super-interfaces do not
/// matter: `[B, A]`, `[A, B, A]` and `[A, B]` produce the same key.
/// Interfaces implemented by the base class hierarchy belong to the set too.
///
/// A `TypeId` only means something inside its registry, so the key also
/// carries the registry itself, compared by identity. Keys from different
/// registries never match, even when their ids coincide.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    registry: RegistryRef,
    base: Option<TypeId>,
    interfaces: Box<[TypeId]>,
    options: GenerationOptions,
}

impl ProxyKey {
    /// Key for a request. Inherited interfaces and those implemented along the
    /// base class hierarchy are expanded through `registry`.
    ///
    /// Ids the registry does not know are kept as-is; building the template
    /// for them fails later, and failures are never cached.
    pub fn new(
        registry: &Arc<TypeRegistry>,
        base: Option<TypeId>,
        interfaces: impl IntoIterator<Item = TypeId>,
        options: GenerationOptions,
    ) -> Self {
        let mut stack: Vec<TypeId> = interfaces.into_iter().collect();

        let mut ancestors = FxHashSet::default();
        let mut current = base;
        while let Some(id) = current {
            if !ancestors.insert(id) {
                break;
            }
            let Some(decl) = registry.get(id) else { break };
            stack.extend(decl.interfaces.iter().copied());
            current = decl.base;
        }

        let mut seen = FxHashSet::default();
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                if let Some(decl) = registry.get(id) {
                    stack.extend(decl.interfaces.iter().copied());
                }
            }
        }
        Self::canonical(registry, base, seen, options)
    }

    /// Key a template built against `registry` answers to.
    pub fn for_template(
        registry: &Arc<TypeRegistry>,
        template: &ProxyTemplate,
        options: GenerationOptions,
    ) -> Self {
        Self::canonical(
            registry,
            template.base(),
            template.interfaces().iter().copied(),
            options,
        )
    }

    fn canonical(
        registry: &Arc<TypeRegistry>,
        base: Option<TypeId>,
        interfaces: impl IntoIterator<Item = TypeId>,
        options: GenerationOptions,
    ) -> Self {
        let mut interfaces: Vec<TypeId> = interfaces.into_iter().collect();
        interfaces.sort_unstable();
        interfaces.dedup();
        ProxyKey {
            registry: RegistryRef(Arc::clone(registry)),
            base,
            interfaces: interfaces.into_boxed_slice(),
            options,
        }
    }

    /// Whether this key was built against `registry`.
    pub fn belongs_to(&self, registry: &Arc<TypeRegistry>) -> bool {
        Arc::ptr_eq(&self.registry.0, registry)
    }

    pub fn base(&self) -> Option<TypeId> {
        self.base
    }

    /// Sorted, de-duplicated interface set.
    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }
}

impl fmt::Debug for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyKey")
            .field("registry", &self.registry)
            .field("base", &self.base)
            .field("interfaces", &self.interfaces)
            .field("filter", self.options.filter())
            .field("attributes", &self.options.attributes().len())
            .finish()
    }
}

/// Registry handle with identity equality.
///
/// Holding the `Arc` keeps the registry alive as long as the key, so its
/// address cannot be reused by another registry while the key exists.
#[derive(Clone)]
struct RegistryRef(Arc<TypeRegistry>);

impl RegistryRef {
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for RegistryRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RegistryRef {}

impl Hash for RegistryRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for RegistryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRegistry({:#x})", self.addr())
    }
}
