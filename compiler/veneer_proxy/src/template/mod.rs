//! Proxy templates: immutable descriptions of the shape to generate.
//!
//! A template is built once from a base type and a list of interfaces and
//! never changes afterwards. Its only behaviour is [`ProxyTemplate::members`],
//! a lazy traversal yielding every element the generator has to handle as a
//! tagged [`Member`]. Traversal never filters; deciding what to intercept is
//! the generator's job.
//!
//! # Traversal Order
//!
//! 1. Interfaces: requested interfaces in declaration order, each followed by
//!    the interfaces it inherits (depth first, first occurrence wins), then
//!    the interfaces implemented along the base class hierarchy
//! 2. Constructors of the base type (or one synthetic parameterless one)
//! 3. Events, then properties, then methods. Within each kind, members of
//!    the interfaces come first (in interface order), then members of the base
//!    class hierarchy from the base type up to the root, then members of the
//!    hierarchy's interfaces that no class in it implements. A member
//!    redefined by a more derived class hides the inherited one.
//!
//! The order depends only on declaration order, so it is the same on every
//! call and on every run.

use rustc_hash::FxHashSet;
use veneer_ir::{
    AccessorKind, ConstructorDesc, EventDesc, MethodDesc, PropertyDesc, TypeDecl, TypeId,
    TypeRegistry,
};

use crate::ProxyError;

/// One element of a template traversal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Member<'t> {
    Interface(TypeId),
    Constructor(&'t ConstructorDesc),
    Event(&'t EventDesc),
    Property(&'t PropertyDesc),
    Method(&'t MethodDesc),
}

/// Raw member lists for [`ProxyTemplate::from_parts`].
///
/// Used by callers that resolve members from their own reflection source
/// instead of going through [`TemplateBuilder`].
#[derive(Clone, Debug, Default)]
pub struct TemplateParts {
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub constructors: Vec<ConstructorDesc>,
    pub events: Vec<EventDesc>,
    pub properties: Vec<PropertyDesc>,
    pub methods: Vec<MethodDesc>,
}

/// Immutable snapshot of a requested proxy shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyTemplate {
    base: Option<TypeId>,
    interfaces: Box<[TypeId]>,
    constructors: Box<[ConstructorDesc]>,
    events: Box<[EventDesc]>,
    properties: Box<[PropertyDesc]>,
    methods: Box<[MethodDesc]>,
}

impl ProxyTemplate {
    /// Validate raw member lists and freeze them into a template.
    ///
    /// Interfaces are de-duplicated keeping first occurrences. Every member
    /// must be declared by one of the interfaces or by the base type or one
    /// of its ancestors, and every accessor must belong to its member.
    pub fn from_parts(registry: &TypeRegistry, parts: TemplateParts) -> Result<Self, ProxyError> {
        let mut shape = FxHashSet::default();

        if let Some(base) = parts.base {
            for decl in base_chain(registry, base)? {
                shape.insert(decl.id);
            }
        }

        let mut interfaces = Vec::with_capacity(parts.interfaces.len());
        for iface in parts.interfaces {
            let decl = resolve(registry, iface)?;
            if !decl.is_interface() {
                return Err(ProxyError::invalid_template(format!(
                    "`{}` is a class; request it as the base type",
                    registry.lookup(decl.name)
                )));
            }
            if shape.insert(iface) {
                interfaces.push(iface);
            }
        }

        let describe = |declaring: TypeId| registry.type_name(declaring);
        let in_shape = |declaring: TypeId, what: &str| {
            if shape.contains(&declaring) {
                Ok(())
            } else {
                Err(ProxyError::invalid_template(format!(
                    "{what} is declared by `{}`, which is not part of the requested shape",
                    describe(declaring)
                )))
            }
        };

        for ctor in &parts.constructors {
            if let Some(declaring) = ctor.declaring {
                if Some(declaring) != parts.base {
                    return Err(ProxyError::invalid_template(format!(
                        "constructor of `{}` does not belong to the base type",
                        describe(declaring)
                    )));
                }
            }
        }
        for event in &parts.events {
            let what = format!("event `{}`", registry.lookup(event.name));
            in_shape(event.declaring, &what)?;
            check_accessor(&event.add, event.declaring, AccessorKind::Adder, &what)?;
            check_accessor(&event.remove, event.declaring, AccessorKind::Remover, &what)?;
        }
        for property in &parts.properties {
            let what = format!("property `{}`", registry.lookup(property.name));
            in_shape(property.declaring, &what)?;
            if property.getter.is_none() && property.setter.is_none() {
                return Err(ProxyError::invalid_template(format!("{what} has no accessors")));
            }
            if let Some(getter) = &property.getter {
                check_accessor(getter, property.declaring, AccessorKind::Getter, &what)?;
            }
            if let Some(setter) = &property.setter {
                check_accessor(setter, property.declaring, AccessorKind::Setter, &what)?;
            }
        }
        for method in &parts.methods {
            let what = format!("method `{}`", registry.lookup(method.name));
            in_shape(method.declaring, &what)?;
            check_accessor(method, method.declaring, AccessorKind::Method, &what)?;
        }

        Ok(ProxyTemplate {
            base: parts.base,
            interfaces: interfaces.into_boxed_slice(),
            constructors: parts.constructors.into_boxed_slice(),
            events: parts.events.into_boxed_slice(),
            properties: parts.properties.into_boxed_slice(),
            methods: parts.methods.into_boxed_slice(),
        })
    }

    /// Lazily traverse the template in its fixed order.
    pub fn members(&self) -> Members<'_> {
        Members {
            template: self,
            stage: Stage::Interfaces,
            pos: 0,
        }
    }

    pub fn base(&self) -> Option<TypeId> {
        self.base
    }

    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    pub fn constructors(&self) -> &[ConstructorDesc] {
        &self.constructors
    }

    pub fn events(&self) -> &[EventDesc] {
        &self.events
    }

    pub fn properties(&self) -> &[PropertyDesc] {
        &self.properties
    }

    pub fn methods(&self) -> &[MethodDesc] {
        &self.methods
    }

    /// Total number of elements `members()` yields.
    pub fn len(&self) -> usize {
        self.interfaces.len()
            + self.constructors.len()
            + self.events.len()
            + self.properties.len()
            + self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve(registry: &TypeRegistry, id: TypeId) -> Result<&TypeDecl, ProxyError> {
    registry
        .get(id)
        .ok_or_else(|| ProxyError::invalid_template(format!("unknown type {id:?}")))
}

/// The base type followed by its ancestors, most derived first.
fn base_chain(registry: &TypeRegistry, base: TypeId) -> Result<Vec<&TypeDecl>, ProxyError> {
    let decl = resolve(registry, base)?;
    let name = registry.lookup(decl.name);
    if decl.is_interface() {
        return Err(ProxyError::invalid_template(format!(
            "`{name}` is an interface and cannot be used as a base type"
        )));
    }
    if decl.is_sealed() {
        return Err(ProxyError::invalid_template(format!(
            "`{name}` is sealed and cannot be extended"
        )));
    }

    let mut chain = vec![decl];
    let mut seen = FxHashSet::from_iter([base]);
    let mut current = decl.base;
    while let Some(id) = current {
        if !seen.insert(id) {
            return Err(ProxyError::invalid_template(format!(
                "inheritance cycle through `{}`",
                registry.type_name(id)
            )));
        }
        let decl = resolve(registry, id)?;
        chain.push(decl);
        current = decl.base;
    }
    Ok(chain)
}

fn check_accessor(
    accessor: &MethodDesc,
    declaring: TypeId,
    kind: AccessorKind,
    what: &str,
) -> Result<(), ProxyError> {
    if accessor.declaring != declaring || accessor.kind != kind {
        return Err(ProxyError::invalid_template(format!(
            "{what} has a {} accessor that does not belong to it",
            accessor.kind.as_str()
        )));
    }
    Ok(())
}

/// Resolves a base type and interfaces against a registry into a template.
pub struct TemplateBuilder<'r> {
    registry: &'r TypeRegistry,
    base: Option<TypeId>,
    interfaces: Vec<TypeId>,
}

impl<'r> TemplateBuilder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            base: None,
            interfaces: Vec::new(),
        }
    }

    #[must_use]
    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn base_opt(mut self, base: Option<TypeId>) -> Self {
        self.base = base;
        self
    }

    #[must_use]
    pub fn interface(mut self, iface: TypeId) -> Self {
        self.interfaces.push(iface);
        self
    }

    #[must_use]
    pub fn interfaces(mut self, ifaces: impl IntoIterator<Item = TypeId>) -> Self {
        self.interfaces.extend(ifaces);
        self
    }

    /// Resolve inherited interfaces and members, then validate.
    pub fn build(self) -> Result<ProxyTemplate, ProxyError> {
        let registry = self.registry;
        let mut parts = TemplateParts {
            base: self.base,
            ..TemplateParts::default()
        };

        let mut seen = FxHashSet::default();
        for iface in self.interfaces {
            expand_interface(registry, iface, &mut seen, &mut parts.interfaces)?;
        }
        for &iface in &parts.interfaces {
            let decl = resolve(registry, iface)?;
            parts.events.extend(decl.events.iter().cloned());
            parts.properties.extend(decl.properties.iter().cloned());
            parts.methods.extend(decl.methods.iter().cloned());
        }

        match self.base {
            Some(base) => {
                let chain = base_chain(registry, base)?;
                let mut events: Vec<EventDesc> = Vec::new();
                let mut properties: Vec<PropertyDesc> = Vec::new();
                let mut methods: Vec<MethodDesc> = Vec::new();
                for decl in &chain {
                    for event in decl.events.iter() {
                        if !events.iter().any(|e| e.name == event.name) {
                            events.push(event.clone());
                        }
                    }
                    for property in decl.properties.iter() {
                        if !properties.iter().any(|p| p.name == property.name) {
                            properties.push(property.clone());
                        }
                    }
                    for method in decl.methods.iter() {
                        if !methods.iter().any(|m| m.same_slot(method)) {
                            methods.push(method.clone());
                        }
                    }
                }

                // Interfaces the hierarchy implements. Members it leaves
                // unimplemented are still part of the shape.
                let requested = parts.interfaces.len();
                for decl in &chain {
                    for &iface in decl.interfaces.iter() {
                        expand_interface(registry, iface, &mut seen, &mut parts.interfaces)?;
                    }
                }
                for &iface in &parts.interfaces[requested..] {
                    let decl = resolve(registry, iface)?;
                    for event in decl.events.iter() {
                        if !events.iter().any(|e| e.name == event.name) {
                            events.push(event.clone());
                        }
                    }
                    for property in decl.properties.iter() {
                        if !properties.iter().any(|p| p.name == property.name) {
                            properties.push(property.clone());
                        }
                    }
                    for method in decl.methods.iter() {
                        if !methods.iter().any(|m| m.same_slot(method)) {
                            methods.push(method.clone());
                        }
                    }
                }

                parts.events.extend(events);
                parts.properties.extend(properties);
                parts.methods.extend(methods);

                parts.constructors = chain[0].constructors.to_vec();
                if parts.constructors.is_empty() {
                    parts.constructors.push(ConstructorDesc {
                        declaring: Some(base),
                        params: Box::new([]),
                    });
                }
            }
            None => parts.constructors.push(ConstructorDesc::default()),
        }

        ProxyTemplate::from_parts(registry, parts)
    }
}

/// Push `iface` and, depth first, the interfaces it inherits.
fn expand_interface(
    registry: &TypeRegistry,
    iface: TypeId,
    seen: &mut FxHashSet<TypeId>,
    out: &mut Vec<TypeId>,
) -> Result<(), ProxyError> {
    if !seen.insert(iface) {
        return Ok(());
    }
    let decl = resolve(registry, iface)?;
    out.push(iface);
    for &inherited in decl.interfaces.iter() {
        expand_interface(registry, inherited, seen, out)?;
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage {
    Interfaces,
    Constructors,
    Events,
    Properties,
    Methods,
    Done,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::Interfaces => Stage::Constructors,
            Stage::Constructors => Stage::Events,
            Stage::Events => Stage::Properties,
            Stage::Properties => Stage::Methods,
            Stage::Methods | Stage::Done => Stage::Done,
        }
    }
}

/// Lazy traversal over a [`ProxyTemplate`].
#[derive(Clone, Debug)]
pub struct Members<'t> {
    template: &'t ProxyTemplate,
    stage: Stage,
    pos: usize,
}

impl<'t> Iterator for Members<'t> {
    type Item = Member<'t>;

    fn next(&mut self) -> Option<Member<'t>> {
        let t = self.template;
        loop {
            let item = match self.stage {
                Stage::Interfaces => t.interfaces.get(self.pos).map(|&id| Member::Interface(id)),
                Stage::Constructors => t.constructors.get(self.pos).map(Member::Constructor),
                Stage::Events => t.events.get(self.pos).map(Member::Event),
                Stage::Properties => t.properties.get(self.pos).map(Member::Property),
                Stage::Methods => t.methods.get(self.pos).map(Member::Method),
                Stage::Done => return None,
            };
            if item.is_some() {
                self.pos += 1;
                return item;
            }
            self.stage = self.stage.next();
            self.pos = 0;
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
