//! Registry of declared types.
//!
//! The `TypeRegistry` is the reflection source proxy generation reads from:
//! it owns the name interner and every `TypeDecl`, and hands out `TypeId`
//! handles. Declarations are added through [`TypeDeclBuilder`]; once the
//! registry is shared (usually behind an `Arc`) it is read-only apart from
//! name interning.
//!
//! # Design
//!
//! - Dense `Vec` storage indexed by `TypeId` for O(1) lookup
//! - `FxHashMap` name index for lookup by name
//! - Accessor descriptors are derived here, so every descriptor handed to
//!   the proxy engine has a declaring type

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    AccessorKind, ConstructorDesc, EventDesc, MethodDesc, Modifiers, Name, Param, PropertyDesc,
    StringInterner, TypeDecl, TypeId, TypeKind, ValueType,
};

/// Errors raised while declaring types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("type `{0}` is already declared")]
    DuplicateType(String),
    #[error("`{type_name}` declares {kind} `{member}` more than once")]
    DuplicateMember {
        type_name: String,
        kind: &'static str,
        member: String,
    },
    #[error("`{type_name}` refers to unknown type {id:?}")]
    UnknownType { type_name: String, id: TypeId },
    #[error("`{type_name}` expected `{found}` to be {expected}")]
    KindMismatch {
        type_name: String,
        found: String,
        expected: &'static str,
    },
}

/// Which accessors a declared property has.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropertyAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Registry of declared interfaces and classes.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    interner: StringInterner,
    types: Vec<TypeDecl>,
    by_name: FxHashMap<Name, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring an interface.
    pub fn declare_interface(&mut self, name: &str) -> TypeDeclBuilder<'_> {
        TypeDeclBuilder::new(self, name, TypeKind::Interface)
    }

    /// Start declaring a (non-sealed, concrete) class.
    pub fn declare_class(&mut self, name: &str) -> TypeDeclBuilder<'_> {
        TypeDeclBuilder::new(
            self,
            name,
            TypeKind::Class {
                sealed: false,
                is_abstract: false,
            },
        )
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<TypeId> {
        let name = self.interner.get(name)?;
        self.by_name.get(&name).copied()
    }

    /// The `Name` of `s` if anything was ever declared with it.
    #[inline]
    pub fn name(&self, s: &str) -> Option<Name> {
        self.interner.get(s)
    }

    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    #[inline]
    pub fn lookup(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Display name of a type, or `<unknown>` for foreign handles.
    pub fn type_name(&self, id: TypeId) -> &'static str {
        self.get(id).map_or("<unknown>", |decl| self.lookup(decl.name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Incremental builder for one `TypeDecl`.
///
/// Members are recorded in declaration order. Validation happens in
/// [`finish`](Self::finish), which is the only way the declaration becomes
/// visible in the registry.
pub struct TypeDeclBuilder<'r> {
    registry: &'r mut TypeRegistry,
    id: TypeId,
    name: Name,
    kind: TypeKind,
    base: Option<TypeId>,
    interfaces: Vec<TypeId>,
    constructors: Vec<ConstructorDesc>,
    events: Vec<EventDesc>,
    properties: Vec<PropertyDesc>,
    methods: Vec<MethodDesc>,
}

impl<'r> TypeDeclBuilder<'r> {
    fn new(registry: &'r mut TypeRegistry, name: &str, kind: TypeKind) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "a registry never holds u32::MAX declarations"
        )]
        let id = TypeId::from_raw(registry.types.len() as u32);
        let name = registry.intern(name);
        Self {
            registry,
            id,
            name,
            kind,
            base: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            events: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// The id the declaration will receive.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Mark the class as sealed (cannot be proxied by subclassing).
    #[must_use]
    pub fn sealed(mut self) -> Self {
        if let TypeKind::Class { sealed, .. } = &mut self.kind {
            *sealed = true;
        }
        self
    }

    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        if let TypeKind::Class { is_abstract, .. } = &mut self.kind {
            *is_abstract = true;
        }
        self
    }

    /// Set the superclass.
    #[must_use]
    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented (or, for interfaces, inherited) interface.
    #[must_use]
    pub fn implements(mut self, iface: TypeId) -> Self {
        self.interfaces.push(iface);
        self
    }

    #[must_use]
    pub fn constructor(mut self, params: &[(&str, ValueType)]) -> Self {
        let params = self.params(params);
        self.constructors.push(ConstructorDesc {
            declaring: Some(self.id),
            params,
        });
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        params: &[(&str, ValueType)],
        ret: ValueType,
        modifiers: Modifiers,
    ) -> Self {
        let params = self.params(params);
        let method = self.accessor(name, params, ret, modifiers, AccessorKind::Method);
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn property(
        mut self,
        name: &str,
        ty: ValueType,
        access: PropertyAccess,
        modifiers: Modifiers,
    ) -> Self {
        let readable = matches!(access, PropertyAccess::ReadOnly | PropertyAccess::ReadWrite);
        let writable = matches!(access, PropertyAccess::WriteOnly | PropertyAccess::ReadWrite);
        let getter = readable
            .then(|| self.accessor(name, Box::new([]), ty, modifiers, AccessorKind::Getter));
        let setter = writable.then(|| {
            let params = self.params(&[("value", ty)]);
            self.accessor(name, params, ValueType::Unit, modifiers, AccessorKind::Setter)
        });
        self.properties.push(PropertyDesc {
            declaring: self.id,
            name: self.registry.intern(name),
            ty,
            getter,
            setter,
        });
        self
    }

    #[must_use]
    pub fn event(mut self, name: &str, modifiers: Modifiers) -> Self {
        let handler = self.params(&[("handler", ValueType::Handler)]);
        let add = self.accessor(
            name,
            handler.clone(),
            ValueType::Unit,
            modifiers,
            AccessorKind::Adder,
        );
        let remove = self.accessor(name, handler, ValueType::Unit, modifiers, AccessorKind::Remover);
        self.events.push(EventDesc {
            declaring: self.id,
            name: self.registry.intern(name),
            add,
            remove,
        });
        self
    }

    fn params(&self, params: &[(&str, ValueType)]) -> Box<[Param]> {
        params
            .iter()
            .map(|&(name, ty)| Param {
                name: self.registry.intern(name),
                ty,
            })
            .collect()
    }

    fn accessor(
        &self,
        name: &str,
        params: Box<[Param]>,
        ret: ValueType,
        mut modifiers: Modifiers,
        kind: AccessorKind,
    ) -> MethodDesc {
        // Interface members are implicitly abstract.
        if matches!(self.kind, TypeKind::Interface) {
            modifiers |= Modifiers::ABSTRACT;
        }
        MethodDesc {
            declaring: self.id,
            name: self.registry.intern(name),
            params,
            ret,
            modifiers,
            kind,
        }
    }

    /// Validate and register the declaration.
    pub fn finish(self) -> Result<TypeId, RegistryError> {
        let registry = self.registry;
        let type_name = registry.lookup(self.name).to_owned();

        if registry.by_name.contains_key(&self.name) {
            return Err(RegistryError::DuplicateType(type_name));
        }

        for &id in self.base.iter().chain(&self.interfaces) {
            let Some(decl) = registry.get(id) else {
                return Err(RegistryError::UnknownType { type_name, id });
            };
            let is_base = Some(id) == self.base;
            let expected = if is_base { "a class" } else { "an interface" };
            if decl.is_interface() == is_base {
                return Err(RegistryError::KindMismatch {
                    type_name,
                    found: registry.lookup(decl.name).to_owned(),
                    expected,
                });
            }
        }

        check_unique(registry, &type_name, "method", self.methods.iter().map(|m| m.name))?;
        check_unique(registry, &type_name, "property", self.properties.iter().map(|p| p.name))?;
        check_unique(registry, &type_name, "event", self.events.iter().map(|e| e.name))?;

        registry.by_name.insert(self.name, self.id);
        registry.types.push(TypeDecl {
            id: self.id,
            name: self.name,
            kind: self.kind,
            base: self.base,
            interfaces: self.interfaces.into_boxed_slice(),
            constructors: self.constructors.into_boxed_slice(),
            events: self.events.into_boxed_slice(),
            properties: self.properties.into_boxed_slice(),
            methods: self.methods.into_boxed_slice(),
        });
        Ok(self.id)
    }
}

fn check_unique(
    registry: &TypeRegistry,
    type_name: &str,
    kind: &'static str,
    names: impl Iterator<Item = Name>,
) -> Result<(), RegistryError> {
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            return Err(RegistryError::DuplicateMember {
                type_name: type_name.to_owned(),
                kind,
                member: registry.lookup(name).to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
