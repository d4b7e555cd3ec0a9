//! Declared types: the shapes a proxy can implement or extend.

use std::fmt;

use crate::{ConstructorDesc, EventDesc, MethodDesc, Name, PropertyDesc};

/// Handle to a type declared in a [`TypeRegistry`](crate::TypeRegistry).
///
/// Two handles from the same registry are equal exactly when they name the
/// same declaration, so `TypeId` equality is structural type identity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Whether a declaration is an interface or a class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Interface,
    Class { sealed: bool, is_abstract: bool },
}

/// A registered type and its members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    pub id: TypeId,
    pub name: Name,
    pub kind: TypeKind,
    /// Superclass, for classes only.
    pub base: Option<TypeId>,
    /// Implemented interfaces (classes) or inherited interfaces (interfaces),
    /// in declaration order.
    pub interfaces: Box<[TypeId]>,
    pub constructors: Box<[ConstructorDesc]>,
    pub events: Box<[EventDesc]>,
    pub properties: Box<[PropertyDesc]>,
    pub methods: Box<[MethodDesc]>,
}

impl TypeDecl {
    #[inline]
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        matches!(self.kind, TypeKind::Class { sealed: true, .. })
    }
}
