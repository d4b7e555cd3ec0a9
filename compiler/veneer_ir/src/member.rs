//! Member descriptors: the read-only view of methods, properties, events and
//! constructors that proxy generation works from.
//!
//! Properties and events are modelled the way runtimes with accessor
//! methods model them: each is a named member plus one or two accessor
//! `MethodDesc`s (getter/setter, add/remove) distinguished by their
//! `AccessorKind`. Interception always happens at the accessor level, while
//! interceptors still see the owning property or event.

use bitflags::bitflags;

use crate::{Name, TypeId, ValueType};

bitflags! {
    /// Declaration modifiers relevant to interception.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Modifiers: u8 {
        /// Can be overridden by a subclass.
        const VIRTUAL = 1 << 0;
        /// Has no implementation; must be supplied by a subclass or proxy.
        const ABSTRACT = 1 << 1;
        /// Overrides are forbidden.
        const SEALED = 1 << 2;
        /// Belongs to the type, not to instances.
        const STATIC = 1 << 3;
        /// Explicitly opted out of interception.
        const NON_INTERCEPTED = 1 << 4;
    }
}

impl Modifiers {
    /// Whether a member with these modifiers can be overridden at all.
    #[inline]
    pub fn is_overridable(self) -> bool {
        self.intersects(Self::VIRTUAL | Self::ABSTRACT)
            && !self.intersects(Self::SEALED | Self::STATIC)
    }
}

/// What role a method plays on its declaring type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessorKind {
    /// An ordinary method.
    Method,
    /// Property getter.
    Getter,
    /// Property setter.
    Setter,
    /// Event subscription accessor.
    Adder,
    /// Event unsubscription accessor.
    Remover,
}

impl AccessorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessorKind::Method => "method",
            AccessorKind::Getter => "getter",
            AccessorKind::Setter => "setter",
            AccessorKind::Adder => "adder",
            AccessorKind::Remover => "remover",
        }
    }
}

/// A named, typed parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: Name,
    pub ty: ValueType,
}

/// A method or accessor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDesc {
    /// Type that declares the method.
    pub declaring: TypeId,
    /// Name of the method, or of the owning property/event for accessors.
    pub name: Name,
    pub params: Box<[Param]>,
    pub ret: ValueType,
    pub modifiers: Modifiers,
    pub kind: AccessorKind,
}

impl MethodDesc {
    /// Parameter types in declaration order.
    pub fn param_types(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.params.iter().map(|p| p.ty)
    }

    /// Whether two descriptors describe the same slot, ignoring the
    /// declaring type. A derived class redefining a slot hides the base one.
    pub fn same_slot(&self, other: &MethodDesc) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

/// A property with at least one accessor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyDesc {
    pub declaring: TypeId,
    pub name: Name,
    pub ty: ValueType,
    pub getter: Option<MethodDesc>,
    pub setter: Option<MethodDesc>,
}

impl PropertyDesc {
    /// Accessors present on this property, getter first.
    pub fn accessors(&self) -> impl Iterator<Item = &MethodDesc> {
        self.getter.iter().chain(self.setter.iter())
    }
}

/// An event with subscribe/unsubscribe accessors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventDesc {
    pub declaring: TypeId,
    pub name: Name,
    pub add: MethodDesc,
    pub remove: MethodDesc,
}

impl EventDesc {
    pub fn accessors(&self) -> impl Iterator<Item = &MethodDesc> {
        [&self.add, &self.remove].into_iter()
    }
}

/// A constructor the generated type exposes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ConstructorDesc {
    /// Base class whose constructor this forwards to; `None` for the
    /// synthetic constructor of an interface-only proxy.
    pub declaring: Option<TypeId>,
    pub params: Box<[Param]>,
}

impl ConstructorDesc {
    /// Whether `args` match this constructor's parameters.
    pub fn accepts(&self, args: &[crate::Value]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| p.ty.admits(a))
    }
}
