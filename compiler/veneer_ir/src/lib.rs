//! Reflection data model for Veneer.
//!
//! Everything the proxy engine needs to know about the shapes it implements:
//!
//! - `Name` / `StringInterner`: compact interned identifiers
//! - `TypeId` / `TypeDecl`: declared interfaces and classes
//! - `MethodDesc`, `PropertyDesc`, `EventDesc`, `ConstructorDesc`: read-only
//!   member descriptors with accessor kinds and modifiers
//! - `Value` / `ValueType`: what flows through a proxied call
//! - `TypeRegistry`: where declarations live and where descriptors come from
//!
//! All descriptor types are `Clone + Eq + Hash` so they can be compared
//! exactly and used as keys.

mod interner;
mod member;
mod name;
mod registry;
mod types;
mod value;

pub use interner::{InternError, StringInterner};
pub use member::{AccessorKind, ConstructorDesc, EventDesc, MethodDesc, Modifiers, Param, PropertyDesc};
pub use name::Name;
pub use registry::{PropertyAccess, RegistryError, TypeDeclBuilder, TypeRegistry};
pub use types::{TypeDecl, TypeId, TypeKind};
pub use value::{Handler, Value, ValueType};

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{Name, TypeId};
    const _: () = assert!(std::mem::size_of::<Name>() == 4);
    const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
}
