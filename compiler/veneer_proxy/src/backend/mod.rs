//! Type Emission Backend
//!
//! The generator never materializes types itself. It drives a
//! [`TypeBackend`] through a fixed sequence of primitives, one per template
//! element, and finally asks it for the finished [`GeneratedType`]:
//!
//! - `add_interface` / `add_custom_attribute`: type-level metadata
//! - `build_constructor`: one per template constructor
//! - `build_event` / `build_property` / `build_method`: intercepted members,
//!   each wired to the invocation types of its accessors
//! - `build_passthrough`: members the filter rejected
//! - `create_type`: seal the type; the backend is consumed
//!
//! Any primitive may fail; the generator stops at the first failure and the
//! half-built backend is dropped, so no partial type ever escapes.
//!
//! [`DynamicBackend`] is the in-process implementation: it builds a dispatch
//! table instead of emitting code.

mod dynamic;

use std::fmt;
use std::sync::Arc;

use veneer_ir::{
    AccessorKind, ConstructorDesc, EventDesc, MethodDesc, Name, PropertyDesc, TypeId,
};

use crate::invocation::InvocationType;
use crate::template::Member;
use crate::ProxyError;

pub use dynamic::{DynamicBackend, DynamicType};

/// Metadata attached to a generated type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CustomAttribute {
    /// Marks the type as a generated proxy. Always added first.
    GeneratedProxy,
    /// A host-defined marker.
    Named(Name),
}

/// How a generated type dispatches one accessor.
#[derive(Clone, Debug)]
pub enum Slot {
    /// Runs the interceptor chain.
    Intercepted(Arc<InvocationType>),
    /// Calls the target directly.
    PassThrough(MethodDesc),
}

impl Slot {
    pub fn accessor(&self) -> &MethodDesc {
        match self {
            Slot::Intercepted(ty) => ty.accessor(),
            Slot::PassThrough(accessor) => accessor,
        }
    }

    pub fn is_intercepted(&self) -> bool {
        matches!(self, Slot::Intercepted(_))
    }
}

/// Emission primitives the generator drives.
pub trait TypeBackend {
    type Output: GeneratedType + 'static;

    fn add_interface(&mut self, iface: TypeId) -> Result<(), ProxyError>;

    fn add_custom_attribute(&mut self, attribute: CustomAttribute) -> Result<(), ProxyError>;

    fn build_constructor(&mut self, ctor: &ConstructorDesc) -> Result<(), ProxyError>;

    fn build_event(
        &mut self,
        event: &EventDesc,
        add: Arc<InvocationType>,
        remove: Arc<InvocationType>,
    ) -> Result<(), ProxyError>;

    /// At least one of `getter` and `setter` is present.
    fn build_property(
        &mut self,
        property: &PropertyDesc,
        getter: Option<Arc<InvocationType>>,
        setter: Option<Arc<InvocationType>>,
    ) -> Result<(), ProxyError>;

    fn build_method(
        &mut self,
        method: &MethodDesc,
        invocation: Arc<InvocationType>,
    ) -> Result<(), ProxyError>;

    /// Emit a member the filter rejected. Backends whose base type already
    /// provides the behaviour can leave this as a no-op.
    fn build_passthrough(&mut self, member: Member<'_>) -> Result<(), ProxyError> {
        let _ = member;
        Ok(())
    }

    fn create_type(self) -> Result<Self::Output, ProxyError>;
}

/// A finished proxy type.
pub trait GeneratedType: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn attributes(&self) -> &[CustomAttribute];

    fn interfaces(&self) -> &[TypeId];

    fn constructors(&self) -> &[ConstructorDesc];

    /// Dispatch slot for an exact accessor.
    fn slot(&self, accessor: &MethodDesc) -> Option<&Slot>;

    /// First slot, in template order, for a member name and accessor kind.
    fn find(&self, name: Name, kind: AccessorKind) -> Option<&Slot>;

    fn is_proxy(&self) -> bool {
        self.attributes().contains(&CustomAttribute::GeneratedProxy)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
