//! In-process backend: proxy types as dispatch tables.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use veneer_ir::{
    AccessorKind, ConstructorDesc, EventDesc, MethodDesc, Name, PropertyDesc, TypeId,
};

use super::{CustomAttribute, GeneratedType, Slot, TypeBackend};
use crate::invocation::InvocationType;
use crate::template::Member;
use crate::ProxyError;

/// Builds a [`DynamicType`].
#[derive(Debug)]
pub struct DynamicBackend {
    ty: DynamicType,
}

impl DynamicBackend {
    pub fn new(name: impl Into<String>) -> Self {
        DynamicBackend {
            ty: DynamicType {
                name: name.into(),
                attributes: Vec::new(),
                interfaces: Vec::new(),
                constructors: Vec::new(),
                slots: Vec::new(),
                by_accessor: FxHashMap::default(),
                by_name: FxHashMap::default(),
            },
        }
    }

    fn intercepted(
        &mut self,
        expected: &MethodDesc,
        invocation: Arc<InvocationType>,
    ) -> Result<(), ProxyError> {
        if invocation.accessor() != expected {
            return Err(ProxyError::BackendFailure {
                reason: format!(
                    "invocation type for `{}` wired to the wrong {}",
                    invocation.label(),
                    expected.kind.as_str()
                ),
            });
        }
        self.insert(Slot::Intercepted(invocation))
    }

    fn insert(&mut self, slot: Slot) -> Result<(), ProxyError> {
        let ty = &mut self.ty;
        let accessor = slot.accessor().clone();
        if ty.by_accessor.contains_key(&accessor) {
            return Err(ProxyError::BackendFailure {
                reason: format!("`{}` already has a {} slot", ty.name, accessor.kind.as_str()),
            });
        }
        let index = ty.slots.len();
        ty.by_name.entry((accessor.name, accessor.kind)).or_insert(index);
        ty.by_accessor.insert(accessor, index);
        ty.slots.push(slot);
        Ok(())
    }
}

impl TypeBackend for DynamicBackend {
    type Output = DynamicType;

    fn add_interface(&mut self, iface: TypeId) -> Result<(), ProxyError> {
        if self.ty.interfaces.contains(&iface) {
            return Err(ProxyError::BackendFailure {
                reason: format!("interface {iface:?} implemented twice"),
            });
        }
        self.ty.interfaces.push(iface);
        Ok(())
    }

    fn add_custom_attribute(&mut self, attribute: CustomAttribute) -> Result<(), ProxyError> {
        self.ty.attributes.push(attribute);
        Ok(())
    }

    fn build_constructor(&mut self, ctor: &ConstructorDesc) -> Result<(), ProxyError> {
        if self.ty.constructors.contains(ctor) {
            return Err(ProxyError::BackendFailure {
                reason: format!("duplicate constructor with {} parameter(s)", ctor.params.len()),
            });
        }
        self.ty.constructors.push(ctor.clone());
        Ok(())
    }

    fn build_event(
        &mut self,
        event: &EventDesc,
        add: Arc<InvocationType>,
        remove: Arc<InvocationType>,
    ) -> Result<(), ProxyError> {
        self.intercepted(&event.add, add)?;
        self.intercepted(&event.remove, remove)
    }

    fn build_property(
        &mut self,
        property: &PropertyDesc,
        getter: Option<Arc<InvocationType>>,
        setter: Option<Arc<InvocationType>>,
    ) -> Result<(), ProxyError> {
        let pairs = [(&property.getter, getter), (&property.setter, setter)];
        for (declared, built) in pairs {
            match (declared, built) {
                (Some(accessor), Some(invocation)) => self.intercepted(accessor, invocation)?,
                (None, None) => {}
                (_, _) => {
                    return Err(ProxyError::BackendFailure {
                        reason: "property accessors do not match the declaration".to_owned(),
                    })
                }
            }
        }
        Ok(())
    }

    fn build_method(
        &mut self,
        method: &MethodDesc,
        invocation: Arc<InvocationType>,
    ) -> Result<(), ProxyError> {
        self.intercepted(method, invocation)
    }

    fn build_passthrough(&mut self, member: Member<'_>) -> Result<(), ProxyError> {
        match member {
            Member::Event(event) => {
                for accessor in event.accessors() {
                    self.insert(Slot::PassThrough(accessor.clone()))?;
                }
            }
            Member::Property(property) => {
                for accessor in property.accessors() {
                    self.insert(Slot::PassThrough(accessor.clone()))?;
                }
            }
            Member::Method(method) => self.insert(Slot::PassThrough(method.clone()))?,
            Member::Interface(_) | Member::Constructor(_) => {
                return Err(ProxyError::BackendFailure {
                    reason: "only events, properties and methods can pass through".to_owned(),
                })
            }
        }
        Ok(())
    }

    fn create_type(self) -> Result<DynamicType, ProxyError> {
        if self.ty.constructors.is_empty() {
            return Err(ProxyError::BackendFailure {
                reason: format!("`{}` has no constructors", self.ty.name),
            });
        }
        Ok(self.ty)
    }
}

/// A proxy type backed by a dispatch table.
#[derive(Debug)]
pub struct DynamicType {
    name: String,
    attributes: Vec<CustomAttribute>,
    interfaces: Vec<TypeId>,
    constructors: Vec<ConstructorDesc>,
    /// Slots in emission order.
    slots: Vec<Slot>,
    by_accessor: FxHashMap<MethodDesc, usize>,
    /// First slot per name and kind.
    by_name: FxHashMap<(Name, AccessorKind), usize>,
}

impl DynamicType {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

impl GeneratedType for DynamicType {
    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &[CustomAttribute] {
        &self.attributes
    }

    fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    fn constructors(&self) -> &[ConstructorDesc] {
        &self.constructors
    }

    fn slot(&self, accessor: &MethodDesc) -> Option<&Slot> {
        self.by_accessor.get(accessor).map(|&i| &self.slots[i])
    }

    fn find(&self, name: Name, kind: AccessorKind) -> Option<&Slot> {
        self.by_name.get(&(name, kind)).map(|&i| &self.slots[i])
    }
}
