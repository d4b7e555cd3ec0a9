//! Builds invocation types for accepted members.
//!
//! The factory is where accessor shapes get checked: anything the dispatch
//! layer could not represent is rejected here, at generation time, so that a
//! successfully generated proxy never fails a call for structural reasons.

use std::sync::Arc;

use veneer_ir::{
    AccessorKind, EventDesc, MethodDesc, Name, PropertyDesc, TypeId, TypeRegistry, ValueType,
};

use super::{InterceptedMember, InvocationType};
use crate::ProxyError;

/// Produces one [`InvocationType`] per intercepted accessor.
pub struct InvocationTypeFactory<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> InvocationTypeFactory<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Invocation type for `accessor`, the adder or remover of `event`.
    pub fn for_event(
        &self,
        event: &EventDesc,
        accessor: &MethodDesc,
    ) -> Result<Arc<InvocationType>, ProxyError> {
        let label = self.label(event.declaring, event.name);
        if accessor != &event.add && accessor != &event.remove {
            return Err(ProxyError::unsupported(
                label,
                accessor.kind,
                "accessor does not belong to the event",
            ));
        }
        check_overridable(accessor, &label)?;
        let takes_handler =
            accessor.params.len() == 1 && accessor.params[0].ty == ValueType::Handler;
        if !takes_handler || accessor.ret != ValueType::Unit {
            return Err(ProxyError::unsupported(
                label,
                accessor.kind,
                "event accessors must take one handler and return unit",
            ));
        }
        Ok(finish(InterceptedMember::Event(event.clone()), accessor, label))
    }

    /// Invocation type for `accessor`, the getter or setter of `property`.
    pub fn for_property(
        &self,
        property: &PropertyDesc,
        accessor: &MethodDesc,
    ) -> Result<Arc<InvocationType>, ProxyError> {
        let label = self.label(property.declaring, property.name);
        if property.getter.as_ref() != Some(accessor) && property.setter.as_ref() != Some(accessor)
        {
            return Err(ProxyError::unsupported(
                label,
                accessor.kind,
                "accessor does not belong to the property",
            ));
        }
        check_overridable(accessor, &label)?;
        let well_formed = match accessor.kind {
            AccessorKind::Getter => accessor.params.is_empty() && accessor.ret == property.ty,
            AccessorKind::Setter => {
                accessor.params.len() == 1
                    && accessor.params[0].ty == property.ty
                    && accessor.ret == ValueType::Unit
            }
            _ => false,
        };
        if !well_formed {
            return Err(ProxyError::unsupported(
                label,
                accessor.kind,
                format!("accessor does not match property type {}", property.ty),
            ));
        }
        Ok(finish(InterceptedMember::Property(property.clone()), accessor, label))
    }

    /// Invocation type for a plain method.
    pub fn for_method(&self, method: &MethodDesc) -> Result<Arc<InvocationType>, ProxyError> {
        let label = self.label(method.declaring, method.name);
        if method.kind != AccessorKind::Method {
            return Err(ProxyError::unsupported(
                label,
                method.kind,
                "property and event accessors are intercepted through their member",
            ));
        }
        check_overridable(method, &label)?;
        Ok(finish(InterceptedMember::Method(method.clone()), method, label))
    }

    fn label(&self, declaring: TypeId, name: Name) -> String {
        format!(
            "{}.{}",
            self.registry.type_name(declaring),
            self.registry.lookup(name)
        )
    }
}

fn finish(member: InterceptedMember, accessor: &MethodDesc, label: String) -> Arc<InvocationType> {
    tracing::trace!(member = %label, accessor = accessor.kind.as_str(), "invocation type");
    Arc::new(InvocationType {
        member,
        accessor: accessor.clone(),
        label,
    })
}

fn check_overridable(accessor: &MethodDesc, label: &str) -> Result<(), ProxyError> {
    if accessor.modifiers.is_overridable() {
        Ok(())
    } else {
        Err(ProxyError::unsupported(
            label,
            accessor.kind,
            "only virtual or abstract instance members can be intercepted",
        ))
    }
}
