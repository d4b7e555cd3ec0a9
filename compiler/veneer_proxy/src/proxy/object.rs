//! Instances of generated proxy types.

use std::fmt;
use std::sync::Arc;

use veneer_ir::{AccessorKind, ConstructorDesc, Handler, MethodDesc, TypeRegistry, Value};

use crate::backend::{GeneratedType, Slot};
use crate::invocation::{check_arguments, check_return, SharedInterceptor, SharedTarget};
use crate::CallError;

/// A live proxy instance.
///
/// Members are addressed by name. When several members share a name (an
/// interface method and a base class method, say), the first one in template
/// order wins; use [`ProxyObject::invoke`] to address an exact accessor.
pub struct ProxyObject {
    registry: Arc<TypeRegistry>,
    ty: Arc<dyn GeneratedType>,
    constructor: ConstructorDesc,
    constructor_args: Box<[Value]>,
    target: Option<SharedTarget>,
    interceptors: Arc<[SharedInterceptor]>,
}

impl ProxyObject {
    pub(crate) fn new(
        registry: Arc<TypeRegistry>,
        ty: Arc<dyn GeneratedType>,
        constructor: ConstructorDesc,
        constructor_args: Vec<Value>,
        target: Option<SharedTarget>,
        interceptors: Vec<SharedInterceptor>,
    ) -> Self {
        ProxyObject {
            registry,
            ty,
            constructor,
            constructor_args: constructor_args.into_boxed_slice(),
            target,
            interceptors: interceptors.into(),
        }
    }

    pub fn generated_type(&self) -> &dyn GeneratedType {
        &*self.ty
    }

    /// Whether this object's type carries the proxy marker.
    pub fn is_proxy(&self) -> bool {
        self.ty.is_proxy()
    }

    pub fn target(&self) -> Option<&SharedTarget> {
        self.target.as_ref()
    }

    pub fn interceptors(&self) -> &[SharedInterceptor] {
        &self.interceptors
    }

    /// The constructor this instance was created with, and its arguments.
    pub fn constructor(&self) -> (&ConstructorDesc, &[Value]) {
        (&self.constructor, &self.constructor_args)
    }

    /// Call a method.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, CallError> {
        self.dispatch(method, AccessorKind::Method, args)
    }

    /// Read a property.
    pub fn get(&self, property: &str) -> Result<Value, CallError> {
        self.dispatch(property, AccessorKind::Getter, Vec::new())
    }

    /// Write a property.
    pub fn set(&self, property: &str, value: Value) -> Result<(), CallError> {
        self.dispatch(property, AccessorKind::Setter, vec![value]).map(drop)
    }

    /// Subscribe `handler` to an event.
    pub fn add_handler(&self, event: &str, handler: Handler) -> Result<(), CallError> {
        self.dispatch(event, AccessorKind::Adder, vec![Value::Handler(handler)]).map(drop)
    }

    /// Unsubscribe `handler` from an event.
    pub fn remove_handler(&self, event: &str, handler: Handler) -> Result<(), CallError> {
        self.dispatch(event, AccessorKind::Remover, vec![Value::Handler(handler)]).map(drop)
    }

    /// Call an exact accessor of the generated type.
    pub fn invoke(&self, accessor: &MethodDesc, args: Vec<Value>) -> Result<Value, CallError> {
        let slot = self.ty.slot(accessor).ok_or_else(|| CallError::UnknownMember {
            member: self.registry.lookup(accessor.name).to_owned(),
            kind: accessor.kind.as_str(),
        })?;
        self.run(slot, args)
    }

    fn dispatch(
        &self,
        name: &str,
        kind: AccessorKind,
        args: Vec<Value>,
    ) -> Result<Value, CallError> {
        let slot = self
            .registry
            .name(name)
            .and_then(|name| self.ty.find(name, kind))
            .ok_or_else(|| CallError::UnknownMember {
                member: name.to_owned(),
                kind: kind.as_str(),
            })?;
        self.run(slot, args)
    }

    fn run(&self, slot: &Slot, args: Vec<Value>) -> Result<Value, CallError> {
        match slot {
            Slot::Intercepted(ty) => ty
                .create(self.target.as_deref(), &self.interceptors, args)?
                .run(),
            Slot::PassThrough(accessor) => {
                let label = || {
                    format!(
                        "{}.{}",
                        self.registry.type_name(accessor.declaring),
                        self.registry.lookup(accessor.name)
                    )
                };
                check_arguments(accessor, &args, label)?;
                let target = self
                    .target
                    .as_deref()
                    .ok_or_else(|| CallError::NoTarget { member: label() })?;
                let value = target.invoke(accessor, &args)?;
                check_return(accessor, Some(value), label)
            }
        }
    }
}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyObject")
            .field("type", &self.ty.name())
            .field("constructor_args", &self.constructor_args)
            .field("has_target", &self.target.is_some())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
