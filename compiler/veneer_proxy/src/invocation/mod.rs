//! Invocations: the call context handed to interceptors.
//!
//! Every intercepted accessor of a generated type owns one
//! [`InvocationType`], built at generation time by the
//! [`InvocationTypeFactory`]. At call time the invocation type checks the raw
//! arguments against the accessor's shape and produces an [`Invocation`],
//! which walks the interceptor chain and, if the chain falls through, calls
//! the target.
//!
//! Interceptors see the same API for methods, property accessors and event
//! accessors: inspect or rewrite the arguments, then either `proceed()` to the
//! next interceptor (and eventually the target) or short-circuit with
//! `set_return_value()`.
//!
//! Errors raised by interceptors or targets are returned exactly as raised.

mod factory;

use std::sync::Arc;

use veneer_ir::{EventDesc, MethodDesc, PropertyDesc, Value, ValueType};

use crate::CallError;

pub use factory::InvocationTypeFactory;

/// The real object behind a proxy.
pub trait Target: Send + Sync {
    /// Execute `accessor` with already-validated arguments.
    fn invoke(&self, accessor: &MethodDesc, args: &[Value]) -> Result<Value, CallError>;
}

/// A link in the interception pipeline.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), CallError>;
}

impl<F> Interceptor for F
where
    F: Fn(&mut Invocation<'_>) -> Result<(), CallError> + Send + Sync,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), CallError> {
        self(invocation)
    }
}

pub type SharedTarget = Arc<dyn Target>;
pub type SharedInterceptor = Arc<dyn Interceptor>;

/// Wrap a closure as a shareable interceptor.
pub fn interceptor_fn(
    f: impl Fn(&mut Invocation<'_>) -> Result<(), CallError> + Send + Sync + 'static,
) -> SharedInterceptor {
    Arc::new(f)
}

/// The member an intercepted accessor belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterceptedMember {
    Event(EventDesc),
    Property(PropertyDesc),
    Method(MethodDesc),
}

impl InterceptedMember {
    pub fn as_method(&self) -> Option<&MethodDesc> {
        match self {
            InterceptedMember::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyDesc> {
        match self {
            InterceptedMember::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventDesc> {
        match self {
            InterceptedMember::Event(e) => Some(e),
            _ => None,
        }
    }
}

/// Reusable constructor of invocations for one accessor.
#[derive(Debug)]
pub struct InvocationType {
    member: InterceptedMember,
    accessor: MethodDesc,
    /// `Type.member` for error messages.
    label: String,
}

impl InvocationType {
    pub fn member(&self) -> &InterceptedMember {
        &self.member
    }

    pub fn accessor(&self) -> &MethodDesc {
        &self.accessor
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Check `args` against the accessor and start an invocation.
    pub fn create<'a>(
        &'a self,
        target: Option<&'a dyn Target>,
        interceptors: &'a [SharedInterceptor],
        args: Vec<Value>,
    ) -> Result<Invocation<'a>, CallError> {
        check_arguments(&self.accessor, &args, || self.label.clone())?;
        Ok(Invocation {
            ty: self,
            target,
            interceptors,
            next: 0,
            arguments: args,
            return_value: None,
        })
    }
}

/// Validate arity and argument types against an accessor's parameters.
pub(crate) fn check_arguments(
    accessor: &MethodDesc,
    args: &[Value],
    label: impl Fn() -> String,
) -> Result<(), CallError> {
    if args.len() != accessor.params.len() {
        return Err(CallError::ArgumentCount {
            member: label(),
            expected: accessor.params.len(),
            found: args.len(),
        });
    }
    for (index, (param, arg)) in accessor.params.iter().zip(args).enumerate() {
        if !param.ty.admits(arg) {
            return Err(CallError::ArgumentType {
                member: label(),
                index,
                expected: param.ty,
                found: arg.value_type(),
            });
        }
    }
    Ok(())
}

/// Check a finished call's result against `accessor`'s return type.
///
/// A unit accessor that produced nothing returns `Value::Unit`.
pub(crate) fn check_return(
    accessor: &MethodDesc,
    value: Option<Value>,
    label: impl Fn() -> String,
) -> Result<Value, CallError> {
    let expected = accessor.ret;
    match value {
        Some(value) if expected.admits(&value) => Ok(value),
        Some(value) => Err(CallError::ReturnType {
            member: label(),
            expected,
            found: value.value_type(),
        }),
        None if expected == ValueType::Unit => Ok(Value::Unit),
        None => Err(CallError::MissingReturnValue {
            member: label(),
            expected,
        }),
    }
}

/// One intercepted call in flight.
pub struct Invocation<'a> {
    ty: &'a InvocationType,
    target: Option<&'a dyn Target>,
    interceptors: &'a [SharedInterceptor],
    /// Index of the interceptor `proceed()` runs next.
    next: usize,
    arguments: Vec<Value>,
    return_value: Option<Value>,
}

impl<'a> Invocation<'a> {
    /// The event, property or method being called.
    pub fn member(&self) -> &'a InterceptedMember {
        &self.ty.member
    }

    /// The accessor being called (the method itself for plain methods).
    pub fn accessor(&self) -> &'a MethodDesc {
        &self.ty.accessor
    }

    pub fn target(&self) -> Option<&'a dyn Target> {
        self.target
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Arguments as seen by the rest of the chain. The count is fixed.
    pub fn arguments_mut(&mut self) -> &mut [Value] {
        &mut self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = Some(value);
    }

    /// Run the next interceptor, or the target once the chain is exhausted.
    ///
    /// May be called more than once; each call re-runs the rest of the chain.
    pub fn proceed(&mut self) -> Result<(), CallError> {
        let interceptors = self.interceptors;
        if let Some(interceptor) = interceptors.get(self.next) {
            self.next += 1;
            let result = interceptor.intercept(self);
            self.next -= 1;
            return result;
        }

        let Some(target) = self.target else {
            return Err(CallError::NoTarget {
                member: self.ty.label.clone(),
            });
        };
        let value = target.invoke(&self.ty.accessor, &self.arguments)?;
        self.return_value = Some(value);
        Ok(())
    }

    /// Run the whole chain and produce the call's result.
    pub(crate) fn run(mut self) -> Result<Value, CallError> {
        self.proceed()?;
        let ty = self.ty;
        check_return(&ty.accessor, self.return_value, || ty.label.clone())
    }
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("member", &self.ty.label)
            .field("accessor", &self.ty.accessor.kind)
            .field("arguments", &self.arguments)
            .field("return_value", &self.return_value)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
