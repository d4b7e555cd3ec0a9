//! Proxy Generator
//!
//! Walks a template once, asks the filter about every event, property and
//! method, and drives a [`TypeBackend`] accordingly. Accepted members get
//! invocation types and are recorded on the resulting [`Proxy`]; rejected
//! ones are emitted as pass-throughs. The first error from the factory or the
//! backend aborts the attempt and drops the backend, so a generation either
//! produces a complete proxy or nothing.
//!
//! Generation is deterministic: the same template, filter and backend
//! behaviour always produce the same sequence of backend calls.

use std::sync::Arc;

use veneer_ir::{Name, TypeRegistry};

use crate::backend::{CustomAttribute, TypeBackend};
use crate::cache::ProxyKey;
use crate::invocation::InvocationTypeFactory;
use crate::proxy::{Accepted, Proxy};
use crate::template::{Member, ProxyTemplate};
use crate::{GenerationOptions, ProxyError};

/// Turns templates into proxies.
pub struct ProxyGenerator<'a> {
    registry: &'a Arc<TypeRegistry>,
    options: &'a GenerationOptions,
}

impl<'a> ProxyGenerator<'a> {
    pub fn new(registry: &'a Arc<TypeRegistry>, options: &'a GenerationOptions) -> Self {
        Self { registry, options }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(members = template.len()))]
    pub fn generate<B: TypeBackend>(
        &self,
        template: ProxyTemplate,
        mut backend: B,
    ) -> Result<Proxy, ProxyError> {
        let registry = &**self.registry;
        let factory = InvocationTypeFactory::new(registry);
        let filter = self.options.filter();

        backend.add_custom_attribute(CustomAttribute::GeneratedProxy)?;
        for attribute in self.options.attributes() {
            backend.add_custom_attribute(attribute.clone())?;
        }

        let mut accepted = Accepted::default();
        for member in template.members() {
            match member {
                Member::Interface(iface) => backend.add_interface(iface)?,
                Member::Constructor(ctor) => backend.build_constructor(ctor)?,
                Member::Event(event) => {
                    let accept = filter.accept_event(event);
                    trace_decision(registry, "event", event.name, accept);
                    if accept {
                        let add = factory.for_event(event, &event.add)?;
                        let remove = factory.for_event(event, &event.remove)?;
                        backend.build_event(event, add, remove)?;
                        accepted.events.push(event.clone());
                    } else {
                        backend.build_passthrough(member)?;
                    }
                }
                Member::Property(property) => {
                    let accept = filter.accept_property(property);
                    trace_decision(registry, "property", property.name, accept);
                    if accept {
                        let getter = property
                            .getter
                            .as_ref()
                            .map(|getter| factory.for_property(property, getter))
                            .transpose()?;
                        let setter = property
                            .setter
                            .as_ref()
                            .map(|setter| factory.for_property(property, setter))
                            .transpose()?;
                        backend.build_property(property, getter, setter)?;
                        accepted.properties.push(property.clone());
                    } else {
                        backend.build_passthrough(member)?;
                    }
                }
                Member::Method(method) => {
                    let accept = filter.accept_method(method);
                    trace_decision(registry, "method", method.name, accept);
                    if accept {
                        let invocation = factory.for_method(method)?;
                        backend.build_method(method, invocation)?;
                        accepted.methods.push(method.clone());
                    } else {
                        backend.build_passthrough(member)?;
                    }
                }
            }
        }

        let ty = backend.create_type()?;
        tracing::debug!(
            events = accepted.events.len(),
            properties = accepted.properties.len(),
            methods = accepted.methods.len(),
            "generated proxy type"
        );
        let key = ProxyKey::for_template(self.registry, &template, self.options.clone());
        Ok(Proxy::new(
            key,
            Arc::clone(self.registry),
            template,
            Arc::new(ty),
            accepted,
        ))
    }
}

fn trace_decision(registry: &TypeRegistry, kind: &str, name: Name, accept: bool) {
    tracing::trace!(kind, member = registry.lookup(name), accept, "interception decision");
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
