#![allow(
    clippy::unwrap_used,
    reason = "test code; panics provide clear failure messages"
)]

//! End-to-end proxy scenarios.
//!
//! Each test declares its shapes in a fresh registry, goes through
//! `ProxyBuilder`, instantiates the proxy and calls it by name.
//!
//! ```bash
//! cargo test -p veneer_proxy --test scenarios
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use pretty_assertions::assert_eq;
use veneer_ir::{
    AccessorKind, Handler, MethodDesc, Modifiers, PropertyAccess, TypeId, TypeRegistry, Value,
    ValueType,
};
use veneer_proxy::{
    interceptor_fn, AcceptAll, CallError, GenerationOptions, NoopProxyCache, Proxy, ProxyBuilder,
    ProxyCache, ProxyError, ProxyKey, RejectAll, SharedProxyCache, Target,
};

struct Shapes {
    registry: Arc<TypeRegistry>,
    greeter: TypeId,
    observable: TypeId,
    server: TypeId,
}

fn shapes() -> Shapes {
    let mut registry = TypeRegistry::new();
    let greeter = registry
        .declare_interface("Greeter")
        .method("greet", &[("name", ValueType::Str)], ValueType::Str, Modifiers::empty())
        .finish()
        .unwrap();
    let observable = registry
        .declare_interface("Observable")
        .property("label", ValueType::Str, PropertyAccess::ReadWrite, Modifiers::empty())
        .event("changed", Modifiers::empty())
        .finish()
        .unwrap();
    let server = registry
        .declare_class("Server")
        .constructor(&[("port", ValueType::Int)])
        .method("handle", &[("path", ValueType::Str)], ValueType::Int, Modifiers::VIRTUAL)
        .method("uptime", &[], ValueType::Int, Modifiers::empty())
        .finish()
        .unwrap();
    Shapes {
        registry: Arc::new(registry),
        greeter,
        observable,
        server,
    }
}

/// Plays the base class implementation: 200 for every path, uptime 42.
struct ServerImpl;

impl Target for ServerImpl {
    fn invoke(&self, accessor: &MethodDesc, args: &[Value]) -> Result<Value, CallError> {
        match args.first() {
            Some(Value::Str(path)) if path.as_ref() == "/missing" => Ok(Value::Int(404)),
            Some(_) => Ok(Value::Int(200)),
            None if accessor.params.is_empty() => Ok(Value::Int(42)),
            None => Err(CallError::raised("unexpected call")),
        }
    }
}

#[test]
fn greeter_interceptor_supplies_the_result() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));
    let proxy = builder
        .get_or_create(None, &[s.greeter], &GenerationOptions::default())
        .unwrap();

    let greet = s.registry.intern("greet");
    assert_eq!(proxy.methods().len(), 1);
    assert_eq!(proxy.methods()[0].name, greet);

    let hello = interceptor_fn(|inv| {
        let name = inv.argument(0).and_then(Value::as_str).unwrap().to_owned();
        inv.set_return_value(Value::str(format!("hello {name}")));
        Ok(())
    });
    let object = proxy.instantiate(vec![], None, vec![hello]).unwrap();
    assert!(object.is_proxy());
    assert_eq!(
        object.call("greet", vec![Value::str("world")]),
        Ok(Value::str("hello world"))
    );
}

#[test]
fn reject_all_still_produces_a_usable_proxy() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));
    let options = GenerationOptions::default().with_filter(RejectAll);
    let proxy = builder.get_or_create(Some(s.server), &[], &options).unwrap();

    assert!(proxy.events().is_empty());
    assert!(proxy.properties().is_empty());
    assert!(proxy.methods().is_empty());

    let counted = Arc::new(AtomicUsize::new(0));
    let counter = {
        let counted = Arc::clone(&counted);
        interceptor_fn(move |inv| {
            counted.fetch_add(1, Ordering::SeqCst);
            inv.proceed()
        })
    };
    let object = proxy
        .instantiate(vec![Value::Int(8080)], Some(Arc::new(ServerImpl)), vec![counter])
        .unwrap();
    assert_eq!(object.call("handle", vec![Value::str("/")]), Ok(Value::Int(200)));
    assert_eq!(counted.load(Ordering::SeqCst), 0, "pass-through skips interceptors");
}

#[test]
fn class_proxy_intercepts_virtual_members_only() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));
    let proxy = builder
        .get_or_create(Some(s.server), &[s.greeter], &GenerationOptions::default())
        .unwrap();
    let accepted: Vec<&str> = proxy
        .methods()
        .iter()
        .map(|m| s.registry.lookup(m.name))
        .collect();
    assert_eq!(accepted, vec!["greet", "handle"]);

    let rewrite = interceptor_fn(|inv| {
        if inv.member().as_method().is_some_and(|m| m.params.len() == 1) {
            if let Some(Value::Str(path)) = inv.argument(0).cloned() {
                if path.as_ref() == "/old" {
                    inv.arguments_mut()[0] = Value::str("/missing");
                }
            }
        }
        inv.proceed()
    });
    let object = proxy
        .instantiate(vec![Value::Int(80)], Some(Arc::new(ServerImpl)), vec![rewrite])
        .unwrap();

    assert_eq!(object.call("handle", vec![Value::str("/old")]), Ok(Value::Int(404)));
    assert_eq!(object.call("uptime", vec![]), Ok(Value::Int(42)));
    assert_eq!(
        object.call("handle", vec![Value::Int(1)]),
        Err(CallError::ArgumentType {
            member: "Server.handle".to_owned(),
            index: 0,
            expected: ValueType::Str,
            found: ValueType::Int,
        })
    );
}

#[test]
fn instantiation_picks_a_matching_constructor() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));
    let proxy = builder
        .get_or_create(Some(s.server), &[], &GenerationOptions::default())
        .unwrap();

    let err = proxy.instantiate(vec![], None, vec![]).unwrap_err();
    assert!(matches!(err, ProxyError::NoMatchingConstructor { arity: 0, .. }), "{err}");
    let err = proxy.instantiate(vec![Value::str("80")], None, vec![]).unwrap_err();
    assert!(matches!(err, ProxyError::NoMatchingConstructor { arity: 1, .. }), "{err}");

    let object = proxy.instantiate(vec![Value::Int(80)], None, vec![]).unwrap();
    assert_eq!(object.constructor().1, &[Value::Int(80)]);
    assert_eq!(
        object.call("uptime", vec![]),
        Err(CallError::NoTarget {
            member: "Server.uptime".to_owned()
        })
    );
}

#[test]
fn properties_and_events_go_through_interceptors() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));
    let proxy = builder
        .get_or_create(None, &[s.observable], &GenerationOptions::default())
        .unwrap();
    assert_eq!(proxy.properties().len(), 1);
    assert_eq!(proxy.events().len(), 1);

    // A tiny in-interceptor implementation of the interface.
    let label = Arc::new(Mutex::new(Value::str("")));
    let handlers: Arc<Mutex<Vec<Handler>>> = Arc::default();
    let backing = {
        let (label, handlers) = (Arc::clone(&label), Arc::clone(&handlers));
        interceptor_fn(move |inv| {
            match inv.accessor().kind {
                AccessorKind::Getter => inv.set_return_value(label.lock().unwrap().clone()),
                AccessorKind::Setter => {
                    let value = inv.arguments()[0].clone();
                    *label.lock().unwrap() = value.clone();
                    for handler in handlers.lock().unwrap().iter() {
                        handler.call(&[value.clone()]);
                    }
                }
                AccessorKind::Adder => {
                    if let Some(Value::Handler(h)) = inv.argument(0) {
                        handlers.lock().unwrap().push(h.clone());
                    }
                }
                AccessorKind::Remover => {
                    if let Some(Value::Handler(h)) = inv.argument(0) {
                        handlers.lock().unwrap().retain(|x| x != h);
                    }
                }
                AccessorKind::Method => return Err(CallError::raised("no methods")),
            }
            Ok(())
        })
    };
    let object = proxy.instantiate(vec![], None, vec![backing]).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let seen = Arc::clone(&seen);
        Handler::new(move |args| {
            seen.lock().unwrap().extend(args.iter().cloned());
            Value::Unit
        })
    };

    object.add_handler("changed", watcher.clone()).unwrap();
    object.set("label", Value::str("first")).unwrap();
    object.remove_handler("changed", watcher).unwrap();
    object.set("label", Value::str("second")).unwrap();

    assert_eq!(object.get("label"), Ok(Value::str("second")));
    assert_eq!(*seen.lock().unwrap(), vec![Value::str("first")]);
    assert_eq!(
        object.set("label", Value::Int(3)),
        Err(CallError::ArgumentType {
            member: "Observable.label".to_owned(),
            index: 0,
            expected: ValueType::Str,
            found: ValueType::Int,
        })
    );
}

#[test]
fn unknown_members_are_reported() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));
    let proxy = builder
        .get_or_create(None, &[s.greeter], &GenerationOptions::default())
        .unwrap();
    let object = proxy.instantiate(vec![], None, vec![]).unwrap();

    assert_eq!(
        object.call("farewell", vec![]),
        Err(CallError::UnknownMember {
            member: "farewell".to_owned(),
            kind: "method",
        })
    );
    // `greet` exists, but not as a property.
    assert!(matches!(
        object.get("greet"),
        Err(CallError::UnknownMember { kind: "getter", .. })
    ));
}

#[test]
fn same_shape_is_generated_once() {
    let s = shapes();
    let cache = Arc::new(SharedProxyCache::new());
    let builder = ProxyBuilder::new(Arc::clone(&s.registry)).with_cache(cache.clone());
    let options = GenerationOptions::default();

    let a = builder
        .get_or_create(Some(s.server), &[s.greeter, s.observable], &options)
        .unwrap();
    let b = builder
        .get_or_create(Some(s.server), &[s.observable, s.greeter, s.greeter], &options)
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.stats().generations(), 1);

    // A different filter is a different shape.
    let c = builder
        .get_or_create(
            Some(s.server),
            &[s.greeter, s.observable],
            &GenerationOptions::default().with_filter(RejectAll),
        )
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(cache.stats().generations(), 2);
}

#[test]
fn concurrent_builders_share_one_generation() {
    const THREADS: usize = 16;

    let s = shapes();
    let cache = Arc::new(SharedProxyCache::new());
    let builder = ProxyBuilder::new(Arc::clone(&s.registry)).with_cache(cache.clone());
    let options = GenerationOptions::default();
    let barrier = Barrier::new(THREADS);

    let proxies: Vec<Arc<Proxy>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    builder
                        .get_or_create(Some(s.server), &[s.greeter], &options)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.stats().generations(), 1);
    assert!(proxies.iter().all(|p| Arc::ptr_eq(p, &proxies[0])));
}

#[test]
fn noop_cache_regenerates_every_time() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry)).with_cache(Arc::new(NoopProxyCache));
    let options = GenerationOptions::default();

    let a = builder.get_or_create(None, &[s.greeter], &options).unwrap();
    let b = builder.get_or_create(None, &[s.greeter], &options).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.name(), b.name());
    assert_eq!(a.key(), b.key());
}

#[test]
fn invalid_templates_are_not_cached() {
    let mut registry = TypeRegistry::new();
    let sealed = registry.declare_class("Final").sealed().finish().unwrap();
    let cache = Arc::new(SharedProxyCache::new());
    let builder = ProxyBuilder::new(Arc::new(registry)).with_cache(cache.clone());
    let options = GenerationOptions::default();

    for _ in 0..2 {
        let err = builder.get_or_create(Some(sealed), &[], &options).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidTemplate { .. }), "{err}");
    }
    assert!(cache.is_empty());
    assert_eq!(cache.stats().failures(), 2);
}

/// Answers every request with one fixed proxy.
struct Stale(Arc<Proxy>);

impl ProxyCache for Stale {
    fn contains(&self, _: &ProxyKey) -> bool {
        true
    }

    fn get_or_create(
        &self,
        _: &ProxyKey,
        _: &mut veneer_proxy::cache::Generate<'_>,
    ) -> Result<Arc<Proxy>, ProxyError> {
        Ok(Arc::clone(&self.0))
    }

    fn store(&self, _: ProxyKey, _: Arc<Proxy>) {}
}

#[test]
fn mismatched_cache_entry_is_a_collision() {
    let s = shapes();
    let options = GenerationOptions::default();
    let greeter_proxy = ProxyBuilder::new(Arc::clone(&s.registry))
        .get_or_create(None, &[s.greeter], &options)
        .unwrap();

    let builder =
        ProxyBuilder::new(Arc::clone(&s.registry)).with_cache(Arc::new(Stale(greeter_proxy)));
    let err = builder
        .get_or_create(None, &[s.observable], &options)
        .unwrap_err();
    assert!(matches!(err, ProxyError::CacheKeyCollision { .. }), "{err}");
}

#[test]
fn builders_over_different_registries_share_a_cache_safely() {
    let mut first = TypeRegistry::new();
    let greeter = first
        .declare_interface("Greeter")
        .method("greet", &[("name", ValueType::Str)], ValueType::Str, Modifiers::empty())
        .finish()
        .unwrap();
    let mut second = TypeRegistry::new();
    let counter = second
        .declare_interface("Counter")
        .method("count", &[], ValueType::Int, Modifiers::empty())
        .finish()
        .unwrap();
    assert_eq!(greeter, counter, "both registries hand out the same first id");

    let cache = Arc::new(SharedProxyCache::new());
    let options = GenerationOptions::default();
    let a = ProxyBuilder::new(Arc::new(first)).with_cache(cache.clone());
    let b = ProxyBuilder::new(Arc::new(second)).with_cache(cache.clone());

    let greeter_proxy = a.get_or_create(None, &[greeter], &options).unwrap();
    let counter_proxy = b.get_or_create(None, &[counter], &options).unwrap();
    assert!(!Arc::ptr_eq(&greeter_proxy, &counter_proxy));
    assert_ne!(greeter_proxy.key(), counter_proxy.key());
    assert_eq!(cache.stats().generations(), 2);
    assert_eq!(cache.len(), 2);

    let answer = interceptor_fn(|inv| {
        inv.set_return_value(Value::Int(3));
        Ok(())
    });
    let object = counter_proxy.instantiate(vec![], None, vec![answer]).unwrap();
    assert_eq!(object.call("count", vec![]), Ok(Value::Int(3)));

    // Repeating a request still hits its own registry's entry.
    let again = b.get_or_create(None, &[counter], &options).unwrap();
    assert!(Arc::ptr_eq(&again, &counter_proxy));
}

/// Answers every call with an integer, whatever the declared return type.
struct Sloppy;

impl Target for Sloppy {
    fn invoke(&self, _: &MethodDesc, _: &[Value]) -> Result<Value, CallError> {
        Ok(Value::Int(7))
    }
}

#[test]
fn target_results_are_checked_whether_intercepted_or_not() {
    let s = shapes();
    let builder = ProxyBuilder::new(Arc::clone(&s.registry));

    for options in [
        GenerationOptions::default().with_filter(AcceptAll),
        GenerationOptions::default().with_filter(RejectAll),
    ] {
        let proxy = builder.get_or_create(None, &[s.greeter], &options).unwrap();
        let object = proxy
            .instantiate(vec![], Some(Arc::new(Sloppy)), vec![])
            .unwrap();
        assert_eq!(
            object.call("greet", vec![Value::str("world")]),
            Err(CallError::ReturnType {
                member: "Greeter.greet".to_owned(),
                expected: ValueType::Str,
                found: ValueType::Int,
            })
        );
    }
}

#[test]
fn base_class_interfaces_are_implemented_by_the_proxy() {
    let mut registry = TypeRegistry::new();
    let named = registry
        .declare_interface("Named")
        .property("name", ValueType::Str, PropertyAccess::ReadOnly, Modifiers::empty())
        .finish()
        .unwrap();
    let widget = registry
        .declare_class("Widget")
        .implements(named)
        .method("draw", &[], ValueType::Unit, Modifiers::VIRTUAL)
        .finish()
        .unwrap();
    let builder = ProxyBuilder::new(Arc::new(registry));
    let options = GenerationOptions::default();

    let proxy = builder.get_or_create(Some(widget), &[], &options).unwrap();
    assert_eq!(proxy.generated_type().interfaces(), &[named]);
    assert_eq!(proxy.properties().len(), 1);

    // Spelling the interface out names the same shape.
    let spelled = builder.get_or_create(Some(widget), &[named], &options).unwrap();
    assert!(Arc::ptr_eq(&proxy, &spelled));
}
