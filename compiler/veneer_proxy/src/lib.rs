//! Runtime proxy generation for Veneer.
//!
//! Given a base class and/or a set of interfaces declared in a
//! [`veneer_ir::TypeRegistry`], this crate generates a proxy type whose
//! interceptable members route every call through a chain of interceptors
//! before (optionally) reaching a target object.
//!
//! # Architecture
//!
//! - **Template** (`template`): immutable snapshot of the requested shape and
//!   its fixed-order member traversal
//! - **Filter** (`filter`): per-member decision whether to intercept
//! - **Invocation** (`invocation`): invocation types built per accessor, and
//!   the `Invocation` call context interceptors work with
//! - **Backend** (`backend`): emission primitives behind the `TypeBackend`
//!   trait, plus the in-process `DynamicBackend`
//! - **Generator** (`generator`): drives a backend over a template
//! - **Cache** (`cache`): structural keys and single-flight proxy caching
//! - **Builder** (`builder`): host entry point tying the pieces together
//!
//! # Debugging
//!
//! Enable tracing with environment variables:
//! - `RUST_LOG=veneer_proxy=debug` - generation and cache activity
//! - `RUST_LOG=veneer_proxy=trace` - every interception decision

pub mod backend;
pub mod cache;
pub mod filter;
pub mod generator;
pub mod invocation;
pub mod template;

mod builder;
mod error;
mod options;
mod proxy;

pub use backend::{CustomAttribute, DynamicBackend, DynamicType, GeneratedType, Slot, TypeBackend};
pub use builder::ProxyBuilder;
pub use cache::{CacheStats, NoopProxyCache, ProxyCache, ProxyKey, SharedProxyCache};
pub use error::{CallError, ProxyError};
pub use filter::{
    AcceptAll, DefaultFilter, InterceptionFilter, PredicateFilter, RejectAll, SharedFilter,
};
pub use generator::ProxyGenerator;
pub use invocation::{
    interceptor_fn, InterceptedMember, Interceptor, Invocation, InvocationType,
    InvocationTypeFactory, SharedInterceptor, SharedTarget, Target,
};
pub use options::GenerationOptions;
pub use proxy::{Proxy, ProxyObject};
pub use template::{Member, ProxyTemplate, TemplateBuilder, TemplateParts};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=veneer_proxy=debug` or `RUST_LOG=veneer_proxy=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
