//! Well-known names of the framework runtime.
//!
//! The resolver auto-injects roots and picks that refer to the runtime
//! library's server, scheduler and topic types. Those names are fixed
//! here, together with [`runtime_package`], the canonical model of the
//! runtime package a loader (or a test) seeds into the workspace when
//! the framework surface is in play.

use weft_model::{FuncBuilder, Package, PackageBuilder, TypeBuilder, TypeParam, TypeRef};

/// Package path of the framework runtime library.
pub const RUNTIME_PKG: &str = "weft.dev/runtime";

/// Default HTTP server provider, picked automatically when any API is
/// discovered.
pub const SERVER_PROVIDER: &str = "weft.dev/runtime.NewServer";
/// Scheduler provider picked when at least one cron job exists.
pub const SCHEDULER_PROVIDER: &str = "weft.dev/runtime.NewScheduler";
/// No-op scheduler picked when no cron job exists.
pub const NULL_SCHEDULER_PROVIDER: &str = "weft.dev/runtime.NewNullScheduler";

/// `*runtime.Server`, rooted when any API is discovered.
pub fn server_root() -> TypeRef {
    TypeRef::ptr(RUNTIME_PKG, "Server")
}

/// `*runtime.Scheduler`, rooted when any cron job is discovered.
pub fn scheduler_root() -> TypeRef {
    TypeRef::ptr(RUNTIME_PKG, "Scheduler")
}

/// `*runtime.Topic[E]`, rooted for each subscription event type `E`.
pub fn topic_of(event: &TypeRef) -> TypeRef {
    TypeRef::Named {
        pkg: RUNTIME_PKG.to_string(),
        name: "Topic".to_string(),
        pointer: true,
        args: vec![event.clone()],
    }
}

/// `runtime.Event[E]`, the shape of a subscription handler's payload
/// parameter.
pub fn event_base() -> TypeRef {
    TypeRef::named(RUNTIME_PKG, "Event")
}

/// `runtime.Handler`, the HTTP handler interface middleware wraps.
pub fn handler() -> TypeRef {
    TypeRef::named(RUNTIME_PKG, "Handler")
}

/// `runtime.Middleware`, the named alias of `func(Handler) Handler`.
pub fn middleware_alias() -> TypeRef {
    TypeRef::named(RUNTIME_PKG, "Middleware")
}

/// `context.Context`, skipped in handler signatures.
pub fn context() -> TypeRef {
    TypeRef::named("context", "Context")
}

/// `net/http.ResponseWriter`, skipped in handler signatures.
pub fn response_writer() -> TypeRef {
    TypeRef::named("net/http", "ResponseWriter")
}

/// `*net/http.Request`, skipped in handler signatures.
pub fn request() -> TypeRef {
    TypeRef::ptr("net/http", "Request")
}

/// `io.Reader`, the raw-body parameter shape.
pub fn byte_reader() -> TypeRef {
    TypeRef::named("io", "Reader")
}

/// `encoding.TextUnmarshaler`; types implementing it may bind to path
/// wildcards.
pub fn text_unmarshaler() -> TypeRef {
    TypeRef::named("encoding", "TextUnmarshaler")
}

/// The builtin `error` type.
pub fn error_ty() -> TypeRef {
    TypeRef::builtin("error")
}

/// Canonical model of the runtime package. The generic topic provider is
/// weak so that a user-supplied topic provider always takes precedence;
/// the two scheduler providers are disambiguated by the resolver's
/// automatic pick.
pub fn runtime_package() -> Package {
    PackageBuilder::new(RUNTIME_PKG, "runtime")
        .ty(TypeBuilder::strukt("Server"))
        .ty(TypeBuilder::strukt("Scheduler"))
        .ty(TypeBuilder::strukt("Topic").type_param(TypeParam::unconstrained("T")))
        .ty(TypeBuilder::strukt("Event").type_param(TypeParam::unconstrained("T")))
        .ty(TypeBuilder::interface("Handler"))
        .func(
            FuncBuilder::new("NewServer")
                .doc("weft:provider")
                .result(server_root())
                .result(error_ty()),
        )
        .func(
            FuncBuilder::new("NewScheduler")
                .doc("weft:provider")
                .result(scheduler_root()),
        )
        .func(
            FuncBuilder::new("NewNullScheduler")
                .doc("weft:provider")
                .result(scheduler_root()),
        )
        .func(
            FuncBuilder::new("NewTopic")
                .doc("weft:provider weak")
                .type_param(TypeParam::unconstrained("T"))
                .result(TypeRef::Named {
                    pkg: RUNTIME_PKG.to_string(),
                    name: "Topic".to_string(),
                    pointer: true,
                    args: vec![TypeRef::builtin("T")],
                }),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_key_shape() {
        let topic = topic_of(&TypeRef::named("app", "User"));
        assert_eq!(topic.key(), "*weft.dev/runtime.Topic[app.User]");
        assert_eq!(topic.base_name(), "weft.dev/runtime.Topic");
    }

    #[test]
    fn test_runtime_package_providers() {
        let pkg = runtime_package();
        let names: Vec<_> = pkg.funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["NewServer", "NewScheduler", "NewNullScheduler", "NewTopic"]
        );
    }
}
