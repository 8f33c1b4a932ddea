//! Typed records for the discovered declaration kinds.
//!
//! Requirement edges live in two identity spaces: `TypeKey` (a canonical
//! type string, satisfied by whichever producer resolution selects) and
//! `NodeKey` (a fully-qualified function name, the target of a
//! `require=` edge or a user pick). The two are kept as distinct
//! variants of [`Key`] and never concatenated.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use convert_case::{Case, Casing};
use sha2::{Digest, Sha256};
use weft_model::{Param, Pos, TypeParam, TypeRef};

use crate::directive::{ApiPattern, Label};

/// Canonical type key, the string form of a [`TypeRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub String);

impl TypeKey {
    pub fn of(ty: &TypeRef) -> Self {
        TypeKey(ty.key())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified function name: `pkg.Func` or `pkg.Recv.Method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub String);

impl NodeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A requirement edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Type(TypeKey),
    Node(NodeKey),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(k) => k.fmt(f),
            Key::Node(k) => k.fmt(f),
        }
    }
}

/// Common contract of every discovered node.
pub trait GraphNode {
    fn pos(&self) -> &Pos;
    fn key(&self) -> &NodeKey;
    /// The type this node produces; consumers produce nothing.
    fn provides(&self) -> Option<TypeKey>;
    fn requires(&self) -> Vec<Key>;
}

/// A constructor function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub key: NodeKey,
    pub pkg: String,
    pub func: String,
    pub pos: Pos,
    pub provides: TypeRef,
    /// Ordered parameter types.
    pub params: Vec<TypeRef>,
    pub weak: bool,
    pub multi: bool,
    /// Resolved `require=` targets (same package).
    pub require: Vec<NodeKey>,
    /// Non-empty for generic templates.
    pub type_params: Vec<TypeParam>,
    /// Concrete arguments of an instantiated generic provider.
    pub type_args: Vec<TypeRef>,
}

impl Provider {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Create the concrete provider for one type-argument vector. The
    /// function reference is shared; the template itself is never
    /// mutated.
    pub fn instantiate(&self, args: &[TypeRef]) -> Provider {
        let map: HashMap<String, TypeRef> = self
            .type_params
            .iter()
            .zip(args)
            .map(|(p, a)| (p.name.clone(), a.clone()))
            .collect();
        Provider {
            key: self.key.clone(),
            pkg: self.pkg.clone(),
            func: self.func.clone(),
            pos: self.pos.clone(),
            provides: self.provides.substitute(&map),
            params: self.params.iter().map(|p| p.substitute(&map)).collect(),
            weak: self.weak,
            multi: self.multi,
            require: self.require.clone(),
            type_params: Vec::new(),
            type_args: args.to_vec(),
        }
    }
}

impl GraphNode for Provider {
    fn pos(&self) -> &Pos {
        &self.pos
    }

    fn key(&self) -> &NodeKey {
        &self.key
    }

    fn provides(&self) -> Option<TypeKey> {
        Some(TypeKey::of(&self.provides))
    }

    fn requires(&self) -> Vec<Key> {
        let mut out: Vec<Key> = self
            .params
            .iter()
            .map(|p| Key::Type(TypeKey::of(p)))
            .collect();
        out.extend(self.require.iter().cloned().map(Key::Node));
        out
    }
}

/// A typed configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub key: NodeKey,
    pub ty: TypeRef,
    pub pos: Pos,
    pub prefix: Option<String>,
    /// Non-empty for generic templates.
    pub type_params: Vec<TypeParam>,
    /// Concrete arguments of an instantiated generic config.
    pub type_args: Vec<TypeRef>,
}

impl Config {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Concrete config for one type-argument vector.
    pub fn instantiate(&self, args: &[TypeRef]) -> Config {
        let map: HashMap<String, TypeRef> = self
            .type_params
            .iter()
            .zip(args)
            .map(|(p, a)| (p.name.clone(), a.clone()))
            .collect();
        Config {
            key: self.key.clone(),
            ty: self.ty.substitute(&map),
            pos: self.pos.clone(),
            prefix: self.prefix.clone(),
            type_params: Vec::new(),
            type_args: args.to_vec(),
        }
    }

    /// Stable field name under which the merged configuration record
    /// embeds this config. Derived from a hash of the type key so that
    /// distinct configs can never collide.
    pub fn field_name(&self) -> String {
        let digest = Sha256::digest(self.ty.value_form().key().as_bytes());
        format!("cfg{}", hex::encode(&digest[..4]))
    }

    /// The embedding prefix with `${type}` replaced by the kebab-case
    /// name of the first type argument.
    pub fn resolved_prefix(&self) -> Option<String> {
        let prefix = self.prefix.as_ref()?;
        if !prefix.contains("${type}") {
            return Some(prefix.clone());
        }
        let arg_name = match self.type_args.first() {
            Some(TypeRef::Named { name, .. }) => name.to_case(Case::Kebab),
            _ => String::new(),
        };
        Some(prefix.replace("${type}", &arg_name))
    }
}

impl GraphNode for Config {
    fn pos(&self) -> &Pos {
        &self.pos
    }

    fn key(&self) -> &NodeKey {
        &self.key
    }

    fn provides(&self) -> Option<TypeKey> {
        Some(TypeKey::of(&self.ty))
    }

    fn requires(&self) -> Vec<Key> {
        Vec::new()
    }
}

/// Categorized parameter of an API handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiParam {
    /// `context.Context`, injected by the mux shim.
    Context,
    /// The raw response writer.
    ResponseWriter,
    /// The raw request pointer.
    Request,
    /// A raw body reader.
    BodyReader,
    /// Bound to the path wildcard of the same name.
    Wildcard { name: String, ty: TypeRef },
    /// Request body for write methods, query parameters otherwise.
    Payload { ty: TypeRef },
}

/// Result shape of an API handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult {
    Empty,
    Error,
    Value(TypeRef),
    ValueError(TypeRef),
}

/// An HTTP endpoint method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Api {
    pub key: NodeKey,
    pub pos: Pos,
    pub receiver: TypeRef,
    pub method_name: String,
    pub pattern: ApiPattern,
    pub labels: Vec<Label>,
    pub params: Vec<ApiParam>,
    pub result: ApiResult,
    /// Documentation comment, directives stripped.
    pub doc: String,
}

impl GraphNode for Api {
    fn pos(&self) -> &Pos {
        &self.pos
    }

    fn key(&self) -> &NodeKey {
        &self.key
    }

    fn provides(&self) -> Option<TypeKey> {
        None
    }

    fn requires(&self) -> Vec<Key> {
        vec![Key::Type(TypeKey::of(&self.receiver))]
    }
}

/// A periodic job method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cron {
    pub key: NodeKey,
    pub pos: Pos,
    pub receiver: TypeRef,
    pub method_name: String,
    pub schedule: Duration,
    pub raw_schedule: String,
}

impl GraphNode for Cron {
    fn pos(&self) -> &Pos {
        &self.pos
    }

    fn key(&self) -> &NodeKey {
        &self.key
    }

    fn provides(&self) -> Option<TypeKey> {
        None
    }

    fn requires(&self) -> Vec<Key> {
        vec![Key::Type(TypeKey::of(&self.receiver))]
    }
}

/// An event-handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub key: NodeKey,
    pub pos: Pos,
    pub receiver: TypeRef,
    pub method_name: String,
    /// The event payload type extracted from the handler signature.
    pub event: TypeRef,
}

impl GraphNode for Subscription {
    fn pos(&self) -> &Pos {
        &self.pos
    }

    fn key(&self) -> &NodeKey {
        &self.key
    }

    fn provides(&self) -> Option<TypeKey> {
        None
    }

    fn requires(&self) -> Vec<Key> {
        vec![Key::Type(TypeKey::of(&self.receiver))]
    }
}

/// An HTTP middleware function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Middleware {
    pub key: NodeKey,
    pub pos: Pos,
    pub func: String,
    pub labels: Vec<String>,
    /// True for the factory forms; false for `(Handler) Handler`.
    pub factory: bool,
    /// Constructor dependencies, label-bound scalars excluded.
    pub deps: Vec<TypeRef>,
    /// Scalar parameters bound to label values.
    pub label_params: Vec<Param>,
}

impl GraphNode for Middleware {
    fn pos(&self) -> &Pos {
        &self.pos
    }

    fn key(&self) -> &NodeKey {
        &self.key
    }

    fn provides(&self) -> Option<TypeKey> {
        None
    }

    fn requires(&self) -> Vec<Key> {
        self.deps
            .iter()
            .map(|d| Key::Type(TypeKey::of(d)))
            .collect()
    }
}

/// Tagged union over every node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Provider(Provider),
    Config(Config),
    Api(Api),
    Cron(Cron),
    Subscription(Subscription),
    Middleware(Middleware),
}

impl Node {
    pub fn as_graph_node(&self) -> &dyn GraphNode {
        match self {
            Node::Provider(n) => n,
            Node::Config(n) => n,
            Node::Api(n) => n,
            Node::Cron(n) => n,
            Node::Subscription(n) => n,
            Node::Middleware(n) => n,
        }
    }
}

impl GraphNode for Node {
    fn pos(&self) -> &Pos {
        self.as_graph_node().pos()
    }

    fn key(&self) -> &NodeKey {
        self.as_graph_node().key()
    }

    fn provides(&self) -> Option<TypeKey> {
        self.as_graph_node().provides()
    }

    fn requires(&self) -> Vec<Key> {
        self.as_graph_node().requires()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(provides: TypeRef, params: Vec<TypeRef>) -> Provider {
        Provider {
            key: NodeKey("app.New".into()),
            pkg: "app".into(),
            func: "New".into(),
            pos: Pos::default(),
            provides,
            params,
            weak: false,
            multi: false,
            require: vec![NodeKey("app.Other".into())],
            type_params: Vec::new(),
            type_args: Vec::new(),
        }
    }

    #[test]
    fn test_provider_requires_spans_both_spaces() {
        let p = provider(
            TypeRef::ptr("app", "DB"),
            vec![TypeRef::ptr("app", "Cfg")],
        );
        let requires = p.requires();
        assert_eq!(requires.len(), 2);
        assert_eq!(requires[0], Key::Type(TypeKey("*app.Cfg".into())));
        assert_eq!(requires[1], Key::Node(NodeKey("app.Other".into())));
    }

    #[test]
    fn test_generic_instantiation_substitutes_params() {
        let template = Provider {
            type_params: vec![TypeParam::unconstrained("T")],
            provides: TypeRef::Named {
                pkg: "rt".into(),
                name: "Topic".into(),
                pointer: true,
                args: vec![TypeRef::builtin("T")],
            },
            params: vec![TypeRef::generic("app", "Codec", vec![TypeRef::builtin("T")])],
            ..provider(TypeRef::named("rt", "Topic"), vec![])
        };
        let concrete = template.instantiate(&[TypeRef::named("app", "User")]);
        assert_eq!(concrete.provides.key(), "*rt.Topic[app.User]");
        assert_eq!(concrete.params[0].key(), "app.Codec[app.User]");
        assert!(!concrete.is_generic());
        assert_eq!(concrete.type_args.len(), 1);
        assert_eq!(concrete.key, template.key);
    }

    #[test]
    fn test_config_field_name_is_stable_and_distinct() {
        let a = Config {
            key: NodeKey("app.Cfg".into()),
            ty: TypeRef::named("app", "Cfg"),
            pos: Pos::default(),
            prefix: None,
            type_params: Vec::new(),
            type_args: Vec::new(),
        };
        let b = Config {
            ty: TypeRef::named("app", "Other"),
            ..a.clone()
        };
        assert_eq!(a.field_name(), a.field_name());
        assert_ne!(a.field_name(), b.field_name());
        // Pointer and value forms embed the same record.
        let ptr = Config {
            ty: TypeRef::ptr("app", "Cfg"),
            ..a.clone()
        };
        assert_eq!(a.field_name(), ptr.field_name());
    }

    #[test]
    fn test_config_prefix_substitution() {
        let cfg = Config {
            key: NodeKey("app.Store".into()),
            ty: TypeRef::generic("app", "Store", vec![TypeRef::named("app", "UserProfile")]),
            pos: Pos::default(),
            prefix: Some("store_${type}_".into()),
            type_params: Vec::new(),
            type_args: vec![TypeRef::named("app", "UserProfile")],
        };
        assert_eq!(cfg.resolved_prefix().as_deref(), Some("store_user-profile_"));

        let plain = Config {
            prefix: Some("db".into()),
            ..cfg
        };
        assert_eq!(plain.resolved_prefix().as_deref(), Some("db"));
    }
}
