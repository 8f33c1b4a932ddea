use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::decl::{TypeParam, Workspace};

/// Reference to a host type.
///
/// A `TypeRef` is the identity currency of the whole generator: two
/// references denote the same type iff their canonical [`key`](TypeRef::key)
/// strings are equal. Named references carry the fully-qualified package
/// path, an optional pointer marker and the ordered type arguments of a
/// generic instantiation. Function-shaped references only occur in
/// signatures (middleware factories return them); they never act as
/// provider keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named {
        /// Fully-qualified package path; empty for builtins.
        pkg: String,
        name: String,
        pointer: bool,
        args: Vec<TypeRef>,
    },
    Fn {
        params: Vec<TypeRef>,
        results: Vec<TypeRef>,
    },
}

/// Builtin scalar names that may bind to path wildcards and middleware
/// labels.
const SCALAR_NAMES: &[&str] = &[
    "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
    "uint64",
];

impl TypeRef {
    /// A named, non-pointer, non-generic type.
    pub fn named(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Named {
            pkg: pkg.into(),
            name: name.into(),
            pointer: false,
            args: Vec::new(),
        }
    }

    /// A pointer to a named type.
    pub fn ptr(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Named {
            pkg: pkg.into(),
            name: name.into(),
            pointer: true,
            args: Vec::new(),
        }
    }

    /// A builtin type such as `string` or `error`.
    pub fn builtin(name: impl Into<String>) -> Self {
        TypeRef::named("", name)
    }

    /// An instantiated generic type.
    pub fn generic(
        pkg: impl Into<String>,
        name: impl Into<String>,
        args: Vec<TypeRef>,
    ) -> Self {
        TypeRef::Named {
            pkg: pkg.into(),
            name: name.into(),
            pointer: false,
            args,
        }
    }

    /// A function-shaped type.
    pub fn func(params: Vec<TypeRef>, results: Vec<TypeRef>) -> Self {
        TypeRef::Fn { params, results }
    }

    /// Canonical string key: `*` prefix for pointers, `pkg.Name`, and
    /// `[a, b]` for generic instances. Builtins are bare names.
    pub fn key(&self) -> String {
        match self {
            TypeRef::Named {
                pkg,
                name,
                pointer,
                args,
            } => {
                let mut out = String::new();
                if *pointer {
                    out.push('*');
                }
                if !pkg.is_empty() {
                    out.push_str(pkg);
                    out.push('.');
                }
                out.push_str(name);
                if !args.is_empty() {
                    out.push('[');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&arg.key());
                    }
                    out.push(']');
                }
                out
            }
            TypeRef::Fn { params, results } => {
                let join = |refs: &[TypeRef]| {
                    refs.iter().map(TypeRef::key).collect::<Vec<_>>().join(", ")
                };
                match results.len() {
                    0 => format!("func({})", join(params)),
                    1 => format!("func({}) {}", join(params), results[0].key()),
                    _ => format!("func({}) ({})", join(params), join(results)),
                }
            }
        }
    }

    /// Like [`key`](TypeRef::key) but without the type-argument suffix and
    /// pointer marker. Generic provider templates are indexed under this.
    pub fn base_name(&self) -> String {
        match self {
            TypeRef::Named { pkg, name, .. } => {
                if pkg.is_empty() {
                    name.clone()
                } else {
                    format!("{pkg}.{name}")
                }
            }
            TypeRef::Fn { .. } => self.key(),
        }
    }

    /// Ordered type arguments of a generic instance; empty otherwise.
    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named { args, .. } => args,
            TypeRef::Fn { .. } => &[],
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeRef::Named { pointer: true, .. })
    }

    /// The same reference with the pointer marker removed.
    pub fn value_form(&self) -> TypeRef {
        match self {
            TypeRef::Named {
                pkg, name, args, ..
            } => TypeRef::Named {
                pkg: pkg.clone(),
                name: name.clone(),
                pointer: false,
                args: args.clone(),
            },
            other => other.clone(),
        }
    }

    /// The same reference with the pointer marker set.
    pub fn pointer_form(&self) -> TypeRef {
        match self {
            TypeRef::Named {
                pkg, name, args, ..
            } => TypeRef::Named {
                pkg: pkg.clone(),
                name: name.clone(),
                pointer: true,
                args: args.clone(),
            },
            other => other.clone(),
        }
    }

    /// True for a named reference to `pkg.name`, pointer or not, with any
    /// arguments.
    pub fn is_named(&self, want_pkg: &str, want_name: &str) -> bool {
        matches!(self, TypeRef::Named { pkg, name, .. } if pkg == want_pkg && name == want_name)
    }

    /// True for the builtin of the given name.
    pub fn is_builtin(&self, want: &str) -> bool {
        self.is_named("", want)
    }

    /// String or sized integer, the only types that may bind to a path
    /// wildcard or a middleware label.
    pub fn is_scalar_binding(&self) -> bool {
        matches!(self, TypeRef::Named { pkg, name, pointer: false, args }
            if pkg.is_empty() && args.is_empty() && SCALAR_NAMES.contains(&name.as_str()))
    }

    /// Replace type-parameter placeholders (bare named references whose
    /// name appears in `map`) with concrete references. Used when a
    /// generic provider template is instantiated.
    pub fn substitute(&self, map: &HashMap<String, TypeRef>) -> TypeRef {
        match self {
            TypeRef::Named {
                pkg,
                name,
                pointer,
                args,
            } => {
                if pkg.is_empty() && args.is_empty() {
                    if let Some(concrete) = map.get(name) {
                        return if *pointer {
                            concrete.pointer_form()
                        } else {
                            concrete.clone()
                        };
                    }
                }
                TypeRef::Named {
                    pkg: pkg.clone(),
                    name: name.clone(),
                    pointer: *pointer,
                    args: args.iter().map(|a| a.substitute(map)).collect(),
                }
            }
            TypeRef::Fn { params, results } => TypeRef::Fn {
                params: params.iter().map(|p| p.substitute(map)).collect(),
                results: results.iter().map(|r| r.substitute(map)).collect(),
            },
        }
    }

    /// Parse a canonical key back into a reference. This is the inverse of
    /// [`key`](TypeRef::key) for named types and is used for user-supplied
    /// roots; function-shaped keys are rejected.
    pub fn parse(input: &str) -> Result<TypeRef, KeyParseError> {
        let mut parser = KeyParser {
            input,
            rest: input.trim(),
        };
        let ty = parser.parse_ref()?;
        if !parser.rest.is_empty() {
            return Err(parser.err("trailing characters"));
        }
        Ok(ty)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Error parsing a canonical type key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type key {key:?}: {reason}")]
pub struct KeyParseError {
    pub key: String,
    pub reason: String,
}

struct KeyParser<'a> {
    input: &'a str,
    rest: &'a str,
}

impl<'a> KeyParser<'a> {
    fn err(&self, reason: &str) -> KeyParseError {
        KeyParseError {
            key: self.input.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_ref(&mut self) -> Result<TypeRef, KeyParseError> {
        self.rest = self.rest.trim_start();
        let pointer = if let Some(stripped) = self.rest.strip_prefix('*') {
            self.rest = stripped;
            true
        } else {
            false
        };

        // Qualified name runs up to `[`, `,` or `]`.
        let end = self
            .rest
            .find(|c| c == '[' || c == ',' || c == ']')
            .unwrap_or(self.rest.len());
        let qualified = self.rest[..end].trim();
        if qualified.is_empty() {
            return Err(self.err("empty type name"));
        }
        if qualified.starts_with("func(") {
            return Err(self.err("function-shaped keys are not addressable"));
        }
        self.rest = &self.rest[end..];

        let (pkg, name) = match qualified.rfind('.') {
            Some(dot) => (&qualified[..dot], &qualified[dot + 1..]),
            None => ("", qualified),
        };
        if name.is_empty() {
            return Err(self.err("empty type name after package path"));
        }

        let mut args = Vec::new();
        if let Some(stripped) = self.rest.strip_prefix('[') {
            self.rest = stripped;
            loop {
                args.push(self.parse_ref()?);
                self.rest = self.rest.trim_start();
                if let Some(stripped) = self.rest.strip_prefix(',') {
                    self.rest = stripped;
                    continue;
                }
                if let Some(stripped) = self.rest.strip_prefix(']') {
                    self.rest = stripped;
                    break;
                }
                return Err(self.err("unterminated type argument list"));
            }
            if args.is_empty() {
                return Err(self.err("empty type argument list"));
            }
        }

        Ok(TypeRef::Named {
            pkg: pkg.to_string(),
            name: name.to_string(),
            pointer,
            args,
        })
    }
}

/// Positional constraint check for a generic instantiation: each argument
/// must satisfy the constraint interface on the corresponding parameter.
/// A parameter without a constraint accepts any type.
pub fn satisfies(ws: &Workspace, args: &[TypeRef], params: &[TypeParam]) -> bool {
    if args.len() != params.len() {
        return false;
    }
    args.iter().zip(params).all(|(arg, param)| {
        param
            .constraint
            .as_ref()
            .map_or(true, |iface| ws.implements(arg, iface))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(TypeRef::builtin("string").key(), "string");
        assert_eq!(TypeRef::named("db/pg", "Conn").key(), "db/pg.Conn");
        assert_eq!(TypeRef::ptr("db/pg", "Conn").key(), "*db/pg.Conn");
        let topic = TypeRef::generic(
            "weft.dev/runtime",
            "Topic",
            vec![TypeRef::named("app", "User")],
        );
        assert_eq!(topic.key(), "weft.dev/runtime.Topic[app.User]");
        assert_eq!(topic.base_name(), "weft.dev/runtime.Topic");
    }

    #[test]
    fn test_fn_key() {
        let handler = TypeRef::named("weft.dev/runtime", "Handler");
        let mw = TypeRef::func(vec![handler.clone()], vec![handler]);
        assert_eq!(
            mw.key(),
            "func(weft.dev/runtime.Handler) weft.dev/runtime.Handler"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        for key in [
            "string",
            "*app.DB",
            "svc/api.Store[app.User, *app.Role]",
            "*svc/api.Cache[pkg.Box[int]]",
        ] {
            let ty = TypeRef::parse(key).unwrap();
            assert_eq!(ty.key(), key);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TypeRef::parse("").is_err());
        assert!(TypeRef::parse("*").is_err());
        assert!(TypeRef::parse("a.B[").is_err());
        assert!(TypeRef::parse("a.B[]").is_err());
        assert!(TypeRef::parse("a.B]x").is_err());
        assert!(TypeRef::parse("func(a.B) a.B").is_err());
    }

    #[test]
    fn test_value_pointer_forms() {
        let ptr = TypeRef::ptr("app", "Cfg");
        assert_eq!(ptr.value_form().key(), "app.Cfg");
        assert_eq!(ptr.value_form().pointer_form(), ptr);
    }

    #[test]
    fn test_substitute() {
        let mut map = HashMap::new();
        map.insert("T".to_string(), TypeRef::named("app", "User"));
        let tmpl = TypeRef::generic("rt", "Topic", vec![TypeRef::builtin("T")]);
        assert_eq!(tmpl.substitute(&map).key(), "rt.Topic[app.User]");
        let ptr_param = TypeRef::ptr("", "T");
        assert_eq!(ptr_param.substitute(&map).key(), "*app.User");
    }

    #[test]
    fn test_scalar_binding() {
        assert!(TypeRef::builtin("string").is_scalar_binding());
        assert!(TypeRef::builtin("uint32").is_scalar_binding());
        assert!(!TypeRef::builtin("bool").is_scalar_binding());
        assert!(!TypeRef::named("app", "ID").is_scalar_binding());
    }
}
