use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::typeref::TypeRef;

/// Position of a declaration in its source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A named function or method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A type parameter on a generic declaration, with its optional
/// constraint interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeRef>,
}

impl TypeParam {
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn constrained(name: impl Into<String>, constraint: TypeRef) -> Self {
        Self {
            name: name.into(),
            constraint: Some(constraint),
        }
    }
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub pos: Pos,
    /// Attached comment lines, directives included, in source order.
    pub doc: Vec<String>,
    pub receiver: Option<TypeRef>,
    pub params: Vec<Param>,
    pub results: Vec<TypeRef>,
    pub type_params: Vec<TypeParam>,
}

impl FuncDecl {
    /// Fully-qualified name within `pkg`: `pkg.Func` for free functions,
    /// `pkg.Recv.Method` for methods.
    pub fn qualified_name(&self, pkg: &str) -> String {
        match &self.receiver {
            Some(recv) => {
                let recv_name = match recv {
                    TypeRef::Named { name, .. } => name.clone(),
                    other => other.key(),
                };
                format!("{pkg}.{recv_name}.{}", self.name)
            }
            None => format!("{pkg}.{}", self.name),
        }
    }
}

/// Kind of a named type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Struct,
    Interface,
}

/// A named type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub pos: Pos,
    pub doc: Vec<String>,
    pub kind: TypeKind,
    pub type_params: Vec<TypeParam>,
    /// Interfaces this type is known to implement, as reported by the
    /// loader's implementation check.
    pub implements: Vec<TypeRef>,
}

/// A loaded package: path, short name and its declarations in source
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub funcs: Vec<FuncDecl>,
    pub types: Vec<TypeDecl>,
}

/// Everything the loader produced: the packages under analysis plus the
/// framework runtime package. Lookup surfaces are read-only.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    packages: Vec<Package>,
    // (pkg path, type name) -> index into packages/types
    type_index: HashMap<(String, String), (usize, usize)>,
}

impl Workspace {
    pub fn new(packages: Vec<Package>) -> Self {
        let mut type_index = HashMap::new();
        for (pi, pkg) in packages.iter().enumerate() {
            for (ti, ty) in pkg.types.iter().enumerate() {
                type_index.insert((pkg.path.clone(), ty.name.clone()), (pi, ti));
            }
        }
        Self {
            packages,
            type_index,
        }
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Find a named type declaration; pointers and type arguments on the
    /// reference are ignored.
    pub fn lookup_type(&self, ty: &TypeRef) -> Option<&TypeDecl> {
        match ty {
            TypeRef::Named { pkg, name, .. } => {
                let (pi, ti) = self.type_index.get(&(pkg.clone(), name.clone()))?;
                Some(&self.packages[*pi].types[*ti])
            }
            TypeRef::Fn { .. } => None,
        }
    }

    /// Find a function by its fully-qualified name (`pkg.Func` or
    /// `pkg.Recv.Method`).
    pub fn lookup_func(&self, qualified: &str) -> Option<(&Package, &FuncDecl)> {
        self.packages.iter().find_map(|pkg| {
            pkg.funcs
                .iter()
                .find(|f| f.qualified_name(&pkg.path) == qualified)
                .map(|f| (pkg, f))
        })
    }

    /// Loader-backed implementation test: does `ty` implement the
    /// interface `iface`? The empty `any` constraint is satisfied by
    /// every type. Pointer markers are ignored on both sides.
    pub fn implements(&self, ty: &TypeRef, iface: &TypeRef) -> bool {
        if iface.is_builtin("any") {
            return true;
        }
        let want = iface.value_form().key();
        match self.lookup_type(ty) {
            Some(decl) => decl
                .implements
                .iter()
                .any(|i| i.value_form().key() == want),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{PackageBuilder, TypeBuilder};

    #[test]
    fn test_qualified_names() {
        let free = FuncDecl {
            name: "NewDB".into(),
            pos: Pos::default(),
            doc: vec![],
            receiver: None,
            params: vec![],
            results: vec![],
            type_params: vec![],
        };
        assert_eq!(free.qualified_name("app/db"), "app/db.NewDB");

        let method = FuncDecl {
            receiver: Some(TypeRef::ptr("app/db", "Store")),
            name: "List".into(),
            ..free
        };
        assert_eq!(method.qualified_name("app/db"), "app/db.Store.List");
    }

    #[test]
    fn test_implements_oracle() {
        let pkg = PackageBuilder::new("app", "app")
            .ty(TypeBuilder::strukt("User").implements(TypeRef::named("app", "Evt")))
            .ty(TypeBuilder::interface("Evt"))
            .build();
        let ws = Workspace::new(vec![pkg]);

        let user = TypeRef::named("app", "User");
        assert!(ws.implements(&user, &TypeRef::named("app", "Evt")));
        assert!(ws.implements(&TypeRef::ptr("app", "User"), &TypeRef::named("app", "Evt")));
        assert!(!ws.implements(&user, &TypeRef::named("app", "Other")));
        assert!(ws.implements(&user, &TypeRef::builtin("any")));
        assert!(!ws.implements(&TypeRef::named("app", "Ghost"), &TypeRef::named("app", "Evt")));
    }
}
