//! Fluent construction API for the type model.
//!
//! A package loader translates the host toolchain's output into
//! [`Package`] values through these builders; the generator's own tests
//! use the same API to assemble hermetic per-test workspaces.

use crate::decl::{FuncDecl, Package, Param, Pos, TypeDecl, TypeKind, TypeParam};
use crate::typeref::TypeRef;

/// Builds a [`Package`], assigning synthetic positions to declarations
/// that were not given one explicitly.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    path: String,
    name: String,
    funcs: Vec<FuncDecl>,
    types: Vec<TypeDecl>,
    next_line: u32,
}

impl PackageBuilder {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            funcs: Vec::new(),
            types: Vec::new(),
            next_line: 1,
        }
    }

    fn place(&mut self, pos: &mut Pos) {
        if pos.file.is_empty() {
            pos.file = format!("{}/{}.src", self.path, self.name);
            pos.line = self.next_line;
            pos.column = 1;
        }
        self.next_line = self.next_line.max(pos.line) + 10;
    }

    pub fn func(mut self, func: FuncBuilder) -> Self {
        let mut decl = func.decl;
        self.place(&mut decl.pos);
        self.funcs.push(decl);
        self
    }

    pub fn ty(mut self, ty: TypeBuilder) -> Self {
        let mut decl = ty.decl;
        self.place(&mut decl.pos);
        self.types.push(decl);
        self
    }

    pub fn build(self) -> Package {
        Package {
            path: self.path,
            name: self.name,
            funcs: self.funcs,
            types: self.types,
        }
    }
}

/// Builds a [`FuncDecl`].
#[derive(Debug, Clone)]
pub struct FuncBuilder {
    decl: FuncDecl,
}

impl FuncBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            decl: FuncDecl {
                name: name.into(),
                pos: Pos::default(),
                doc: Vec::new(),
                receiver: None,
                params: Vec::new(),
                results: Vec::new(),
                type_params: Vec::new(),
            },
        }
    }

    pub fn pos(mut self, file: impl Into<String>, line: u32) -> Self {
        self.decl.pos = Pos::new(file, line, 1);
        self
    }

    /// Attach a comment line (directives included).
    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.decl.doc.push(line.into());
        self
    }

    pub fn receiver(mut self, ty: TypeRef) -> Self {
        self.decl.receiver = Some(ty);
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.decl.params.push(Param::new(name, ty));
        self
    }

    pub fn result(mut self, ty: TypeRef) -> Self {
        self.decl.results.push(ty);
        self
    }

    pub fn type_param(mut self, param: TypeParam) -> Self {
        self.decl.type_params.push(param);
        self
    }
}

/// Builds a [`TypeDecl`].
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    decl: TypeDecl,
}

impl TypeBuilder {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            decl: TypeDecl {
                name: name.into(),
                pos: Pos::default(),
                doc: Vec::new(),
                kind,
                type_params: Vec::new(),
                implements: Vec::new(),
            },
        }
    }

    pub fn strukt(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn pos(mut self, file: impl Into<String>, line: u32) -> Self {
        self.decl.pos = Pos::new(file, line, 1);
        self
    }

    pub fn doc(mut self, line: impl Into<String>) -> Self {
        self.decl.doc.push(line.into());
        self
    }

    pub fn type_param(mut self, param: TypeParam) -> Self {
        self.decl.type_params.push(param);
        self
    }

    pub fn implements(mut self, iface: TypeRef) -> Self {
        self.decl.implements.push(iface);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_positions() {
        let pkg = PackageBuilder::new("app/svc", "svc")
            .func(FuncBuilder::new("NewA"))
            .func(FuncBuilder::new("NewB"))
            .build();
        assert_eq!(pkg.funcs[0].pos.file, "app/svc/svc.src");
        assert_eq!(pkg.funcs[0].pos.line, 1);
        assert!(pkg.funcs[1].pos.line > pkg.funcs[0].pos.line);
    }

    #[test]
    fn test_explicit_position_preserved() {
        let pkg = PackageBuilder::new("app", "app")
            .func(FuncBuilder::new("NewA").pos("app/custom.src", 42))
            .build();
        assert_eq!(pkg.funcs[0].pos.line, 42);
        assert_eq!(pkg.funcs[0].pos.file, "app/custom.src");
    }
}
