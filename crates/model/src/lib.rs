//! Read-only model of the host type system as produced by an external
//! package loader.
//!
//! The wiring generator never inspects source text itself; a loader walks
//! the user's packages and materializes them as [`Package`] values inside a
//! [`Workspace`]. Everything in this crate is immutable once built;
//! discovery and resolution only ever read from it.

pub mod builder;
pub mod decl;
pub mod typeref;

pub use builder::{FuncBuilder, PackageBuilder, TypeBuilder};
pub use decl::{FuncDecl, Package, Param, Pos, TypeDecl, TypeKind, TypeParam, Workspace};
pub use typeref::{satisfies, KeyParseError, TypeRef};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
