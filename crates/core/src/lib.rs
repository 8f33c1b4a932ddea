//! Core of the weft wiring generator: directive parsing, declaration
//! discovery and graph resolution.
//!
//! The pipeline is `Workspace` (from an external package loader, modeled
//! by `weft-model`) -> [`discovery::discover`] -> [`resolver::resolve`]
//! -> [`graph::Graph`], which a code emitter turns into the generated
//! container. [`resolver::analyze`] runs the whole pipeline.

pub mod directive;
pub mod discovery;
pub mod errors;
pub mod graph;
pub mod node;
pub mod resolver;
pub mod wellknown;


pub use directive::{ApiPattern, Directive, DirectiveParser, Label, Segment, DEFAULT_PREFIX};
pub use discovery::{discover, Pool};
pub use errors::Error;
pub use graph::{DependencyReport, Graph, ReportNode};
pub use node::{
    Api, ApiParam, ApiResult, Config, Cron, GraphNode, Key, Middleware, Node, NodeKey, Provider,
    Subscription, TypeKey,
};
pub use resolver::{analyze, resolve, Options};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name used in diagnostics.
pub const TOOL_NAME: &str = "weft";
