#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
//! Class-diagram graphs for OpenAPI schemas.
//!
//! The crate consumes a fully resolved OpenAPI document (every `$ref` replaced by the node it points to,
//! recursive schemas materialized as id cycles) and produces, for one operation element at a time, a graph
//! of classes, properties and relations that a renderer can lay out as a class diagram.
//!
//! ```no_run
//! use oas3_diagram::{DiagramScope, normalize, transform};
//!
//! # fn example(spec: &oas3::Spec) {
//! let normalized = normalize(spec);
//! let scope = DiagramScope::response("/pets", &http::Method::GET, "200", "application/json");
//! let graph = transform(&normalized.document, &scope);
//! println!("{} classes, {} relations", graph.classes.len(), graph.relations.len());
//! # }
//! ```

pub mod document;
pub mod graph;
pub mod operations;
pub mod walker;

pub use document::{
  CombinerKind, DocumentBuilder, JsonType, ResolvedDocument, ResolvedSchema, SchemaId, SchemaMeta,
  normalize::{NormalizeWarning, Normalized, normalize, normalize_value},
  path::DeclarationPath,
};
pub use graph::{
  ClassMember, PropertyGroup, SchemaClass, SchemaGraphContent, SchemaProperty, SchemaRelation,
  builder::GraphBuilder,
  transformer::{DiagramScope, transform},
};
pub use operations::{DerivedSchema, OperationData, SchemaCard, collect_operation_data};
pub use walker::{DocumentVisitor, DocumentWalker, SchemaVisit, Walk};

#[cfg(test)]
mod tests;
