//! The resolved document consumed by the diagram core.
//!
//! Schemas live in an arena and refer to each other through [`SchemaId`] handles, so a recursive schema is
//! simply an id that appears among its own descendants. Metadata that the normalizer attaches to schema
//! objects (synthetic titles, origins, content hashes, inlined-from markers) is kept in a side table keyed by
//! the same ids instead of on the schema itself.

pub mod hashing;
pub mod normalize;
pub mod path;

use std::{collections::HashMap, sync::OnceLock};

use http::Method;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display};

use self::path::DeclarationPath;

/// Handle to a schema node inside a [`ResolvedDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchemaId(usize);

impl SchemaId {
  #[must_use]
  pub const fn index(self) -> usize {
    self.0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
  Array,
  Boolean,
  Integer,
  Null,
  Number,
  Object,
  String,
}

impl JsonType {
  #[must_use]
  pub const fn is_primitive(self) -> bool {
    matches!(
      self,
      Self::Boolean | Self::Integer | Self::Null | Self::Number | Self::String
    )
  }
}

/// Schema composition construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum CombinerKind {
  OneOf,
  AnyOf,
  AllOf,
}

/// A schema object with every reference already resolved to a [`SchemaId`].
#[derive(Debug, Clone, Default, PartialEq, bon::Builder)]
pub struct ResolvedSchema {
  #[builder(into)]
  pub title: Option<String>,
  pub schema_type: Option<JsonType>,
  #[builder(default)]
  pub nullable: bool,
  #[builder(into)]
  pub format: Option<String>,
  #[builder(into)]
  pub description: Option<String>,
  #[builder(default)]
  pub deprecated: bool,
  #[builder(default)]
  pub properties: IndexMap<String, SchemaId>,
  #[builder(default)]
  pub required: Vec<String>,
  pub items: Option<SchemaId>,
  #[builder(default)]
  pub one_of: Vec<SchemaId>,
  #[builder(default)]
  pub any_of: Vec<SchemaId>,
  #[builder(default)]
  pub all_of: Vec<SchemaId>,
  #[builder(default)]
  pub enum_values: Vec<Value>,
}

impl ResolvedSchema {
  #[must_use]
  pub fn is_array(&self) -> bool {
    self.schema_type == Some(JsonType::Array)
  }

  /// Returns true for schemas that render as a class with fields of their own.
  #[must_use]
  pub fn is_object_shaped(&self) -> bool {
    self.schema_type == Some(JsonType::Object) || !self.properties.is_empty()
  }

  /// Returns true for scalar schemas (`string`, `integer`, `number`, `boolean`, `null`) without properties.
  #[must_use]
  pub fn is_primitive(&self) -> bool {
    self.properties.is_empty() && self.schema_type.is_some_and(JsonType::is_primitive)
  }

  /// Returns true if the schema has inline `oneOf` or `anyOf` alternatives.
  #[must_use]
  pub fn has_union(&self) -> bool {
    !self.one_of.is_empty() || !self.any_of.is_empty()
  }

  #[must_use]
  pub fn has_combiner(&self) -> bool {
    self.has_union() || !self.all_of.is_empty()
  }

  /// Returns true for a `oneOf`/`anyOf` schema that has no object shape of its own.
  #[must_use]
  pub fn is_pure_combiner(&self) -> bool {
    self.has_union() && !self.is_object_shaped()
  }

  /// Returns the non-empty composition lists in walk order: `oneOf`, `anyOf`, `allOf`.
  pub fn combiners(&self) -> impl Iterator<Item = (CombinerKind, &[SchemaId])> {
    [
      (CombinerKind::OneOf, self.one_of.as_slice()),
      (CombinerKind::AnyOf, self.any_of.as_slice()),
      (CombinerKind::AllOf, self.all_of.as_slice()),
    ]
    .into_iter()
    .filter(|(_, alternatives)| !alternatives.is_empty())
  }

  /// Returns the union kinds present on the schema, `oneOf` first.
  pub fn union_kinds(&self) -> impl Iterator<Item = CombinerKind> {
    self
      .combiners()
      .map(|(kind, _)| kind)
      .filter(|kind| *kind != CombinerKind::AllOf)
  }
}

/// Side-channel metadata attached to a schema node by the normalizer.
#[derive(Debug, Clone, Default)]
pub struct SchemaMeta {
  /// Title to use when the schema has none of its own (typically the component name).
  pub synthetic_title: Option<String>,
  /// Every declaration path this node was reached from.
  pub origins: Vec<DeclarationPath>,
  /// Names of the shared component schemas this node was unified from.
  pub inlined_from: Vec<String>,
  content_hash: OnceLock<String>,
}

impl SchemaMeta {
  pub fn add_origin(&mut self, origin: DeclarationPath) {
    if !self.origins.contains(&origin) {
      self.origins.push(origin);
    }
  }

  pub fn add_inlined_from(&mut self, name: impl Into<String>) {
    let name = name.into();
    if !self.inlined_from.contains(&name) {
      self.inlined_from.push(name);
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
  Path,
  Query,
  Header,
  Cookie,
}

#[derive(Debug, Clone)]
pub struct Parameter {
  pub name: String,
  pub location: ParameterLocation,
  pub required: bool,
  pub deprecated: bool,
  pub schema: Option<SchemaId>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaType {
  pub schema: Option<SchemaId>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestBody {
  pub required: bool,
  pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default)]
pub struct Header {
  pub required: bool,
  pub deprecated: bool,
  pub schema: Option<SchemaId>,
}

#[derive(Debug, Clone, Default)]
pub struct Response {
  pub headers: IndexMap<String, Header>,
  pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default)]
pub struct Operation {
  pub operation_id: Option<String>,
  pub summary: Option<String>,
  pub deprecated: bool,
  pub parameters: Vec<Parameter>,
  pub request_body: Option<RequestBody>,
  pub responses: IndexMap<String, Response>,
}

#[derive(Debug, Clone, Default)]
pub struct PathItem {
  pub operations: IndexMap<Method, Operation>,
}

/// A denormalized OpenAPI document: schema arena, metadata side table, shared components and operations.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDocument {
  schemas: Vec<ResolvedSchema>,
  meta: Vec<SchemaMeta>,
  components: IndexMap<String, SchemaId>,
  component_names: HashMap<SchemaId, String>,
  paths: IndexMap<String, PathItem>,
}

impl ResolvedDocument {
  #[must_use]
  pub fn get(&self, id: SchemaId) -> Option<&ResolvedSchema> {
    self.schemas.get(id.0)
  }

  #[must_use]
  pub fn meta(&self, id: SchemaId) -> Option<&SchemaMeta> {
    self.meta.get(id.0)
  }

  pub fn ids(&self) -> impl Iterator<Item = SchemaId> {
    (0..self.schemas.len()).map(SchemaId)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.schemas.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.schemas.is_empty()
  }

  /// Returns the explicit `title`, falling back to the synthetic title marker.
  #[must_use]
  pub fn title(&self, id: SchemaId) -> Option<&str> {
    self
      .get(id)
      .and_then(|schema| schema.title.as_deref())
      .or_else(|| self.meta(id).and_then(|meta| meta.synthetic_title.as_deref()))
  }

  /// Returns the structural content hash of a schema, computing it on first use.
  #[must_use]
  pub fn content_hash(&self, id: SchemaId) -> &str {
    match self.meta(id) {
      Some(meta) => meta.content_hash.get_or_init(|| hashing::content_hash(self, id)),
      None => "",
    }
  }

  #[must_use]
  pub fn component(&self, name: &str) -> Option<SchemaId> {
    self.components.get(name).copied()
  }

  #[must_use]
  pub fn component_name(&self, id: SchemaId) -> Option<&str> {
    self.component_names.get(&id).map(String::as_str)
  }

  pub fn components(&self) -> impl Iterator<Item = (&str, SchemaId)> {
    self.components.iter().map(|(name, id)| (name.as_str(), *id))
  }

  /// Returns true if the schema was unified from at least one shared component schema.
  #[must_use]
  pub fn is_shared(&self, id: SchemaId) -> bool {
    self.meta(id).is_some_and(|meta| !meta.inlined_from.is_empty())
  }

  /// Resolves the inlined-from marker of a schema to the component schemas it names.
  #[must_use]
  pub fn shared_schemas(&self, id: SchemaId) -> Vec<SchemaId> {
    self
      .meta(id)
      .map(|meta| {
        meta
          .inlined_from
          .iter()
          .filter_map(|name| self.component(name))
          .collect()
      })
      .unwrap_or_default()
  }

  /// Returns the first declaration path a schema was reached from, as a slash-joined string.
  #[must_use]
  pub fn origin(&self, id: SchemaId) -> Option<String> {
    self
      .meta(id)
      .and_then(|meta| meta.origins.first())
      .map(ToString::to_string)
  }

  #[must_use]
  pub fn paths(&self) -> &IndexMap<String, PathItem> {
    &self.paths
  }
}

/// Incrementally assembles a [`ResolvedDocument`].
///
/// Ids can be reserved before their schema is known, which is how recursive schemas are tied together.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
  document: ResolvedDocument,
}

impl DocumentBuilder {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocates an id holding an empty schema, to be filled in with [`DocumentBuilder::define`].
  pub fn reserve(&mut self) -> SchemaId {
    self.add(ResolvedSchema::default())
  }

  pub fn add(&mut self, schema: ResolvedSchema) -> SchemaId {
    let id = SchemaId(self.document.schemas.len());
    self.document.schemas.push(schema);
    self.document.meta.push(SchemaMeta::default());
    id
  }

  pub fn define(&mut self, id: SchemaId, schema: ResolvedSchema) {
    if let Some(slot) = self.document.schemas.get_mut(id.0) {
      *slot = schema;
    }
  }

  #[must_use]
  pub fn get(&self, id: SchemaId) -> Option<&ResolvedSchema> {
    self.document.get(id)
  }

  pub fn ids(&self) -> impl Iterator<Item = SchemaId> + use<> {
    (0..self.document.schemas.len()).map(SchemaId)
  }

  pub fn schema_mut(&mut self, id: SchemaId) -> Option<&mut ResolvedSchema> {
    self.document.schemas.get_mut(id.0)
  }

  #[must_use]
  pub fn meta(&self, id: SchemaId) -> Option<&SchemaMeta> {
    self.document.meta(id)
  }

  pub fn meta_mut(&mut self, id: SchemaId) -> Option<&mut SchemaMeta> {
    self.document.meta.get_mut(id.0)
  }

  /// Registers `id` as the shared component schema `name` and marks it as inlined from that component.
  pub fn register_component(&mut self, name: impl Into<String>, id: SchemaId) {
    let name = name.into();
    if let Some(meta) = self.meta_mut(id) {
      meta.add_inlined_from(name.clone());
    }
    self.document.component_names.entry(id).or_insert_with(|| name.clone());
    self.document.components.insert(name, id);
  }

  /// Adds an operation under `path`, replacing any previous operation with the same method.
  pub fn add_operation(&mut self, path: impl Into<String>, method: Method, operation: Operation) {
    self
      .document
      .paths
      .entry(path.into())
      .or_default()
      .operations
      .insert(method, operation);
  }

  #[must_use]
  pub fn build(self) -> ResolvedDocument {
    self.document
  }
}

#[cfg(test)]
mod tests;
