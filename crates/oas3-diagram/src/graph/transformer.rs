use std::{convert::Infallible, fmt, str::FromStr};

use http::Method;
use serde::{Serialize, Serializer};

use crate::{
  document::{
    CombinerKind, Header, MediaType, Operation, Parameter, PathItem, RequestBody, ResolvedDocument, Response, SchemaId,
    path::DeclarationPath,
  },
  graph::{SchemaGraphContent, builder::GraphBuilder},
  walker::{DocumentVisitor, DocumentWalker, SchemaVisit, Walk},
};

/// Declaration path of the one operation element a diagram is drawn for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagramScope(DeclarationPath);

impl DiagramScope {
  #[must_use]
  pub fn new(path: DeclarationPath) -> Self {
    Self(path)
  }

  /// The parameter at `index` of an operation, counted after path-level parameters were merged in.
  #[must_use]
  pub fn parameter(path: &str, method: &Method, index: usize) -> Self {
    Self(operation_path(path, method).child("parameters").child(index.to_string()))
  }

  #[must_use]
  pub fn request_body(path: &str, method: &Method, media_type: &str) -> Self {
    Self(
      operation_path(path, method)
        .child("requestBody")
        .child("content")
        .child(media_type),
    )
  }

  #[must_use]
  pub fn response(path: &str, method: &Method, code: &str, media_type: &str) -> Self {
    Self(
      operation_path(path, method)
        .child("responses")
        .child(code)
        .child("content")
        .child(media_type),
    )
  }

  #[must_use]
  pub fn response_header(path: &str, method: &Method, code: &str, header: &str) -> Self {
    Self(
      operation_path(path, method)
        .child("responses")
        .child(code)
        .child("headers")
        .child(header),
    )
  }

  #[must_use]
  pub fn path(&self) -> &DeclarationPath {
    &self.0
  }

  /// Returns true if `at` lies on the way to the scope or inside it.
  #[must_use]
  pub fn covers(&self, at: &DeclarationPath) -> bool {
    at.starts_with(&self.0) || self.0.starts_with(at)
  }
}

fn operation_path(path: &str, method: &Method) -> DeclarationPath {
  DeclarationPath::from_segments(["paths", path, &method.as_str().to_ascii_lowercase()])
}

impl fmt::Display for DiagramScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0, f)
  }
}

impl FromStr for DiagramScope {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.parse().map(Self)
  }
}

impl Serialize for DiagramScope {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.0.serialize(serializer)
  }
}

/// Builds the class-diagram graph of the schema found at `scope`.
///
/// Elements outside the scope are skipped, so the result only holds classes reachable from that one
/// parameter, request body or response.
#[must_use]
#[tracing::instrument(skip(document, scope), fields(scope = %scope))]
pub fn transform(document: &ResolvedDocument, scope: &DiagramScope) -> SchemaGraphContent {
  let mut transformer = DiagramTransformer {
    scope,
    builder: GraphBuilder::new(document),
    titles: vec![],
    root: None,
  };
  DocumentWalker::new(document).walk(&mut transformer);

  let graph = transformer.builder.build();
  tracing::debug!(
    classes = graph.classes.len(),
    relations = graph.relations.len(),
    "built schema graph"
  );
  graph
}

struct DiagramTransformer<'a, 'doc> {
  scope: &'a DiagramScope,
  builder: GraphBuilder<'doc>,
  /// Contextual names of the enclosing elements, used to title anonymous root schemas.
  titles: Vec<String>,
  root: Option<DeclarationPath>,
}

impl DiagramTransformer<'_, '_> {
  fn enter(&mut self, title: Option<String>, at: &DeclarationPath) -> Walk {
    if let Some(title) = title {
      self.titles.push(title);
    }
    if self.scope.covers(at) { Walk::Recurse } else { Walk::Skip }
  }

  fn leave(&mut self) {
    self.titles.pop();
  }

  fn alternative_title(&self) -> String {
    self.titles.join(" ")
  }

  /// Items directly under the root schema are the elements of a root-level array.
  fn is_root_items(&self, visit: &SchemaVisit<'_>) -> bool {
    self.root.is_some() && visit.path.parent() == self.root
  }
}

impl DocumentVisitor for DiagramTransformer<'_, '_> {
  fn path_start(&mut self, _path: &str, _item: &PathItem, at: &DeclarationPath) -> Walk {
    self.enter(None, at)
  }

  fn operation_start(&mut self, _method: &Method, _operation: &Operation, at: &DeclarationPath) -> Walk {
    self.enter(None, at)
  }

  fn parameter_start(&mut self, parameter: &Parameter, at: &DeclarationPath) -> Walk {
    self.enter(Some(format!("Parameter {}", parameter.name)), at)
  }

  fn parameter_end(&mut self, _parameter: &Parameter, _at: &DeclarationPath) {
    self.leave();
  }

  fn request_body_start(&mut self, _body: &RequestBody, at: &DeclarationPath) -> Walk {
    self.enter(Some("Request".to_string()), at)
  }

  fn request_body_end(&mut self, _body: &RequestBody, _at: &DeclarationPath) {
    self.leave();
  }

  fn response_start(&mut self, code: &str, _response: &Response, at: &DeclarationPath) -> Walk {
    self.enter(Some(format!("Response {code}")), at)
  }

  fn response_end(&mut self, _code: &str, _response: &Response, _at: &DeclarationPath) {
    self.leave();
  }

  fn header_start(&mut self, name: &str, _header: &Header, at: &DeclarationPath) -> Walk {
    self.enter(Some(format!("Header {name}")), at)
  }

  fn header_end(&mut self, _name: &str, _header: &Header, _at: &DeclarationPath) {
    self.leave();
  }

  fn media_type_start(&mut self, media_type: &str, _media: &MediaType, at: &DeclarationPath) -> Walk {
    self.enter(Some(format!("({media_type})")), at)
  }

  fn media_type_end(&mut self, _media_type: &str, _media: &MediaType, _at: &DeclarationPath) {
    self.leave();
  }

  fn schema_root_start(&mut self, visit: &SchemaVisit<'_>) -> Walk {
    if !self.scope.covers(visit.path) {
      return Walk::Skip;
    }
    self.root = Some(visit.path.clone());
    let title = self.alternative_title();
    self.builder.create_root_schema(visit.schema, Some(&title))
  }

  fn schema_root_end(&mut self, visit: &SchemaVisit<'_>) {
    if self.scope.covers(visit.path) {
      self.builder.back();
      self.root = None;
    }
  }

  fn schema_property_start(&mut self, name: &str, visit: &SchemaVisit<'_>) -> Walk {
    let walk = self
      .builder
      .create_property_and_connection(name, name, visit.schema, false, 0);
    if visit.already_visited { Walk::Skip } else { walk }
  }

  fn schema_property_end(&mut self, _name: &str, _visit: &SchemaVisit<'_>) {
    self.builder.back();
  }

  fn schema_items_start(&mut self, visit: &SchemaVisit<'_>) -> Walk {
    if self.is_root_items(visit) {
      return self.builder.create_root_array_property_and_connection(visit.schema);
    }
    // nested arrays were unwrapped when their property was created
    Walk::Recurse
  }

  fn schema_items_end(&mut self, visit: &SchemaVisit<'_>) {
    if self.is_root_items(visit) {
      self.builder.back();
    }
  }

  fn combiner_start(&mut self, kind: CombinerKind, owner: SchemaId, _at: &DeclarationPath) -> Walk {
    self.builder.create_combiner(kind, owner)
  }

  fn combiner_end(&mut self, _kind: CombinerKind, _owner: SchemaId, _at: &DeclarationPath) {
    self.builder.back();
  }

  fn combiner_item_start(&mut self, _kind: CombinerKind, index: usize, visit: &SchemaVisit<'_>) -> Walk {
    let walk = self
      .builder
      .create_alternative_combiner_property_and_connection(index, visit.schema);
    if visit.already_visited { Walk::Skip } else { walk }
  }

  fn combiner_item_end(&mut self, _kind: CombinerKind, _index: usize, _visit: &SchemaVisit<'_>) {
    self.builder.back();
  }
}
