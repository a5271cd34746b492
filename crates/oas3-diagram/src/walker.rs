//! Depth-first traversal of a [`ResolvedDocument`] with paired start/end hooks.
//!
//! Every `*_start` hook is followed by exactly one matching `*_end` hook for the same node, whatever the start
//! hook returned. A start hook returning [`Walk::Skip`] only suppresses the node's children.

use http::Method;
use indexmap::IndexMap;

use crate::document::{
  CombinerKind, Header, MediaType, Operation, Parameter, PathItem, RequestBody, ResolvedDocument, Response,
  SchemaId, path::DeclarationPath,
};

/// Result of a start hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
  /// Descend into the node's children.
  Recurse,
  /// Treat the subtree as handled.
  Skip,
}

impl Walk {
  #[must_use]
  pub const fn should_recurse(self) -> bool {
    matches!(self, Self::Recurse)
  }
}

/// A schema node reached during the walk.
#[derive(Debug, Clone, Copy)]
pub struct SchemaVisit<'a> {
  pub schema: SchemaId,
  pub path: &'a DeclarationPath,
  /// Set when the schema is one of its own ancestors on the current walk. Such nodes are never descended into.
  pub already_visited: bool,
}

#[allow(unused_variables)]
pub trait DocumentVisitor {
  fn path_start(&mut self, path: &str, item: &PathItem, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn path_end(&mut self, path: &str, item: &PathItem, at: &DeclarationPath) {}

  fn operation_start(&mut self, method: &Method, operation: &Operation, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn operation_end(&mut self, method: &Method, operation: &Operation, at: &DeclarationPath) {}

  fn parameter_start(&mut self, parameter: &Parameter, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn parameter_end(&mut self, parameter: &Parameter, at: &DeclarationPath) {}

  fn request_body_start(&mut self, body: &RequestBody, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn request_body_end(&mut self, body: &RequestBody, at: &DeclarationPath) {}

  fn response_start(&mut self, code: &str, response: &Response, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn response_end(&mut self, code: &str, response: &Response, at: &DeclarationPath) {}

  fn header_start(&mut self, name: &str, header: &Header, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn header_end(&mut self, name: &str, header: &Header, at: &DeclarationPath) {}

  fn media_type_start(&mut self, media_type: &str, media: &MediaType, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn media_type_end(&mut self, media_type: &str, media: &MediaType, at: &DeclarationPath) {}

  fn schema_root_start(&mut self, visit: &SchemaVisit<'_>) -> Walk {
    Walk::Recurse
  }
  fn schema_root_end(&mut self, visit: &SchemaVisit<'_>) {}

  fn schema_property_start(&mut self, name: &str, visit: &SchemaVisit<'_>) -> Walk {
    Walk::Recurse
  }
  fn schema_property_end(&mut self, name: &str, visit: &SchemaVisit<'_>) {}

  fn schema_items_start(&mut self, visit: &SchemaVisit<'_>) -> Walk {
    Walk::Recurse
  }
  fn schema_items_end(&mut self, visit: &SchemaVisit<'_>) {}

  /// Called once per non-empty composition list of `owner`, before its alternatives.
  fn combiner_start(&mut self, kind: CombinerKind, owner: SchemaId, at: &DeclarationPath) -> Walk {
    Walk::Recurse
  }
  fn combiner_end(&mut self, kind: CombinerKind, owner: SchemaId, at: &DeclarationPath) {}

  fn combiner_item_start(&mut self, kind: CombinerKind, index: usize, visit: &SchemaVisit<'_>) -> Walk {
    Walk::Recurse
  }
  fn combiner_item_end(&mut self, kind: CombinerKind, index: usize, visit: &SchemaVisit<'_>) {}
}

/// Walks the operations of a document in declaration order.
///
/// Per operation: parameters, request body media types, then responses (headers before media types). Per
/// schema: properties, `items`, then `oneOf`, `anyOf` and `allOf`.
#[derive(Debug)]
pub struct DocumentWalker<'doc> {
  document: &'doc ResolvedDocument,
  ancestors: Vec<SchemaId>,
}

impl<'doc> DocumentWalker<'doc> {
  #[must_use]
  pub fn new(document: &'doc ResolvedDocument) -> Self {
    Self {
      document,
      ancestors: vec![],
    }
  }

  pub fn walk<V: DocumentVisitor + ?Sized>(&mut self, visitor: &mut V) {
    let document = self.document;
    let paths_at = DeclarationPath::root().child("paths");

    for (path, item) in document.paths() {
      let path_at = paths_at.child(path.as_str());
      if visitor.path_start(path, item, &path_at).should_recurse() {
        for (method, operation) in &item.operations {
          let operation_at = path_at.child(method.as_str().to_ascii_lowercase());
          if visitor.operation_start(method, operation, &operation_at).should_recurse() {
            self.walk_operation(operation, &operation_at, visitor);
          }
          visitor.operation_end(method, operation, &operation_at);
        }
      }
      visitor.path_end(path, item, &path_at);
    }
  }

  fn walk_operation<V: DocumentVisitor + ?Sized>(
    &mut self,
    operation: &Operation,
    at: &DeclarationPath,
    visitor: &mut V,
  ) {
    for (index, parameter) in operation.parameters.iter().enumerate() {
      let parameter_at = at.child("parameters").child(index.to_string());
      if visitor.parameter_start(parameter, &parameter_at).should_recurse()
        && let Some(schema) = parameter.schema
      {
        self.walk_schema_root(schema, &parameter_at.child("schema"), visitor);
      }
      visitor.parameter_end(parameter, &parameter_at);
    }

    if let Some(body) = &operation.request_body {
      let body_at = at.child("requestBody");
      if visitor.request_body_start(body, &body_at).should_recurse() {
        self.walk_content(&body.content, &body_at.child("content"), visitor);
      }
      visitor.request_body_end(body, &body_at);
    }

    for (code, response) in &operation.responses {
      let response_at = at.child("responses").child(code.as_str());
      if visitor.response_start(code, response, &response_at).should_recurse() {
        for (name, header) in &response.headers {
          let header_at = response_at.child("headers").child(name.as_str());
          if visitor.header_start(name, header, &header_at).should_recurse()
            && let Some(schema) = header.schema
          {
            self.walk_schema_root(schema, &header_at.child("schema"), visitor);
          }
          visitor.header_end(name, header, &header_at);
        }
        self.walk_content(&response.content, &response_at.child("content"), visitor);
      }
      visitor.response_end(code, response, &response_at);
    }
  }

  fn walk_content<V: DocumentVisitor + ?Sized>(
    &mut self,
    content: &IndexMap<String, MediaType>,
    at: &DeclarationPath,
    visitor: &mut V,
  ) {
    for (media_type, media) in content {
      let media_at = at.child(media_type.as_str());
      if visitor.media_type_start(media_type, media, &media_at).should_recurse()
        && let Some(schema) = media.schema
      {
        self.walk_schema_root(schema, &media_at.child("schema"), visitor);
      }
      visitor.media_type_end(media_type, media, &media_at);
    }
  }

  /// Walks a single schema tree rooted at `schema`, independent of any operation.
  pub fn walk_schema_root<V: DocumentVisitor + ?Sized>(
    &mut self,
    schema: SchemaId,
    at: &DeclarationPath,
    visitor: &mut V,
  ) {
    let visit = SchemaVisit {
      schema,
      path: at,
      already_visited: false,
    };
    if visitor.schema_root_start(&visit).should_recurse() {
      self.walk_children(schema, at, visitor);
    }
    visitor.schema_root_end(&visit);
  }

  fn walk_children<V: DocumentVisitor + ?Sized>(&mut self, id: SchemaId, at: &DeclarationPath, visitor: &mut V) {
    let document = self.document;
    let Some(schema) = document.get(id) else {
      return;
    };

    self.ancestors.push(id);

    for (name, property) in &schema.properties {
      let property_at = at.child("properties").child(name.as_str());
      let visit = self.visit(*property, &property_at);
      if visitor.schema_property_start(name, &visit).should_recurse() && !visit.already_visited {
        self.walk_children(*property, &property_at, visitor);
      }
      visitor.schema_property_end(name, &visit);
    }

    if let Some(items) = schema.items {
      let items_at = at.child("items");
      let visit = self.visit(items, &items_at);
      if visitor.schema_items_start(&visit).should_recurse() && !visit.already_visited {
        self.walk_children(items, &items_at, visitor);
      }
      visitor.schema_items_end(&visit);
    }

    for (kind, alternatives) in schema.combiners() {
      let combiner_at = at.child(kind.to_string());
      if visitor.combiner_start(kind, id, &combiner_at).should_recurse() {
        for (index, alternative) in alternatives.iter().enumerate() {
          let alternative_at = combiner_at.child(index.to_string());
          let visit = self.visit(*alternative, &alternative_at);
          if visitor.combiner_item_start(kind, index, &visit).should_recurse() && !visit.already_visited {
            self.walk_children(*alternative, &alternative_at, visitor);
          }
          visitor.combiner_item_end(kind, index, &visit);
        }
      }
      visitor.combiner_end(kind, id, &combiner_at);
    }

    self.ancestors.pop();
  }

  fn visit<'a>(&self, schema: SchemaId, path: &'a DeclarationPath) -> SchemaVisit<'a> {
    SchemaVisit {
      schema,
      path,
      already_visited: self.ancestors.contains(&schema),
    }
  }
}
