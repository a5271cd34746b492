//! Per-operation summary of the shared schemas each parameter, request and response uses.
//!
//! Runs its own walk over the document, independent of graph building, and produces one [`OperationData`]
//! per operation with a [`SchemaCard`] for every element a diagram can be drawn for.

use std::collections::HashSet;

use http::Method;
use serde::{Serialize, Serializer};

use crate::{
  document::{
    CombinerKind, Header, MediaType, Operation, Parameter, PathItem, RequestBody, ResolvedDocument, Response,
    SchemaId, path::DeclarationPath,
  },
  graph::{naming, transformer::DiagramScope},
  walker::{DocumentVisitor, DocumentWalker, SchemaVisit, Walk},
};

/// A shared component schema that an element's schema tree was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSchema {
  pub name: String,
  pub schema: SchemaId,
  /// Key of the class the component renders as.
  pub class_key: String,
}

/// One selectable element of an operation: a parameter, or a request/response media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCard {
  pub title: String,
  pub scope: DiagramScope,
  pub required: bool,
  pub deprecated: bool,
  pub derived_schemas: Vec<DerivedSchema>,
}

impl SchemaCard {
  fn new(title: String, at: &DeclarationPath, required: bool, deprecated: bool) -> Self {
    Self {
      title,
      scope: DiagramScope::new(at.clone()),
      required,
      deprecated,
      derived_schemas: vec![],
    }
  }

  #[must_use]
  pub fn derived_names(&self) -> Vec<&str> {
    self.derived_schemas.iter().map(|derived| derived.name.as_str()).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationData {
  pub path: String,
  #[serde(serialize_with = "serialize_method")]
  pub method: Method,
  pub operation_id: Option<String>,
  pub summary: Option<String>,
  pub deprecated: bool,
  pub parameters: Vec<SchemaCard>,
  pub requests: Vec<SchemaCard>,
  pub responses: Vec<SchemaCard>,
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(method.as_str())
}

/// Collects the schema cards of every operation in `document`, in declaration order.
#[must_use]
#[tracing::instrument(skip_all)]
pub fn collect_operation_data(document: &ResolvedDocument) -> Vec<OperationData> {
  let mut collector = OperationDataCollector {
    document,
    path: String::new(),
    operations: vec![],
    current: None,
    section: None,
    card: None,
    visited: HashSet::new(),
  };
  DocumentWalker::new(document).walk(&mut collector);

  tracing::debug!(operations = collector.operations.len(), "collected operation data");
  collector.operations
}

#[derive(Debug, Clone)]
enum Section {
  Request { required: bool },
  Response { code: String },
}

struct OperationDataCollector<'doc> {
  document: &'doc ResolvedDocument,
  path: String,
  operations: Vec<OperationData>,
  current: Option<OperationData>,
  section: Option<Section>,
  card: Option<SchemaCard>,
  /// Schemas already seen for the open card.
  visited: HashSet<SchemaId>,
}

impl OperationDataCollector<'_> {
  fn open_card(&mut self, card: SchemaCard) {
    self.visited.clear();
    self.card = Some(card);
  }

  fn note(&mut self, schema: SchemaId) -> Walk {
    let Some(card) = self.card.as_mut() else {
      return Walk::Skip;
    };
    if !self.visited.insert(schema) {
      return Walk::Skip;
    }

    let document = self.document;
    for name in document.meta(schema).map(|meta| meta.inlined_from.as_slice()).unwrap_or_default() {
      if card.derived_schemas.iter().any(|derived| &derived.name == name) {
        continue;
      }
      let Some(component) = document.component(name) else {
        continue;
      };
      card.derived_schemas.push(DerivedSchema {
        name: name.clone(),
        schema: component,
        class_key: naming::class_key(document, component),
      });
    }
    Walk::Recurse
  }
}

impl DocumentVisitor for OperationDataCollector<'_> {
  fn path_start(&mut self, path: &str, _item: &PathItem, _at: &DeclarationPath) -> Walk {
    self.path = path.to_string();
    Walk::Recurse
  }

  fn operation_start(&mut self, method: &Method, operation: &Operation, _at: &DeclarationPath) -> Walk {
    self.current = Some(OperationData {
      path: self.path.clone(),
      method: method.clone(),
      operation_id: operation.operation_id.clone(),
      summary: operation.summary.clone(),
      deprecated: operation.deprecated,
      parameters: vec![],
      requests: vec![],
      responses: vec![],
    });
    Walk::Recurse
  }

  fn operation_end(&mut self, _method: &Method, _operation: &Operation, _at: &DeclarationPath) {
    if let Some(operation) = self.current.take() {
      self.operations.push(operation);
    }
  }

  fn parameter_start(&mut self, parameter: &Parameter, at: &DeclarationPath) -> Walk {
    self.open_card(SchemaCard::new(
      format!("Parameter {} ({})", parameter.name, parameter.location),
      at,
      parameter.required,
      parameter.deprecated,
    ));
    Walk::Recurse
  }

  fn parameter_end(&mut self, _parameter: &Parameter, _at: &DeclarationPath) {
    if let Some(card) = self.card.take()
      && let Some(operation) = self.current.as_mut()
    {
      operation.parameters.push(card);
    }
  }

  fn request_body_start(&mut self, body: &RequestBody, _at: &DeclarationPath) -> Walk {
    self.section = Some(Section::Request {
      required: body.required,
    });
    Walk::Recurse
  }

  fn request_body_end(&mut self, _body: &RequestBody, _at: &DeclarationPath) {
    self.section = None;
  }

  fn response_start(&mut self, code: &str, _response: &Response, _at: &DeclarationPath) -> Walk {
    self.section = Some(Section::Response { code: code.to_string() });
    Walk::Recurse
  }

  fn response_end(&mut self, _code: &str, _response: &Response, _at: &DeclarationPath) {
    self.section = None;
  }

  fn header_start(&mut self, _name: &str, _header: &Header, _at: &DeclarationPath) -> Walk {
    Walk::Skip
  }

  fn media_type_start(&mut self, media_type: &str, _media: &MediaType, at: &DeclarationPath) -> Walk {
    let card = match &self.section {
      Some(Section::Request { required }) => SchemaCard::new(format!("Request ({media_type})"), at, *required, false),
      Some(Section::Response { code }) => SchemaCard::new(format!("Response {code} ({media_type})"), at, false, false),
      None => return Walk::Skip,
    };
    self.open_card(card);
    Walk::Recurse
  }

  fn media_type_end(&mut self, _media_type: &str, _media: &MediaType, _at: &DeclarationPath) {
    let (Some(card), Some(operation)) = (self.card.take(), self.current.as_mut()) else {
      return;
    };
    match self.section {
      Some(Section::Request { .. }) => operation.requests.push(card),
      Some(Section::Response { .. }) => operation.responses.push(card),
      None => {}
    }
  }

  fn schema_root_start(&mut self, visit: &SchemaVisit<'_>) -> Walk {
    self.note(visit.schema)
  }

  fn schema_property_start(&mut self, _name: &str, visit: &SchemaVisit<'_>) -> Walk {
    self.note(visit.schema)
  }

  fn schema_items_start(&mut self, visit: &SchemaVisit<'_>) -> Walk {
    self.note(visit.schema)
  }

  fn combiner_item_start(&mut self, _kind: CombinerKind, _index: usize, visit: &SchemaVisit<'_>) -> Walk {
    self.note(visit.schema)
  }
}
