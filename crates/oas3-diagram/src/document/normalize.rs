//! Reference implementation of the normalizer's output contract.
//!
//! Lowers an already-parsed [`oas3::Spec`] into a [`ResolvedDocument`]: component schemas become shared arena
//! nodes so every `$ref` to them resolves to the same id (recursive schemas become id cycles), component
//! nodes carry their name as inlined-from marker and synthetic title, every node records the declaration
//! paths it was reached from, and `allOf` branches are merged into the schema that lists them.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use http::Method;
use indexmap::IndexMap;
use oas3::{
  Spec,
  spec::{ObjectOrReference, ObjectSchema, ParameterIn, Schema, SchemaType, SchemaTypeSet},
};
use serde_json::Value;
use strum::Display;

use super::{
  DocumentBuilder, Header, JsonType, MediaType, Operation, Parameter, ParameterLocation, RequestBody,
  ResolvedDocument, ResolvedSchema, Response, SchemaId, path::DeclarationPath,
};

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
const HEADER_REF_PREFIX: &str = "#/components/headers/";

/// Non-fatal problems found while lowering a specification.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum NormalizeWarning {
  #[strum(to_string = "Unresolved schema reference '{reference}' at {location}")]
  UnresolvedSchemaRef { reference: String, location: String },
  #[strum(to_string = "Failed to resolve {kind} at {location}: {error}")]
  UnresolvedComponent {
    kind: String,
    location: String,
    error: String,
  },
}

/// Output of [`normalize`]: the resolved document plus every warning recorded on the way.
#[derive(Debug)]
pub struct Normalized {
  pub document: ResolvedDocument,
  pub warnings: Vec<NormalizeWarning>,
}

/// Lowers `spec` into a [`ResolvedDocument`].
///
/// Never fails: unresolvable references are recorded as warnings and replaced by empty schemas, and
/// unresolvable parameters, request bodies and responses are dropped.
///
/// [`oas3`] keeps object properties in a sorted map, so properties come out in alphabetical order. Use
/// [`normalize_value`] to keep the order they were declared in.
#[must_use]
pub fn normalize(spec: &Spec) -> Normalized {
  finish(Normalizer::new(spec, None).run())
}

/// Parses `source` as an OpenAPI document and lowers it, keeping properties in declaration order.
pub fn normalize_value(source: &Value) -> anyhow::Result<Normalized> {
  let spec = serde_json::from_value::<Spec>(source.clone()).context("parsing OpenAPI document")?;
  Ok(finish(Normalizer::new(&spec, Some(source)).run()))
}

fn finish(normalized: Normalized) -> Normalized {
  tracing::debug!(
    schemas = normalized.document.len(),
    warnings = normalized.warnings.len(),
    "normalized specification"
  );
  normalized
}

#[derive(Default)]
struct MergeAccumulator {
  properties: IndexMap<String, SchemaId>,
  required: Vec<String>,
  schema_type: Option<JsonType>,
  inlined_from: Vec<String>,
}

impl MergeAccumulator {
  fn merge_from(&mut self, source: &ResolvedSchema) {
    for (name, prop) in &source.properties {
      self.properties.insert(name.clone(), *prop);
    }
    for name in &source.required {
      if !self.required.contains(name) {
        self.required.push(name.clone());
      }
    }
    if source.schema_type.is_some() {
      self.schema_type = source.schema_type;
    }
  }

  fn merge_markers(&mut self, inlined_from: &[String]) {
    for name in inlined_from {
      if !self.inlined_from.contains(name) {
        self.inlined_from.push(name.clone());
      }
    }
  }

  fn apply_to(self, target: &mut ResolvedSchema) -> Vec<String> {
    target.properties = self.properties;
    target.required = self.required;
    if self.schema_type.is_some() {
      target.schema_type = self.schema_type;
    }
    self.inlined_from
  }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MergeState {
  InProgress,
  Done,
}

struct Normalizer<'spec> {
  spec: &'spec Spec,
  /// The document as written, when known. Only used for declaration order and header lookups.
  source: Option<&'spec Value>,
  builder: DocumentBuilder,
  components: BTreeMap<String, SchemaId>,
  warnings: Vec<NormalizeWarning>,
  spec_json: Option<Value>,
}

impl<'spec> Normalizer<'spec> {
  fn new(spec: &'spec Spec, source: Option<&'spec Value>) -> Self {
    Self {
      spec,
      source,
      builder: DocumentBuilder::new(),
      components: BTreeMap::new(),
      warnings: vec![],
      spec_json: None,
    }
  }

  fn run(mut self) -> Normalized {
    self.reserve_components();
    self.lower_components();
    self.lower_paths();
    self.merge_compositions();

    Normalized {
      document: self.builder.build(),
      warnings: self.warnings,
    }
  }

  fn reserve_components(&mut self) {
    let spec = self.spec;
    let Some(components) = &spec.components else {
      return;
    };

    for name in components.schemas.keys() {
      let id = self.builder.reserve();
      self.builder.register_component(name.clone(), id);
      self.components.insert(name.clone(), id);
    }
  }

  fn lower_components(&mut self) {
    let spec = self.spec;
    let Some(components) = &spec.components else {
      return;
    };

    for (name, schema_ref) in &components.schemas {
      let Some(&id) = self.components.get(name) else {
        continue;
      };
      let at = DeclarationPath::from_segments(["components", "schemas", name.as_str()]);

      let lowered = match schema_ref {
        ObjectOrReference::Object(schema) => self.lower_schema(schema, &at),
        ObjectOrReference::Ref { ref_path, .. } => match schema_ref.resolve(spec) {
          Ok(schema) => self.lower_schema(&schema, &at),
          Err(error) => {
            self.warnings.push(NormalizeWarning::UnresolvedComponent {
              kind: "schema".to_string(),
              location: ref_path.clone(),
              error: error.to_string(),
            });
            ResolvedSchema::default()
          }
        },
      };

      let has_title = lowered.title.is_some();
      self.builder.define(id, lowered);
      if let Some(meta) = self.builder.meta_mut(id) {
        meta.add_origin(at);
        if !has_title {
          meta.synthetic_title = Some(name.clone());
        }
      }
    }
  }

  fn lower_ref(&mut self, schema_ref: &ObjectOrReference<ObjectSchema>, at: &DeclarationPath) -> SchemaId {
    let id = match schema_ref {
      ObjectOrReference::Ref { ref_path, .. } => {
        match ref_path
          .strip_prefix(SCHEMA_REF_PREFIX)
          .and_then(|name| self.components.get(name))
        {
          Some(&id) => id,
          None => {
            self.warnings.push(NormalizeWarning::UnresolvedSchemaRef {
              reference: ref_path.clone(),
              location: at.to_string(),
            });
            self.builder.reserve()
          }
        }
      }
      ObjectOrReference::Object(schema) => {
        let id = self.builder.reserve();
        let lowered = self.lower_schema(schema, at);
        self.builder.define(id, lowered);
        id
      }
    };

    if let Some(meta) = self.builder.meta_mut(id) {
      meta.add_origin(at.clone());
    }
    id
  }

  fn lower_list(&mut self, schemas: &[ObjectOrReference<ObjectSchema>], at: &DeclarationPath) -> Vec<SchemaId> {
    schemas
      .iter()
      .enumerate()
      .map(|(index, schema_ref)| self.lower_ref(schema_ref, &at.child(index.to_string())))
      .collect()
  }

  fn lower_schema(&mut self, schema: &ObjectSchema, at: &DeclarationPath) -> ResolvedSchema {
    let (schema_type, nullable) = lower_type(schema.schema_type.as_ref());

    let properties = self
      .property_order(schema, at)
      .into_iter()
      .map(|(name, property)| {
        let id = self.lower_ref(property, &at.child("properties").child(name.as_str()));
        (name.clone(), id)
      })
      .collect::<IndexMap<_, _>>();

    let items = schema.items.as_deref().map(|items| match items {
      Schema::Object(schema_ref) => self.lower_ref(schema_ref, &at.child("items")),
      Schema::Boolean(_) => self.builder.reserve(),
    });

    let mut enum_values = schema.enum_values.clone();
    if enum_values.is_empty()
      && let Some(const_value) = &schema.const_value
    {
      enum_values.push(const_value.clone());
    }

    ResolvedSchema {
      title: schema.title.clone(),
      schema_type,
      nullable,
      format: schema.format.clone(),
      description: schema.description.clone(),
      deprecated: schema.deprecated.unwrap_or(false),
      properties,
      required: schema.required.clone(),
      items,
      one_of: self.lower_list(&schema.one_of, &at.child("oneOf")),
      any_of: self.lower_list(&schema.any_of, &at.child("anyOf")),
      all_of: self.lower_list(&schema.all_of, &at.child("allOf")),
      enum_values,
    }
  }

  /// Properties of `schema` in the order the source document declares them at `at`.
  ///
  /// Falls back to the sorted order when there is no source, or when the source object at `at` is not this
  /// schema (merged parameters and referenced responses shift declaration paths).
  fn property_order<'s>(
    &self,
    schema: &'s ObjectSchema,
    at: &DeclarationPath,
  ) -> Vec<(&'s String, &'s ObjectOrReference<ObjectSchema>)> {
    let declared = self
      .source
      .and_then(|source| source.pointer(&format!("/{at}")))
      .and_then(|declared| declared.get("properties"))
      .and_then(Value::as_object)
      .filter(|declared| {
        declared.len() == schema.properties.len() && declared.keys().all(|name| schema.properties.contains_key(name))
      });

    match declared {
      Some(declared) => declared
        .keys()
        .filter_map(|name| schema.properties.get_key_value(name))
        .collect(),
      None => schema.properties.iter().collect(),
    }
  }

  fn lower_paths(&mut self) {
    let spec = self.spec;
    let Some(paths) = &spec.paths else {
      return;
    };

    for (path, path_item) in paths {
      for (method, operation) in path_item.methods() {
        let at = DeclarationPath::from_segments(["paths", path.as_str(), &method.as_str().to_ascii_lowercase()]);

        let mut parameter_refs = path_item.parameters.clone();
        parameter_refs.extend(operation.parameters.iter().cloned());
        let parameters = self.lower_parameters(&parameter_refs, &at);

        let request_body = self.lower_request_body(operation.request_body.as_ref(), &at.child("requestBody"));

        let mut responses = IndexMap::new();
        if let Some(response_map) = &operation.responses {
          for (code, response_ref) in response_map {
            let response_at = at.child("responses").child(code.as_str());
            if let Some(response) = self.lower_response(response_ref, &response_at) {
              responses.insert(code.clone(), response);
            }
          }
        }

        self.builder.add_operation(
          path.clone(),
          Method::clone(&method),
          Operation {
            operation_id: operation.operation_id.clone(),
            summary: operation.summary.clone(),
            deprecated: operation.deprecated.unwrap_or(false),
            parameters,
            request_body,
            responses,
          },
        );
      }
    }
  }

  /// Resolves and lowers parameters; a later parameter replaces an earlier one with the same name and
  /// location, so operation-level parameters override path-level ones.
  fn lower_parameters(
    &mut self,
    parameter_refs: &[ObjectOrReference<oas3::spec::Parameter>],
    at: &DeclarationPath,
  ) -> Vec<Parameter> {
    let spec = self.spec;
    let mut resolved = vec![];

    for parameter_ref in parameter_refs {
      match parameter_ref.resolve(spec) {
        Ok(parameter) => {
          resolved.retain(|p: &oas3::spec::Parameter| p.location != parameter.location || p.name != parameter.name);
          resolved.push(parameter);
        }
        Err(error) => self.warnings.push(NormalizeWarning::UnresolvedComponent {
          kind: "parameter".to_string(),
          location: at.child("parameters").to_string(),
          error: error.to_string(),
        }),
      }
    }

    resolved
      .iter()
      .enumerate()
      .map(|(index, parameter)| {
        let parameter_at = at.child("parameters").child(index.to_string());
        Parameter {
          name: parameter.name.clone(),
          location: lower_location(&parameter.location),
          required: parameter.required.unwrap_or(false),
          deprecated: parameter.deprecated.unwrap_or(false),
          schema: parameter
            .schema
            .as_ref()
            .map(|schema_ref| self.lower_ref(schema_ref, &parameter_at.child("schema"))),
        }
      })
      .collect()
  }

  fn lower_request_body(
    &mut self,
    body_ref: Option<&ObjectOrReference<oas3::spec::RequestBody>>,
    at: &DeclarationPath,
  ) -> Option<RequestBody> {
    let body = match body_ref?.resolve(self.spec) {
      Ok(body) => body,
      Err(error) => {
        self.warnings.push(NormalizeWarning::UnresolvedComponent {
          kind: "request body".to_string(),
          location: at.to_string(),
          error: error.to_string(),
        });
        return None;
      }
    };

    Some(RequestBody {
      required: body.required.unwrap_or(false),
      content: self.lower_content(&body.content, &at.child("content")),
    })
  }

  fn lower_response(
    &mut self,
    response_ref: &ObjectOrReference<oas3::spec::Response>,
    at: &DeclarationPath,
  ) -> Option<Response> {
    let response = match response_ref.resolve(self.spec) {
      Ok(response) => response,
      Err(error) => {
        self.warnings.push(NormalizeWarning::UnresolvedComponent {
          kind: "response".to_string(),
          location: at.to_string(),
          error: error.to_string(),
        });
        return None;
      }
    };

    let headers = self.lower_headers(&response, &at.child("headers"));
    Some(Response {
      headers,
      content: self.lower_content(&response.content, &at.child("content")),
    })
  }

  fn lower_content(
    &mut self,
    content: &BTreeMap<String, oas3::spec::MediaType>,
    at: &DeclarationPath,
  ) -> IndexMap<String, MediaType> {
    content
      .iter()
      .map(|(media_type, media)| {
        let schema = media
          .schema
          .as_ref()
          .map(|schema_ref| self.lower_ref(schema_ref, &at.child(media_type.as_str()).child("schema")));
        (media_type.clone(), MediaType { schema })
      })
      .collect()
  }

  /// Lowers response headers from their JSON form, following `#/components/headers/` references.
  fn lower_headers(&mut self, response: &oas3::spec::Response, at: &DeclarationPath) -> IndexMap<String, Header> {
    let Ok(Value::Object(response_json)) = serde_json::to_value(response) else {
      return IndexMap::new();
    };
    let Some(Value::Object(headers)) = response_json.get("headers") else {
      return IndexMap::new();
    };

    let mut lowered = IndexMap::new();
    for (name, header_json) in headers {
      let header_at = at.child(name.as_str());
      let Some(header_json) = self.resolve_header_json(header_json, &header_at) else {
        continue;
      };

      let schema = header_json
        .get("schema")
        .cloned()
        .and_then(|schema_json| serde_json::from_value::<ObjectOrReference<ObjectSchema>>(schema_json).ok())
        .map(|schema_ref| self.lower_ref(&schema_ref, &header_at.child("schema")));

      lowered.insert(
        name.clone(),
        Header {
          required: header_json.get("required").and_then(Value::as_bool).unwrap_or(false),
          deprecated: header_json.get("deprecated").and_then(Value::as_bool).unwrap_or(false),
          schema,
        },
      );
    }
    lowered
  }

  fn resolve_header_json(&mut self, header_json: &Value, at: &DeclarationPath) -> Option<Value> {
    let Some(ref_path) = header_json.get("$ref").and_then(Value::as_str) else {
      return Some(header_json.clone());
    };

    let resolved = ref_path.strip_prefix(HEADER_REF_PREFIX).and_then(|name| {
      self
        .spec_json()
        .and_then(|spec_json| spec_json.pointer(&format!("/components/headers/{name}")))
        .cloned()
    });

    if resolved.is_none() {
      self.warnings.push(NormalizeWarning::UnresolvedComponent {
        kind: "header".to_string(),
        location: at.to_string(),
        error: format!("no component for '{ref_path}'"),
      });
    }
    resolved
  }

  fn spec_json(&mut self) -> Option<&Value> {
    if let Some(source) = self.source {
      return Some(source);
    }
    if self.spec_json.is_none() {
      self.spec_json = serde_json::to_value(self.spec).ok();
    }
    self.spec_json.as_ref()
  }

  /// Folds every `allOf` branch into the schema that lists it.
  fn merge_compositions(&mut self) {
    let ids = self.builder.ids().collect::<Vec<_>>();
    let mut states = HashMap::new();
    for id in ids {
      self.merge_all_of(id, &mut states);
    }
  }

  fn merge_all_of(&mut self, id: SchemaId, states: &mut HashMap<SchemaId, MergeState>) {
    if states.contains_key(&id) {
      return;
    }
    states.insert(id, MergeState::InProgress);

    let Some(schema) = self.builder.get(id).cloned() else {
      states.insert(id, MergeState::Done);
      return;
    };

    if schema.all_of.is_empty() {
      states.insert(id, MergeState::Done);
      return;
    }

    let mut acc = MergeAccumulator::default();
    for member in &schema.all_of {
      self.merge_all_of(*member, states);
      if states.get(member) == Some(&MergeState::InProgress) {
        tracing::trace!(schema = id.index(), member = member.index(), "skipping recursive allOf branch");
        continue;
      }
      if let Some(source) = self.builder.get(*member) {
        acc.merge_from(source);
      }
      if let Some(meta) = self.builder.meta(*member) {
        acc.merge_markers(&meta.inlined_from);
      }
    }
    acc.merge_from(&schema);

    let mut merged = schema;
    let inlined_from = acc.apply_to(&mut merged);
    self.builder.define(id, merged);
    if let Some(meta) = self.builder.meta_mut(id) {
      for name in inlined_from {
        meta.add_inlined_from(name);
      }
    }

    states.insert(id, MergeState::Done);
  }
}

fn lower_type(schema_type: Option<&SchemaTypeSet>) -> (Option<JsonType>, bool) {
  match schema_type {
    Some(SchemaTypeSet::Single(single)) => (Some(lower_json_type(single)), false),
    Some(SchemaTypeSet::Multiple(types)) => {
      let nullable = types.contains(&SchemaType::Null);
      let primary = types
        .iter()
        .find(|t| **t != SchemaType::Null)
        .or_else(|| types.first())
        .map(lower_json_type);
      (primary, nullable)
    }
    None => (None, false),
  }
}

fn lower_json_type(schema_type: &SchemaType) -> JsonType {
  match schema_type {
    SchemaType::Array => JsonType::Array,
    SchemaType::Boolean => JsonType::Boolean,
    SchemaType::Integer => JsonType::Integer,
    SchemaType::Null => JsonType::Null,
    SchemaType::Number => JsonType::Number,
    SchemaType::Object => JsonType::Object,
    SchemaType::String => JsonType::String,
  }
}

fn lower_location(location: &ParameterIn) -> ParameterLocation {
  match location {
    ParameterIn::Path => ParameterLocation::Path,
    ParameterIn::Query => ParameterLocation::Query,
    ParameterIn::Header => ParameterLocation::Header,
    ParameterIn::Cookie => ParameterLocation::Cookie,
  }
}
