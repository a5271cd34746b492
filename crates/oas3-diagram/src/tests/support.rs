use http::Method;
use oas3::Spec;
use serde_json::{Value, json};

use crate::{
  ClassMember, DiagramScope, PropertyGroup, ResolvedDocument, SchemaClass, SchemaGraphContent, SchemaProperty,
  normalize_value, transform,
};

pub(crate) fn spec_from_json(json_value: Value) -> Spec {
  serde_json::from_value(json_value).expect("valid spec JSON")
}

pub(crate) fn normalize_json(json_value: Value) -> ResolvedDocument {
  let normalized = normalize_value(&json_value).expect("valid spec JSON");
  assert!(
    normalized.warnings.is_empty(),
    "unexpected normalize warnings: {:?}",
    normalized.warnings
  );
  normalized.document
}

/// A document with one `GET /items` operation answering `200 application/json` with `schema`.
pub(crate) fn response_document(schema: Value, schemas: Value) -> ResolvedDocument {
  normalize_json(json!({
    "openapi": "3.1.0",
    "info": { "title": "Test API", "version": "1.0.0" },
    "paths": {
      "/items": {
        "get": {
          "operationId": "listItems",
          "responses": {
            "200": {
              "description": "ok",
              "content": { "application/json": { "schema": schema } }
            }
          }
        }
      }
    },
    "components": { "schemas": schemas }
  }))
}

pub(crate) fn items_response_scope() -> DiagramScope {
  DiagramScope::response("/items", &Method::GET, "200", "application/json")
}

/// Transforms the `GET /items` response of `response_document(schema, schemas)`.
pub(crate) fn transform_response(schema: Value, schemas: Value) -> (ResolvedDocument, SchemaGraphContent) {
  let document = response_document(schema, schemas);
  let graph = transform(&document, &items_response_scope());
  (document, graph)
}

pub(crate) fn petstore() -> Value {
  json!({
    "openapi": "3.1.0",
    "info": { "title": "Petstore", "version": "1.0.0" },
    "paths": {
      "/pets": {
        "parameters": [
          { "name": "limit", "in": "query", "schema": { "type": "integer", "format": "int32" } }
        ],
        "get": {
          "operationId": "listPets",
          "summary": "List all pets",
          "parameters": [
            { "name": "limit", "in": "query", "required": true, "schema": { "type": "integer", "format": "int64" } },
            { "name": "X-Trace", "in": "header", "deprecated": true, "schema": { "type": "string" } }
          ],
          "responses": {
            "200": {
              "description": "A list of pets",
              "content": {
                "application/json": {
                  "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                }
              }
            },
            "default": {
              "description": "Unexpected error",
              "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
              }
            }
          }
        },
        "post": {
          "operationId": "createPet",
          "requestBody": {
            "required": true,
            "content": {
              "application/json": { "schema": { "$ref": "#/components/schemas/NewPet" } }
            }
          },
          "responses": {
            "201": {
              "description": "Created",
              "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
              }
            }
          }
        }
      }
    },
    "components": {
      "schemas": {
        "Category": {
          "type": "object",
          "properties": { "id": { "type": "integer" }, "label": { "type": "string" } }
        },
        "NewPet": {
          "type": "object",
          "required": ["name"],
          "properties": {
            "name": { "type": "string" },
            "tag": { "type": "string" }
          }
        },
        "Pet": {
          "allOf": [
            { "$ref": "#/components/schemas/NewPet" },
            {
              "type": "object",
              "required": ["id"],
              "properties": {
                "id": { "type": "integer", "format": "int64" },
                "category": { "$ref": "#/components/schemas/Category" }
              }
            }
          ]
        },
        "Error": {
          "type": "object",
          "required": ["code", "message"],
          "properties": {
            "code": { "type": "integer", "format": "int32" },
            "message": { "type": "string" }
          }
        }
      }
    }
  })
}

pub(crate) fn expect_class<'a>(graph: &'a SchemaGraphContent, name: &str) -> &'a SchemaClass {
  graph
    .class_named(name)
    .unwrap_or_else(|| panic!("expected class {name}, got {:?}", class_names(graph)))
}

pub(crate) fn expect_property<'a>(class: &'a SchemaClass, local_key: &str) -> &'a SchemaProperty {
  class
    .property(local_key)
    .unwrap_or_else(|| panic!("expected property {local_key} on class {}", class.name))
}

pub(crate) fn expect_group<'a>(class: &'a SchemaClass, local_key: &str) -> &'a PropertyGroup {
  class
    .group(local_key)
    .unwrap_or_else(|| panic!("expected group {local_key} on class {}", class.name))
}

pub(crate) fn class_names(graph: &SchemaGraphContent) -> Vec<&str> {
  graph.classes.iter().map(|class| class.name.as_str()).collect()
}

pub(crate) fn member_keys(members: &[ClassMember]) -> Vec<&str> {
  members.iter().map(ClassMember::local_key).collect()
}
