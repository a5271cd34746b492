use http::Method;
use indexmap::IndexMap;
use serde_json::json;

use super::assert_consistent;
use crate::{
  ClassMember, CombinerKind, DiagramScope, DocumentBuilder, JsonType, ResolvedSchema, transform,
  document::{Header, Operation, Response},
  tests::support::{
    class_names, expect_class, expect_group, expect_property, member_keys, normalize_json, petstore,
    transform_response,
  },
};

#[test]
fn test_cyclic_self_reference_points_back_to_its_class() {
  let (_, graph) = transform_response(
    json!({ "$ref": "#/components/schemas/Pet" }),
    json!({
      "Pet": {
        "title": "Pet",
        "type": "object",
        "properties": {
          "id": { "type": "integer" },
          "owner": { "$ref": "#/components/schemas/Pet" }
        }
      }
    }),
  );

  assert_eq!(class_names(&graph), vec!["Pet"]);
  let pet = expect_class(&graph, "Pet");
  assert!(pet.is_class);
  assert_eq!(member_keys(&pet.properties), vec!["id", "owner"]);

  let owner = expect_property(pet, "owner");
  assert_eq!(owner.property_type, "Pet");
  let relations = graph.relations_from(&owner.key).collect::<Vec<_>>();
  assert_eq!(relations.len(), 1);
  assert_eq!(relations[0].class_key, pet.key, "owner should point back at Pet");
  assert!(relations[0].primary);
  assert_consistent(&graph);
}

#[test]
fn test_identical_inline_objects_collapse_into_one_class() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": {
        "a": { "type": "object", "properties": { "x": { "type": "string" } } },
        "b": { "type": "object", "properties": { "x": { "type": "string" } } }
      }
    }),
    json!({}),
  );

  assert_eq!(class_names(&graph), vec!["Response 200 (application/json)", "object"]);
  let root = expect_class(&graph, "Response 200 (application/json)");
  let shared = expect_class(&graph, "object");
  let a = expect_property(root, "a");
  let b = expect_property(root, "b");
  assert_eq!(
    shared.same_hash_objects,
    vec![a.schema, b.schema],
    "both inline objects are aliases of one class"
  );

  let targets = graph.relations_to(&shared.key).collect::<Vec<_>>();
  assert_eq!(targets.len(), 2);
  assert!(targets[0].primary, "the first relation is primary");
  assert!(!targets[1].primary);
  assert_consistent(&graph);
}

#[test]
fn test_required_propagates_from_any_alias() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": {
        "a": { "type": "object", "properties": { "x": { "type": "string" } } },
        "b": { "type": "object", "required": ["x"], "properties": { "x": { "type": "string" } } }
      }
    }),
    json!({}),
  );

  let shared = expect_class(&graph, "object");
  assert_eq!(shared.same_hash_objects.len(), 2);
  assert!(
    expect_property(shared, "x").required,
    "x is required because alias b requires it"
  );
}

#[test]
fn test_array_depth_renders_one_suffix_per_level() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": {
        "grid": { "type": "array", "items": { "type": "array", "items": { "type": "integer" } } },
        "tags": { "type": "array", "items": { "type": "string", "format": "uuid" } }
      }
    }),
    json!({}),
  );

  assert_eq!(graph.classes.len(), 1, "primitive arrays need no class of their own");
  let root = &graph.classes[0];
  assert_eq!(expect_property(root, "grid").property_type, "integer[][]");
  assert_eq!(expect_property(root, "tags").property_type, "string<uuid>[]");
}

#[test]
fn test_self_referential_array_renders_ellipsis() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": { "forest": { "$ref": "#/components/schemas/Tree" } }
    }),
    json!({
      "Tree": { "type": "array", "items": { "$ref": "#/components/schemas/Tree" } }
    }),
  );

  let root = expect_class(&graph, "Response 200 (application/json)");
  assert_eq!(expect_property(root, "forest").property_type, "Tree[]...");

  let tree = expect_class(&graph, "Tree");
  assert!(!tree.is_class);
  assert_eq!(expect_property(tree, "value").property_type, "Tree[]...");
  assert_consistent(&graph);
}

#[test]
fn test_all_of_is_flattened_without_combiner_class() {
  let (document, graph) = transform_response(
    json!({ "$ref": "#/components/schemas/Dog" }),
    json!({
      "Base": { "type": "object", "properties": { "id": { "type": "integer" } } },
      "Dog": {
        "allOf": [
          { "$ref": "#/components/schemas/Base" },
          { "type": "object", "properties": { "bark": { "type": "boolean" } } }
        ]
      }
    }),
  );

  assert_eq!(class_names(&graph), vec!["Dog"]);
  let dog = expect_class(&graph, "Dog");
  assert_eq!(member_keys(&dog.properties), vec!["id", "bark"]);
  assert!(
    dog.properties.iter().all(|member| matches!(member, ClassMember::Property(_))),
    "no group should be created for allOf"
  );
  let base = document.component("Base").expect("Base component");
  assert!(dog.shared_schema_objects.contains(&base));
}

#[test]
fn test_one_of_property_fans_out_into_alternatives() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": {
        "value": { "oneOf": [ { "type": "string" }, { "type": "integer" } ] }
      }
    }),
    json!({}),
  );

  assert_eq!(graph.classes.len(), 1, "primitive alternatives create no classes");
  assert!(graph.relations.is_empty());

  let root = &graph.classes[0];
  let group = expect_group(root, "value");
  assert_eq!(group.name, "value");
  assert_eq!(member_keys(&group.members), vec!["oneOf-0", "oneOf-1"]);
  assert_eq!(expect_property(root, "oneOf-0").property_type, "string");
  assert_eq!(expect_property(root, "oneOf-1").property_type, "integer");
  assert_eq!(expect_property(root, "oneOf-1").key, format!("{}/oneOf-1", group.key));
}

#[test]
fn test_root_union_connects_each_alternative() {
  let (_, graph) = transform_response(
    json!({
      "oneOf": [
        { "$ref": "#/components/schemas/Cat" },
        { "$ref": "#/components/schemas/Dog" }
      ]
    }),
    json!({
      "Cat": { "type": "object", "properties": { "meow": { "type": "boolean" } } },
      "Dog": { "type": "object", "properties": { "bark": { "type": "boolean" } } }
    }),
  );

  assert_eq!(class_names(&graph), vec!["Response 200 (application/json)", "Cat", "Dog"]);
  let root = expect_class(&graph, "Response 200 (application/json)");
  assert!(!root.is_class, "a pure combiner renders without a class box");

  let group = expect_group(root, "~oneOf");
  assert_eq!(member_keys(&group.members), vec!["oneOf-0", "oneOf-1"]);
  let cat = expect_class(&graph, "Cat");
  let first = expect_property(root, "oneOf-0");
  assert_eq!(first.property_type, "Cat");
  assert_eq!(
    graph.relations_from(&first.key).map(|relation| relation.class_key.as_str()).collect::<Vec<_>>(),
    vec![cat.key.as_str()]
  );
  assert_eq!(member_keys(&cat.properties), vec!["meow"]);
  assert_consistent(&graph);
}

#[test]
fn test_root_array_renders_value_property() {
  let document = normalize_json(petstore());
  let scope = DiagramScope::response("/pets", &Method::GET, "200", "application/json");
  let graph = transform(&document, &scope);

  assert_eq!(class_names(&graph), vec!["Response 200 (application/json)", "Pet", "Category"]);
  let root = expect_class(&graph, "Response 200 (application/json)");
  assert!(!root.is_class, "root arrays are demoted");
  let value = expect_property(root, "value");
  assert_eq!(value.property_type, "Pet[]");

  let pet = expect_class(&graph, "Pet");
  assert_eq!(member_keys(&pet.properties), vec!["name", "tag", "id", "category"]);
  assert!(expect_property(pet, "name").required);
  assert!(expect_property(pet, "id").required);
  assert!(!expect_property(pet, "tag").required);
  assert_eq!(expect_property(pet, "id").property_type, "integer<int64>");
  assert_eq!(expect_property(pet, "category").property_type, "Category");
  assert_consistent(&graph);
}

#[test]
fn test_scope_limits_graph_to_one_element() {
  let document = normalize_json(petstore());

  let request = DiagramScope::request_body("/pets", &Method::POST, "application/json");
  let graph = transform(&document, &request);
  assert_eq!(class_names(&graph), vec!["NewPet"], "only the request body is diagrammed");

  let error = DiagramScope::response("/pets", &Method::GET, "default", "application/json");
  let graph = transform(&document, &error);
  assert_eq!(class_names(&graph), vec!["Error"]);

  let missing = DiagramScope::response("/pets", &Method::DELETE, "200", "application/json");
  assert!(transform(&document, &missing).classes.is_empty());
}

#[test]
fn test_primitive_parameter_uses_contextual_title() {
  let document = normalize_json(petstore());
  let graph = transform(&document, &DiagramScope::parameter("/pets", &Method::GET, 0));

  assert_eq!(class_names(&graph), vec!["Parameter limit"]);
  let limit = &graph.classes[0];
  assert!(!limit.is_class);
  assert_eq!(expect_property(limit, "value").property_type, "integer<int64>");
}

#[test]
fn test_response_header_scope() {
  let mut builder = DocumentBuilder::new();
  let limit = builder.add(ResolvedSchema::builder().schema_type(JsonType::Integer).build());
  let mut headers = IndexMap::new();
  headers.insert(
    "X-Rate-Limit".to_string(),
    Header {
      required: true,
      deprecated: false,
      schema: Some(limit),
    },
  );
  let mut responses = IndexMap::new();
  responses.insert(
    "200".to_string(),
    Response {
      headers,
      content: IndexMap::new(),
    },
  );
  builder.add_operation(
    "/limits",
    Method::GET,
    Operation {
      responses,
      ..Default::default()
    },
  );
  let document = builder.build();

  let scope = DiagramScope::response_header("/limits", &Method::GET, "200", "X-Rate-Limit");
  let graph = transform(&document, &scope);
  assert_eq!(class_names(&graph), vec!["Response 200 Header X-Rate-Limit"]);
}

#[test]
fn test_deprecated_flags_are_independent() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": {
        "legacy": { "type": "string", "deprecated": true },
        "old": { "$ref": "#/components/schemas/OldThing" }
      }
    }),
    json!({
      "OldThing": { "type": "object", "deprecated": true, "properties": { "id": { "type": "integer" } } }
    }),
  );

  let root = expect_class(&graph, "Response 200 (application/json)");
  let legacy = expect_property(root, "legacy");
  assert!(legacy.deprecated);
  assert!(!legacy.type_deprecated);

  let old = expect_property(root, "old");
  assert!(!old.deprecated, "the property itself is not deprecated");
  assert!(old.type_deprecated, "its type is");
  assert!(expect_class(&graph, "OldThing").deprecated);
}

#[test]
fn test_deprecated_alias_marks_shared_class() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": {
        "current": { "type": "object", "properties": { "x": { "type": "string" } } },
        "legacy": { "type": "object", "deprecated": true, "properties": { "x": { "type": "string" } } }
      }
    }),
    json!({}),
  );

  let shared = expect_class(&graph, "object");
  assert_eq!(shared.same_hash_objects.len(), 2, "both objects collapse into one class");
  assert!(shared.deprecated, "a deprecated alias marks the whole class");
  assert_consistent(&graph);
}

#[test]
fn test_property_named_like_a_combiner_keeps_its_own_key() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "properties": { "oneOf": { "type": "string" } },
      "oneOf": [
        { "type": "object", "properties": { "a": { "type": "string" } } },
        { "type": "integer" }
      ]
    }),
    json!({}),
  );

  let root = expect_class(&graph, "Response 200 (application/json)");
  assert_eq!(member_keys(&root.properties), vec!["oneOf", "~oneOf"]);
  assert_eq!(expect_property(root, "oneOf").key, format!("{}/oneOf", root.key));
  let group = expect_group(root, "~oneOf");
  assert_eq!(group.key, format!("{}/~oneOf", root.key));
  assert_eq!(member_keys(&group.members), vec!["oneOf-0", "oneOf-1"]);
  assert_consistent(&graph);
}

#[test]
fn test_second_union_kind_on_property_is_a_sibling_group() {
  let (_, graph) = transform_response(
    json!({
      "type": "object",
      "required": ["v"],
      "properties": {
        "v": {
          "oneOf": [ { "type": "string" }, { "type": "integer" } ],
          "anyOf": [ { "type": "boolean" } ]
        }
      }
    }),
    json!({}),
  );

  let root = expect_class(&graph, "Response 200 (application/json)");
  assert_eq!(member_keys(&root.properties), vec!["v", "v~anyOf"]);

  let one_of = expect_group(root, "v");
  assert_eq!(one_of.combiner, CombinerKind::OneOf);
  assert_eq!(member_keys(&one_of.members), vec!["oneOf-0", "oneOf-1"]);

  let any_of = expect_group(root, "v~anyOf");
  assert_eq!(any_of.combiner, CombinerKind::AnyOf);
  assert_eq!(any_of.name, "v");
  assert!(one_of.required && any_of.required, "both groups belong to the required property");
  assert_eq!(member_keys(&any_of.members), vec!["anyOf-0"]);
  assert_eq!(expect_property(root, "anyOf-0").property_type, "boolean");
  assert_consistent(&graph);
}

#[test]
fn test_transform_is_idempotent() {
  let document = normalize_json(petstore());
  let scope = DiagramScope::response("/pets", &Method::GET, "200", "application/json");

  assert_eq!(transform(&document, &scope), transform(&document, &scope));
}

#[test]
fn test_scope_string_round_trip() {
  let scope = DiagramScope::request_body("/pets/{id}", &Method::PUT, "application/json");
  assert_eq!(scope.to_string(), "paths/~1pets~1{id}/put/requestBody/content/application~1json");

  let parsed: DiagramScope = scope.to_string().parse().expect("infallible");
  assert_eq!(parsed, scope);
}

#[test]
fn test_graph_json_uses_camel_case() {
  let document = normalize_json(petstore());
  let scope = DiagramScope::response("/pets", &Method::GET, "default", "application/json");
  let value = transform(&document, &scope).to_json().expect("serializable");

  let error = &value["classes"][0];
  assert_eq!(error["name"], "Error");
  assert_eq!(error["isClass"], true);
  assert_eq!(error["properties"][0]["kind"], "property");
  assert_eq!(error["properties"][0]["propertyType"], "integer<int32>");
  assert_eq!(error["properties"][0]["required"], true);
}
