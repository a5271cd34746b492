use anyhow::Context;
use json_canon::to_string as to_canonical_json;
use serde_json::{Map, Value, json};

use super::{ResolvedDocument, SchemaId};

/// Opaque representation of a schema's structural form.
///
/// Two schema nodes with the same structure (type, format, enum values, property names and nested shapes,
/// items and composition lists) produce equal canonical forms even when they are distinct nodes, regardless
/// of JSON key order or enum value order.
#[derive(Debug, Clone)]
pub struct CanonicalSchema(String);

impl CanonicalSchema {
  /// Creates the canonical form of the schema `id`.
  ///
  /// Nested shared component schemas contribute `{"$ref": name}` rather than their expanded content, and a
  /// node that is its own ancestor contributes `{"$recursive": distance}`, so the result is finite for
  /// cyclic documents. The value is serialized as RFC 8785 canonical JSON.
  pub fn from_document(document: &ResolvedDocument, id: SchemaId) -> anyhow::Result<Self> {
    let mut value = structural_value(document, id, &mut Vec::new(), true);

    normalize_schema_semantics(&mut value);

    let canonical_json = to_canonical_json(&value).context("Failed to create canonical JSON string")?;

    Ok(CanonicalSchema(canonical_json))
  }

  /// Returns the hex-encoded BLAKE3 digest of the canonical form.
  #[must_use]
  pub fn digest(&self) -> String {
    blake3::hash(self.0.as_bytes()).to_hex().to_string()
  }

  #[must_use]
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// Computes the structural content hash of a schema node.
///
/// Canonicalization only fails for values JSON cannot represent; in that case the plain JSON text is
/// digested instead so hashing never aborts a transformation.
pub(crate) fn content_hash(document: &ResolvedDocument, id: SchemaId) -> String {
  match CanonicalSchema::from_document(document, id) {
    Ok(canonical) => canonical.digest(),
    Err(error) => {
      tracing::debug!(schema = id.index(), %error, "falling back to non-canonical schema hash");
      let value = structural_value(document, id, &mut Vec::new(), true);
      blake3::hash(value.to_string().as_bytes()).to_hex().to_string()
    }
  }
}

fn structural_value(document: &ResolvedDocument, id: SchemaId, ancestors: &mut Vec<SchemaId>, top: bool) -> Value {
  if let Some(position) = ancestors.iter().rposition(|ancestor| *ancestor == id) {
    return json!({ "$recursive": ancestors.len() - position });
  }

  if !top && let Some(name) = document.component_name(id) {
    return json!({ "$ref": name });
  }

  let Some(schema) = document.get(id) else {
    return Value::Null;
  };

  ancestors.push(id);

  let mut map = Map::new();
  if !top && let Some(title) = &schema.title {
    map.insert("title".into(), Value::String(title.clone()));
  }
  if let Some(schema_type) = schema.schema_type {
    map.insert("type".into(), Value::String(schema_type.to_string()));
  }
  if schema.nullable {
    map.insert("nullable".into(), Value::Bool(true));
  }
  if let Some(format) = &schema.format {
    map.insert("format".into(), Value::String(format.clone()));
  }
  if !schema.enum_values.is_empty() {
    map.insert("enum".into(), Value::Array(schema.enum_values.clone()));
  }
  if !schema.properties.is_empty() {
    let properties = schema
      .properties
      .iter()
      .map(|(name, property)| (name.clone(), structural_value(document, *property, ancestors, false)))
      .collect::<Map<_, _>>();
    map.insert("properties".into(), Value::Object(properties));
  }
  if let Some(items) = schema.items {
    map.insert("items".into(), structural_value(document, items, ancestors, false));
  }
  for (kind, alternatives) in schema.combiners() {
    let values = alternatives
      .iter()
      .map(|alternative| structural_value(document, *alternative, ancestors, false))
      .collect();
    map.insert(kind.to_string(), Value::Array(values));
  }

  ancestors.pop();
  Value::Object(map)
}

/// Sorts order-independent JSON Schema arrays in-place for canonical comparison.
///
/// Recursively traverses the JSON value and alphabetically sorts the `type` and `enum` arrays when they
/// contain only string elements.
fn normalize_schema_semantics(value: &mut Value) {
  match value {
    Value::Object(map) => {
      if let Some(Value::Array(arr)) = map.get_mut("type") {
        sort_string_array_in_place(arr);
      }

      if let Some(Value::Array(arr)) = map.get_mut("enum") {
        sort_string_array_in_place(arr);
      }

      for value in map.values_mut() {
        normalize_schema_semantics(value);
      }
    }
    Value::Array(arr) => {
      for item in arr {
        normalize_schema_semantics(item);
      }
    }
    _ => {}
  }
}

/// Sorts a JSON array in-place if all elements are strings; otherwise leaves it unchanged.
///
/// Arrays containing any non-string elements are preserved in their original order so composition lists
/// keep their alternative order.
fn sort_string_array_in_place(arr: &mut Vec<Value>) {
  let mut strings: Vec<String> = arr.iter().filter_map(|v| v.as_str().map(String::from)).collect();

  if strings.len() == arr.len() {
    strings.sort_unstable();
    *arr = strings.into_iter().map(Value::String).collect();
  }
}
