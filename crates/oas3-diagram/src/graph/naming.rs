use itertools::Itertools;

use crate::document::{ResolvedDocument, ResolvedSchema, SchemaId};

const UNKNOWN: &str = "unknown";

/// How many array levels wrap a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDepth {
  Finite(usize),
  /// The `items` chain revisits one of its own arrays.
  Unbounded,
}

impl ArrayDepth {
  #[must_use]
  pub fn deeper(self, extra: usize) -> Self {
    match self {
      Self::Finite(depth) => Self::Finite(depth + extra),
      Self::Unbounded => Self::Unbounded,
    }
  }

  #[must_use]
  pub fn suffix(self) -> String {
    match self {
      Self::Finite(depth) => "[]".repeat(depth),
      Self::Unbounded => "[]...".to_string(),
    }
  }
}

/// The schema found at the end of an array chain, with the number of arrays passed on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayTarget {
  pub schema: SchemaId,
  pub depth: ArrayDepth,
}

/// Follows `items` from `id` until a non-array schema is reached.
///
/// A chain that comes back to an array it already passed stops there with [`ArrayDepth::Unbounded`].
#[must_use]
pub fn extract_target_value(document: &ResolvedDocument, id: SchemaId) -> ArrayTarget {
  let mut seen = vec![];
  let mut current = id;

  while let Some(schema) = document.get(current)
    && schema.is_array()
    && let Some(items) = schema.items
  {
    if seen.contains(&current) {
      return ArrayTarget {
        schema: current,
        depth: ArrayDepth::Unbounded,
      };
    }
    seen.push(current);
    current = items;
  }

  ArrayTarget {
    schema: current,
    depth: ArrayDepth::Finite(seen.len()),
  }
}

/// Dedup key of a class: structural hash followed by the explicit or synthetic title.
#[must_use]
pub fn class_key(document: &ResolvedDocument, id: SchemaId) -> String {
  format!("{}{}", document.content_hash(id), document.title(id).unwrap_or_default())
}

/// Display name of a class.
///
/// Title, then the caller's contextual title, then the `oneOf`/`anyOf` kinds, then the type.
#[must_use]
pub fn schema_name(document: &ResolvedDocument, id: SchemaId, alternative_title: Option<&str>) -> String {
  if let Some(title) = document.title(id) {
    return title.to_string();
  }
  if let Some(title) = alternative_title.filter(|title| !title.is_empty()) {
    return title.to_string();
  }
  let Some(schema) = document.get(id) else {
    return UNKNOWN.to_string();
  };
  combiner_name(schema)
    .or_else(|| schema.schema_type.map(|schema_type| schema_type.to_string()))
    .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Rendered type of a property pointing at `id`, without array suffix.
#[must_use]
pub fn property_type_name(document: &ResolvedDocument, id: SchemaId) -> String {
  if let Some(title) = document.title(id) {
    return title.to_string();
  }
  let Some(schema) = document.get(id) else {
    return UNKNOWN.to_string();
  };
  if let Some(name) = combiner_name(schema) {
    return name;
  }
  match (schema.schema_type, &schema.format) {
    (Some(schema_type), Some(format)) => format!("{schema_type}<{format}>"),
    (Some(schema_type), None) => schema_type.to_string(),
    (None, _) => UNKNOWN.to_string(),
  }
}

fn combiner_name(schema: &ResolvedSchema) -> Option<String> {
  schema
    .has_union()
    .then(|| schema.union_kinds().map(|kind| kind.to_string()).join(" | "))
}
