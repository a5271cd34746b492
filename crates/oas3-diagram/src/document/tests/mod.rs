
use indexmap::IndexMap;

use super::{DocumentBuilder, JsonType, ResolvedSchema, SchemaId};

pub(super) fn string_schema(builder: &mut DocumentBuilder) -> SchemaId {
  builder.add(ResolvedSchema::builder().schema_type(JsonType::String).build())
}

pub(super) fn object_with(builder: &mut DocumentBuilder, properties: &[(&str, SchemaId)]) -> SchemaId {
  builder.add(object_schema(properties))
}

pub(super) fn object_schema(properties: &[(&str, SchemaId)]) -> ResolvedSchema {
  let properties = properties
    .iter()
    .map(|(name, id)| ((*name).to_string(), *id))
    .collect::<IndexMap<_, _>>();
  ResolvedSchema::builder()
    .schema_type(JsonType::Object)
    .properties(properties)
    .build()
}
