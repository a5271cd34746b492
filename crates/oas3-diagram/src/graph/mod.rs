//! Class-diagram graph produced by [`transformer::transform`].

pub mod builder;
pub mod naming;
pub mod transformer;

use serde::Serialize;

use crate::document::{CombinerKind, SchemaId};

/// One node per distinct schema, keyed by structural hash plus title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaClass {
  pub key: String,
  pub name: String,
  /// False for unwrapped primitives, pure combiners and root arrays, which render without a class box.
  pub is_class: bool,
  pub deprecated: bool,
  pub properties: Vec<ClassMember>,
  /// Every schema node that collapsed into this class, in first-seen order.
  pub same_hash_objects: Vec<SchemaId>,
  /// Shared component schemas the aliases were unified from.
  pub shared_schema_objects: Vec<SchemaId>,
}

impl SchemaClass {
  /// Returns the leaf property with the given local key, searching nested groups as well.
  #[must_use]
  pub fn property(&self, local_key: &str) -> Option<&SchemaProperty> {
    find_property(&self.properties, local_key)
  }

  #[must_use]
  pub fn group(&self, local_key: &str) -> Option<&PropertyGroup> {
    self.properties.iter().find_map(|member| match member {
      ClassMember::Group(group) if group.local_key == local_key => Some(group),
      _ => None,
    })
  }
}

fn find_property<'a>(members: &'a [ClassMember], local_key: &str) -> Option<&'a SchemaProperty> {
  members.iter().find_map(|member| match member {
    ClassMember::Property(property) if property.local_key == local_key => Some(property),
    ClassMember::Property(_) => None,
    ClassMember::Group(group) => find_property(&group.members, local_key),
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClassMember {
  Property(SchemaProperty),
  Group(PropertyGroup),
}

impl ClassMember {
  #[must_use]
  pub fn key(&self) -> &str {
    match self {
      Self::Property(property) => &property.key,
      Self::Group(group) => &group.key,
    }
  }

  #[must_use]
  pub fn local_key(&self) -> &str {
    match self {
      Self::Property(property) => &property.local_key,
      Self::Group(group) => &group.local_key,
    }
  }
}

/// A leaf field of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaProperty {
  pub key: String,
  pub local_key: String,
  /// Empty for synthesized `value` properties and combiner alternatives.
  pub name: String,
  /// Rendered type, with one `[]` per array level or `[]...` for a self-referential array.
  pub property_type: String,
  pub required: bool,
  pub deprecated: bool,
  pub type_deprecated: bool,
  pub schema: SchemaId,
  pub shared_schema_objects: Vec<SchemaId>,
}

/// The alternatives of a `oneOf`/`anyOf`, rendered as a nested list of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyGroup {
  pub key: String,
  pub local_key: String,
  pub name: String,
  pub combiner: CombinerKind,
  pub required: bool,
  pub deprecated: bool,
  pub schema: SchemaId,
  pub members: Vec<ClassMember>,
}

/// Directed edge from a property to the class its type resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRelation {
  pub property_key: String,
  pub class_key: String,
  /// True on the first relation that targets `class_key`.
  pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaGraphContent {
  pub classes: Vec<SchemaClass>,
  pub relations: Vec<SchemaRelation>,
}

impl SchemaGraphContent {
  #[must_use]
  pub fn class(&self, key: &str) -> Option<&SchemaClass> {
    self.classes.iter().find(|class| class.key == key)
  }

  #[must_use]
  pub fn class_named(&self, name: &str) -> Option<&SchemaClass> {
    self.classes.iter().find(|class| class.name == name)
  }

  pub fn relations_from<'a>(&'a self, property_key: &'a str) -> impl Iterator<Item = &'a SchemaRelation> {
    self
      .relations
      .iter()
      .filter(move |relation| relation.property_key == property_key)
  }

  pub fn relations_to<'a>(&'a self, class_key: &'a str) -> impl Iterator<Item = &'a SchemaRelation> {
    self
      .relations
      .iter()
      .filter(move |relation| relation.class_key == class_key)
  }

  pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(self)
  }
}

#[cfg(test)]
mod tests;
