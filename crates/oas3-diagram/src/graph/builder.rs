use std::collections::{HashMap, HashSet};

use crate::{
  document::{CombinerKind, ResolvedDocument, ResolvedSchema, SchemaId, path::escape_segment},
  graph::{
    ClassMember, PropertyGroup, SchemaClass, SchemaGraphContent, SchemaProperty, SchemaRelation,
    naming::{self, ArrayDepth, ArrayTarget},
  },
  walker::Walk,
};

#[derive(Debug)]
struct ClassNode {
  key: String,
  name: String,
  is_class: bool,
  deprecated: bool,
  members: Vec<usize>,
  same_hash_objects: Vec<SchemaId>,
  shared_schema_objects: Vec<SchemaId>,
}

#[derive(Debug)]
struct GroupNode {
  combiner: CombinerKind,
  members: Vec<usize>,
}

#[derive(Debug)]
struct MemberNode {
  key: String,
  local_key: String,
  name: String,
  /// Declared property names take part in `required` resolution; synthesized members do not.
  named: bool,
  property_type: String,
  deprecated: bool,
  type_deprecated: bool,
  schema: SchemaId,
  /// `schema` with its array wrappers removed.
  target: SchemaId,
  owner_class: usize,
  shared_schema_objects: Vec<SchemaId>,
  group: Option<GroupNode>,
}

#[derive(Debug, Clone, Copy)]
enum Container {
  Class(usize),
  Group(usize),
}

#[derive(Debug, Clone, Copy)]
struct PropertyFrame {
  member: usize,
  /// Depth of the container stack right after the property was created.
  containers: usize,
}

/// The context stacks one create call pushed to. [`GraphBuilder::back`] pops exactly those.
#[derive(Debug, Clone, Copy)]
struct UndoAction {
  container: bool,
  property: bool,
  combiner: bool,
}

impl UndoAction {
  const NONE: Self = Self {
    container: false,
    property: false,
    combiner: false,
  };
}

/// Accumulates classes, members and relations while a walk drives it.
///
/// Every `create_*` call records exactly one undo entry, including calls that had nothing to do, so the
/// walker's end hooks can call [`GraphBuilder::back`] unconditionally. Calls made without the context they
/// need (no open class, no open combiner) are no-ops.
#[derive(Debug)]
pub struct GraphBuilder<'doc> {
  document: &'doc ResolvedDocument,
  classes: Vec<ClassNode>,
  class_keys: HashMap<String, usize>,
  members: Vec<MemberNode>,
  relations: Vec<(usize, usize)>,
  containers: Vec<Container>,
  properties: Vec<PropertyFrame>,
  combiners: Vec<CombinerKind>,
  undo: Vec<UndoAction>,
}

impl<'doc> GraphBuilder<'doc> {
  #[must_use]
  pub fn new(document: &'doc ResolvedDocument) -> Self {
    Self {
      document,
      classes: vec![],
      class_keys: HashMap::new(),
      members: vec![],
      relations: vec![],
      containers: vec![],
      properties: vec![],
      combiners: vec![],
      undo: vec![],
    }
  }

  /// Opens the class of a standalone schema (parameter, request or response body).
  ///
  /// Returns [`Walk::Skip`] when an identical class already exists, since its members are already known.
  pub fn create_root_schema(&mut self, schema: SchemaId, alternative_title: Option<&str>) -> Walk {
    if self.document.get(schema).is_none() {
      tracing::trace!(schema = schema.index(), "root schema not in document");
      self.undo.push(UndoAction::NONE);
      return Walk::Skip;
    }

    let (class, is_new) = self.get_or_create_class(schema, alternative_title);
    self.containers.push(Container::Class(class));
    self.undo.push(UndoAction {
      container: true,
      ..UndoAction::NONE
    });
    if is_new { Walk::Recurse } else { Walk::Skip }
  }

  /// Adds a property to the open container and connects it to the class of its type, if that type has one.
  pub fn create_property_and_connection(
    &mut self,
    name: &str,
    key: &str,
    schema: SchemaId,
    is_synthetic: bool,
    extra_array_depth: usize,
  ) -> Walk {
    let (action, walk) = self.create_member(name, key, schema, is_synthetic, extra_array_depth);
    self.undo.push(action);
    walk
  }

  /// Connects the most recent property to the class of `schema` and opens that class if it is new.
  pub fn create_nested_schema_and_connection(&mut self, schema: SchemaId) -> Walk {
    let Some(frame) = self.properties.last().copied() else {
      tracing::trace!(schema = schema.index(), "no open property to connect");
      self.undo.push(UndoAction::NONE);
      return Walk::Skip;
    };

    let (pushed, walk) = self.connect_nested(frame.member, schema);
    self.undo.push(UndoAction {
      container: pushed,
      ..UndoAction::NONE
    });
    walk
  }

  /// Renders a root-level array as a non-class holding one `value` property typed after the array's items.
  ///
  /// `items` is the array's element schema; the array itself counts as one extra level.
  pub fn create_root_array_property_and_connection(&mut self, items: SchemaId) -> Walk {
    let Some(Container::Class(class)) = self.containers.last().copied() else {
      self.undo.push(UndoAction::NONE);
      return Walk::Skip;
    };
    // primitive arrays already carry their synthesized value property
    if !self.classes[class].members.is_empty() {
      self.undo.push(UndoAction::NONE);
      return Walk::Skip;
    }

    self.classes[class].is_class = false;
    let (action, walk) = self.create_member("", "value", items, true, 1);
    self.undo.push(action);
    walk
  }

  /// Adds the alternative at `index` of the innermost open combiner, keyed `<combiner>-<index>`.
  pub fn create_alternative_combiner_property_and_connection(&mut self, index: usize, schema: SchemaId) -> Walk {
    let Some(&kind) = self.combiners.last() else {
      tracing::trace!(schema = schema.index(), "alternative outside of a combiner");
      self.undo.push(UndoAction::NONE);
      return Walk::Skip;
    };

    let (action, walk) = self.create_member("", &format!("{kind}-{index}"), schema, true, 0);
    self.undo.push(action);
    walk
  }

  /// Opens a combiner of `owner`.
  ///
  /// `oneOf`/`anyOf` open a group: the open property itself when it was created for `owner` as a group of
  /// that kind, a sibling group when the property already groups the other union kind, otherwise a new
  /// group member named after the combiner. `allOf` branches are merged into their owner
  /// before the walk, so an `allOf` only records its kind and is skipped.
  pub fn create_combiner(&mut self, kind: CombinerKind, owner: SchemaId) -> Walk {
    self.combiners.push(kind);
    if kind == CombinerKind::AllOf {
      self.undo.push(UndoAction {
        combiner: true,
        ..UndoAction::NONE
      });
      return Walk::Skip;
    }

    let property_group = self
      .properties
      .last()
      .filter(|frame| frame.containers == self.containers.len())
      .map(|frame| frame.member)
      .filter(|&member| self.members[member].target == owner && self.members[member].group.is_some());

    let Some(&container) = self.containers.last() else {
      tracing::trace!(owner = owner.index(), %kind, "combiner outside of a class");
      self.undo.push(UndoAction {
        combiner: true,
        ..UndoAction::NONE
      });
      return Walk::Skip;
    };

    let group = match property_group {
      Some(member) if self.members[member].group.as_ref().is_some_and(|group| group.combiner == kind) => member,
      // a second union kind on the same property sits next to the first one
      Some(member) => self.create_group(container, kind, owner, Some(member)),
      None => self.create_group(container, kind, owner, None),
    };

    self.containers.push(Container::Group(group));
    self.undo.push(UndoAction {
      container: true,
      property: false,
      combiner: true,
    });
    Walk::Recurse
  }

  /// Pops whatever the most recent create call pushed.
  pub fn back(&mut self) {
    let Some(action) = self.undo.pop() else {
      tracing::trace!("back called without a matching create");
      return;
    };
    if action.combiner {
      self.combiners.pop();
    }
    if action.container {
      self.containers.pop();
    }
    if action.property {
      self.properties.pop();
    }
  }

  /// Returns the accumulated graph.
  ///
  /// `required` is resolved here against every alias of the owning class, and the first relation to each
  /// class is marked primary.
  #[must_use]
  pub fn build(self) -> SchemaGraphContent {
    let mut targeted = HashSet::new();
    let relations = self
      .relations
      .iter()
      .map(|&(member, class)| SchemaRelation {
        property_key: self.members[member].key.clone(),
        class_key: self.classes[class].key.clone(),
        primary: targeted.insert(class),
      })
      .collect();

    let classes = self
      .classes
      .iter()
      .map(|class| SchemaClass {
        key: class.key.clone(),
        name: class.name.clone(),
        is_class: class.is_class,
        deprecated: class.deprecated,
        properties: class
          .members
          .iter()
          .map(|&member| self.export_member(member, class))
          .collect(),
        same_hash_objects: class.same_hash_objects.clone(),
        shared_schema_objects: class.shared_schema_objects.clone(),
      })
      .collect();

    SchemaGraphContent { classes, relations }
  }

  fn export_member(&self, member: usize, class: &ClassNode) -> ClassMember {
    let node = &self.members[member];
    let required = node.named
      && class
        .same_hash_objects
        .iter()
        .filter_map(|alias| self.document.get(*alias))
        .any(|alias| alias.required.contains(&node.name));

    match &node.group {
      Some(group) => ClassMember::Group(PropertyGroup {
        key: node.key.clone(),
        local_key: node.local_key.clone(),
        name: node.name.clone(),
        combiner: group.combiner,
        required,
        deprecated: node.deprecated,
        schema: node.schema,
        members: group
          .members
          .iter()
          .map(|&child| self.export_member(child, class))
          .collect(),
      }),
      None => ClassMember::Property(SchemaProperty {
        key: node.key.clone(),
        local_key: node.local_key.clone(),
        name: node.name.clone(),
        property_type: node.property_type.clone(),
        required,
        deprecated: node.deprecated,
        type_deprecated: node.type_deprecated,
        schema: node.schema,
        shared_schema_objects: node.shared_schema_objects.clone(),
      }),
    }
  }

  /// Dedup: one class per (content hash, title).
  fn get_or_create_class(&mut self, schema: SchemaId, alternative_title: Option<&str>) -> (usize, bool) {
    let document = self.document;
    let key = naming::class_key(document, schema);

    if let Some(&index) = self.class_keys.get(&key) {
      let class = &mut self.classes[index];
      if !class.same_hash_objects.contains(&schema) {
        class.same_hash_objects.push(schema);
      }
      class.deprecated |= document.get(schema).is_some_and(|alias| alias.deprecated);
      for shared in document.shared_schemas(schema) {
        if !class.shared_schema_objects.contains(&shared) {
          class.shared_schema_objects.push(shared);
        }
      }
      tracing::trace!(key = %key, schema = schema.index(), "reusing class");
      return (index, false);
    }

    let ArrayTarget { schema: unwrapped, depth } = naming::extract_target_value(document, schema);
    let is_primitive = document
      .get(unwrapped)
      .is_some_and(|target| target.is_primitive() && !target.has_combiner());
    let is_self_array = depth == ArrayDepth::Unbounded;
    let is_pure_combiner = document.get(schema).is_some_and(ResolvedSchema::is_pure_combiner);

    let index = self.classes.len();
    let name = naming::schema_name(document, schema, alternative_title);
    tracing::debug!(key = %key, name = %name, schema = schema.index(), "creating class");

    self.classes.push(ClassNode {
      key: key.clone(),
      name,
      is_class: !(is_primitive || is_self_array || is_pure_combiner),
      deprecated: document.get(schema).is_some_and(|declared| declared.deprecated),
      members: vec![],
      same_hash_objects: vec![schema],
      shared_schema_objects: document.shared_schemas(schema),
    });
    self.class_keys.insert(key.clone(), index);

    if is_primitive || is_self_array {
      let member = self.members.len();
      self.members.push(MemberNode {
        key: format!("{key}/value"),
        local_key: "value".to_string(),
        name: String::new(),
        named: false,
        property_type: format!("{}{}", naming::property_type_name(document, unwrapped), depth.suffix()),
        deprecated: false,
        type_deprecated: false,
        schema,
        target: unwrapped,
        owner_class: index,
        shared_schema_objects: vec![],
        group: None,
      });
      self.classes[index].members.push(member);
    }

    (index, true)
  }

  fn create_member(
    &mut self,
    name: &str,
    local_key: &str,
    schema: SchemaId,
    is_synthetic: bool,
    extra_array_depth: usize,
  ) -> (UndoAction, Walk) {
    let document = self.document;
    let Some(&container) = self.containers.last() else {
      tracing::trace!(property = name, "no open class for property");
      return (UndoAction::NONE, Walk::Skip);
    };
    let Some(declared) = document.get(schema) else {
      return (UndoAction::NONE, Walk::Skip);
    };

    let ArrayTarget { schema: target, depth } = naming::extract_target_value(document, schema);
    let Some(target_schema) = document.get(target) else {
      return (UndoAction::NONE, Walk::Skip);
    };
    let shared_target = document.is_shared(target);

    let group = if !shared_target && target_schema.is_pure_combiner() {
      target_schema.union_kinds().next().map(|combiner| GroupNode {
        combiner,
        members: vec![],
      })
    } else {
      None
    };
    let is_group = group.is_some();
    let key = format!("{}/{}", self.container_key(container), escape_segment(local_key));
    let owner_class = self.container_class(container);

    let member = self.members.len();
    self.members.push(MemberNode {
      key,
      local_key: local_key.to_string(),
      name: name.to_string(),
      named: !is_synthetic,
      property_type: format!(
        "{}{}",
        naming::property_type_name(document, target),
        depth.deeper(extra_array_depth).suffix()
      ),
      deprecated: declared.deprecated && !document.is_shared(schema),
      type_deprecated: target_schema.deprecated && (target != schema || shared_target),
      schema,
      target,
      owner_class,
      shared_schema_objects: document.shared_schemas(target),
      group,
    });
    self.attach(container, member);
    self.properties.push(PropertyFrame {
      member,
      containers: self.containers.len(),
    });

    if is_group {
      return (
        UndoAction {
          property: true,
          ..UndoAction::NONE
        },
        Walk::Recurse,
      );
    }

    let (pushed, walk) = self.connect_nested(member, target);
    (
      UndoAction {
        container: pushed,
        property: true,
        combiner: false,
      },
      walk,
    )
  }

  /// Records a relation from `member` to the class of `target` when `target` deserves a class of its own.
  /// Returns whether a new class was opened.
  fn connect_nested(&mut self, member: usize, target: SchemaId) -> (bool, Walk) {
    let document = self.document;
    let Some(schema) = document.get(target) else {
      return (false, Walk::Skip);
    };
    if !(schema.is_object_shaped() || schema.has_combiner() || document.is_shared(target)) {
      return (false, Walk::Skip);
    }

    let (class, is_new) = self.get_or_create_class(target, None);
    self.relations.push((member, class));
    if is_new {
      self.containers.push(Container::Class(class));
      (true, Walk::Recurse)
    } else {
      (false, Walk::Skip)
    }
  }

  /// Adds a group member, either for the container itself or next to the group of `sibling_of`.
  ///
  /// Group keys end in a bare `~` followed by the combiner kind, which escaped property names never contain.
  fn create_group(
    &mut self,
    container: Container,
    kind: CombinerKind,
    owner: SchemaId,
    sibling_of: Option<usize>,
  ) -> usize {
    let (name, named, local_key, segment) = match sibling_of.map(|member| &self.members[member]) {
      Some(property) => (
        property.name.clone(),
        property.named,
        format!("{}~{kind}", property.local_key),
        format!("{}~{kind}", escape_segment(&property.local_key)),
      ),
      None => (kind.to_string(), false, format!("~{kind}"), format!("~{kind}")),
    };
    let key = format!("{}/{segment}", self.container_key(container));
    let owner_class = self.container_class(container);

    let member = self.members.len();
    self.members.push(MemberNode {
      key,
      local_key,
      name,
      named,
      property_type: String::new(),
      deprecated: false,
      type_deprecated: false,
      schema: owner,
      target: owner,
      owner_class,
      shared_schema_objects: vec![],
      group: Some(GroupNode {
        combiner: kind,
        members: vec![],
      }),
    });
    self.attach(container, member);
    member
  }

  fn attach(&mut self, container: Container, member: usize) {
    match container {
      Container::Class(class) => self.classes[class].members.push(member),
      Container::Group(owner) => {
        if let Some(group) = self.members[owner].group.as_mut() {
          group.members.push(member);
        }
      }
    }
  }

  fn container_key(&self, container: Container) -> &str {
    match container {
      Container::Class(class) => &self.classes[class].key,
      Container::Group(member) => &self.members[member].key,
    }
  }

  fn container_class(&self, container: Container) -> usize {
    match container {
      Container::Class(class) => class,
      Container::Group(member) => self.members[member].owner_class,
    }
  }
}
