mod transformer;

use crate::graph::{ClassMember, SchemaGraphContent};

/// Asserts the graph's internal references line up: unique class keys and relations between known nodes.
pub(super) fn assert_consistent(graph: &SchemaGraphContent) {
  let mut keys = graph.classes.iter().map(|class| class.key.as_str()).collect::<Vec<_>>();
  keys.sort_unstable();
  let total = keys.len();
  keys.dedup();
  assert_eq!(keys.len(), total, "class keys must be unique");

  let mut member_keys = vec![];
  for class in &graph.classes {
    collect_member_keys(&class.properties, &mut member_keys);
  }
  member_keys.sort_unstable();
  let total = member_keys.len();
  member_keys.dedup();
  assert_eq!(member_keys.len(), total, "member keys must be unique");

  for relation in &graph.relations {
    assert!(
      graph.class(&relation.class_key).is_some(),
      "relation targets unknown class {}",
      relation.class_key
    );
    assert!(
      graph
        .classes
        .iter()
        .any(|class| has_member_key(&class.properties, &relation.property_key)),
      "relation starts at unknown property {}",
      relation.property_key
    );
  }
}

fn has_member_key(members: &[ClassMember], key: &str) -> bool {
  members.iter().any(|member| match member {
    ClassMember::Property(property) => property.key == key,
    ClassMember::Group(group) => group.key == key || has_member_key(&group.members, key),
  })
}

fn collect_member_keys<'a>(members: &'a [ClassMember], keys: &mut Vec<&'a str>) {
  for member in members {
    keys.push(member.key());
    if let ClassMember::Group(group) = member {
      collect_member_keys(&group.members, keys);
    }
  }
}
