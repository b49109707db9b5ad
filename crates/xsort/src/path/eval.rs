//! Node path evaluation
//!
//! Nodes are addressed by the child indexes leading to them from the
//! context element, so a selection can later be turned into mutable
//! references without holding borrows across the whole evaluation.

use std::collections::HashSet;

use crate::path::ast::{NameTest, NamespaceTest, Position, Predicate, Step};
use crate::path::NodeId;
use crate::xml::model::{Element, QName};
use crate::xml::namespace::NamespaceMap;

/// Evaluate `steps` from `context`, returning matches in selection order
pub fn select(steps: &[Step], context: &Element, namespaces: &NamespaceMap) -> Vec<NodeId> {
    let mut current: Vec<NodeId> = vec![Vec::new()];

    for step in steps {
        let mut next = Selection::default();
        match step {
            Step::SelfNode => return_all(&mut next, current),
            Step::Child(test) => {
                for id in &current {
                    let Some(node) = context.descendant(id) else {
                        continue;
                    };
                    for (index, child) in node.children.iter().enumerate() {
                        if element_matches(test, child, namespaces) {
                            next.push(child_id(id, index));
                        }
                    }
                }
            }
            Step::Descendant(test) => {
                for id in &current {
                    if let Some(node) = context.descendant(id) {
                        collect_descendants(test, node, id, namespaces, &mut next);
                    }
                }
            }
            Step::Parent => {
                for id in &current {
                    if let Some((_, parent)) = id.split_last() {
                        next.push(parent.to_vec());
                    }
                }
            }
            Step::Filter(predicate) => {
                for id in current {
                    if predicate_holds(predicate, context, &id, namespaces) {
                        next.push(id);
                    }
                }
            }
        }
        current = next.ids;
        if current.is_empty() {
            break;
        }
    }

    current
}

/// Ordered, duplicate-free list of node ids
#[derive(Default)]
struct Selection {
    ids: Vec<NodeId>,
    seen: HashSet<NodeId>,
}

impl Selection {
    fn push(&mut self, id: NodeId) {
        if self.seen.insert(id.clone()) {
            self.ids.push(id);
        }
    }
}

fn return_all(selection: &mut Selection, ids: Vec<NodeId>) {
    for id in ids {
        selection.push(id);
    }
}

fn child_id(parent: &[usize], index: usize) -> NodeId {
    let mut id = Vec::with_capacity(parent.len() + 1);
    id.extend_from_slice(parent);
    id.push(index);
    id
}

fn collect_descendants(
    test: &NameTest,
    node: &Element,
    id: &[usize],
    namespaces: &NamespaceMap,
    out: &mut Selection,
) {
    for (index, child) in node.children.iter().enumerate() {
        let child_id = child_id(id, index);
        if element_matches(test, child, namespaces) {
            out.push(child_id.clone());
        }
        collect_descendants(test, child, &child_id, namespaces, out);
    }
}

/// Whether `element` satisfies a name test
pub fn element_matches(test: &NameTest, element: &Element, namespaces: &NamespaceMap) -> bool {
    let NameTest::Name { namespace, local } = test else {
        return true;
    };
    if element.name.local != *local {
        return false;
    }
    let actual = element.namespace.as_deref();
    match namespace {
        NamespaceTest::Unqualified => actual == namespaces.default_namespace(),
        NamespaceTest::Prefix(prefix) => namespaces
            .resolve(prefix)
            .is_some_and(|uri| actual == Some(uri)),
        NamespaceTest::Uri(uri) => actual == Some(uri.as_str()),
        NamespaceTest::NoNamespace => actual.is_none(),
        NamespaceTest::Any => true,
    }
}

/// First attribute of `element` matching `test`.
///
/// Unprefixed attribute names never take the default namespace. Prefixed
/// ones are resolved against the document-wide map.
fn attribute<'e>(
    test: &NameTest,
    element: &'e Element,
    namespaces: &NamespaceMap,
) -> Option<&'e str> {
    element
        .attributes
        .iter()
        .filter(|(key, _)| element.get(key).is_some())
        .find(|(key, _)| {
            let NameTest::Name { namespace, local } = test else {
                return true;
            };
            let name = QName::parse(key);
            if name.local != *local {
                return false;
            }
            let uri = name.prefix.as_deref().and_then(|p| namespaces.resolve(p));
            match namespace {
                NamespaceTest::Unqualified | NamespaceTest::NoNamespace => name.prefix.is_none(),
                NamespaceTest::Prefix(prefix) => {
                    uri.is_some() && uri == namespaces.resolve(prefix)
                }
                NamespaceTest::Uri(expected) => uri == Some(expected.as_str()),
                NamespaceTest::Any => true,
            }
        })
        .map(|(_, value)| value.as_str())
}

fn predicate_holds(
    predicate: &Predicate,
    context: &Element,
    id: &[usize],
    namespaces: &NamespaceMap,
) -> bool {
    let Some(element) = context.descendant(id) else {
        return false;
    };
    match predicate {
        Predicate::HasAttribute(name) => attribute(name, element, namespaces).is_some(),
        Predicate::AttributeEquals {
            name,
            value,
            negated,
        } => attribute(name, element, namespaces)
            .is_some_and(|actual| (actual == value) != *negated),
        Predicate::HasChild(name) => element
            .children
            .iter()
            .any(|child| element_matches(name, child, namespaces)),
        Predicate::ChildTextEquals {
            name,
            value,
            negated,
        } => element
            .children
            .iter()
            .filter(|child| element_matches(name, child, namespaces))
            .any(|child| (child.text_content() == *value) != *negated),
        Predicate::TextEquals { value, negated } => {
            (element.text_content() == *value) != *negated
        }
        Predicate::Position(position) => position_holds(*position, context, id),
    }
}

/// Position among the siblings that share the element's expanded name
fn position_holds(position: Position, context: &Element, id: &[usize]) -> bool {
    let Some((&own_index, parent_id)) = id.split_last() else {
        return false;
    };
    let Some(parent) = context.descendant(parent_id) else {
        return false;
    };
    let Some(own) = parent.children.get(own_index) else {
        return false;
    };

    let same_name: Vec<usize> = parent
        .children
        .iter()
        .enumerate()
        .filter(|(_, sibling)| sibling.name.local == own.name.local && sibling.namespace == own.namespace)
        .map(|(index, _)| index)
        .collect();

    let wanted = match position {
        Position::Index(n) => n.checked_sub(1),
        Position::FromLast(back) => same_name.len().checked_sub(back + 1),
    };
    wanted.and_then(|i| same_name.get(i)) == Some(&own_index)
}
