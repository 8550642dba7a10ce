//! Id → activity-name map shared by the compiler, synthesizer and enhancer

use crate::model::{is_sentinel, NodeId, EMPTY_INTENT};
use serde::Serialize;
use std::collections::BTreeMap;

/// Mapping from node id to its canonical activity name
///
/// A `None` name is legal (a bot action without a function name) and is
/// rendered as an invisible transition, like the sentinel names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NameMap(BTreeMap<NodeId, Option<String>>);

impl NameMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a name
    pub fn insert(&mut self, id: NodeId, name: Option<String>) {
        self.0.insert(id, name);
    }

    /// Register the `empty_intent` sentinel node if it is not yet known
    pub fn ensure_empty_intent(&mut self) {
        self.0
            .entry(NodeId::empty_intent())
            .or_insert_with(|| Some(EMPTY_INTENT.to_string()));
    }

    /// Whether the id has an entry (possibly with a `None` name)
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.0.contains_key(id)
    }

    /// Name of a node; outer `None` means unknown id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<Option<&str>> {
        self.0.get(id).map(Option::as_deref)
    }

    /// Name of a node, flattening unknown ids and missing names
    #[inline]
    #[must_use]
    pub fn name_of(&self, id: &NodeId) -> Option<&str> {
        self.get(id).flatten()
    }

    /// Visible label for a node: `None` for unknown ids, missing names and
    /// sentinel names
    #[must_use]
    pub fn visible_label(&self, id: &NodeId) -> Option<&str> {
        self.name_of(id).filter(|name| !is_sentinel(name))
    }

    /// First id (ascending) carrying the given name
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<&NodeId> {
        self.0
            .iter()
            .find(|(_, n)| n.as_deref() == Some(name))
            .map(|(id, _)| id)
    }

    /// Iterate entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Option<&str>)> {
        self.0.iter().map(|(id, name)| (id, name.as_deref()))
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(NodeId, Option<String>)> for NameMap {
    fn from_iter<I: IntoIterator<Item = (NodeId, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_label_hides_sentinels() {
        let mut names = NameMap::new();
        names.insert(NodeId::from("a"), Some("greet".into()));
        names.insert(NodeId::from("b"), Some("empty_activity".into()));
        names.insert(NodeId::from("c"), None);
        names.ensure_empty_intent();

        assert_eq!(names.visible_label(&NodeId::from("a")), Some("greet"));
        assert_eq!(names.visible_label(&NodeId::from("b")), None);
        assert_eq!(names.visible_label(&NodeId::from("c")), None);
        assert_eq!(names.visible_label(&NodeId::empty_intent()), None);
        assert_eq!(names.get(&NodeId::from("c")), Some(None));
        assert_eq!(names.get(&NodeId::from("zzz")), None);
    }

    #[test]
    fn id_by_name_picks_lowest_id() {
        let names: NameMap = [
            (NodeId::from("n2"), Some("menu".to_string())),
            (NodeId::from("n1"), Some("menu".to_string())),
        ]
        .into_iter()
        .collect();
        assert_eq!(names.id_by_name("menu"), Some(&NodeId::from("n1")));
        assert_eq!(names.id_by_name("other"), None);
    }

    #[test]
    fn ensure_empty_intent_keeps_existing_entry() {
        let mut names = NameMap::new();
        names.insert(NodeId::empty_intent(), None);
        names.ensure_empty_intent();
        assert_eq!(names.get(&NodeId::empty_intent()), Some(None));
        assert_eq!(names.len(), 1);
    }
}
