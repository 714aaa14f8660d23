//! Tree Index
//!
//! Groups catalog abilities by tree, each ladder sorted ascending by level.
//! Total and side-effect free; trees come back in name order.

use crate::catalog::Ability;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    trees: BTreeMap<String, Vec<Ability>>,
}

impl TreeIndex {
    pub fn by_tree<'a>(abilities: impl IntoIterator<Item = &'a Ability>) -> Self {
        let mut trees: BTreeMap<String, Vec<Ability>> = BTreeMap::new();
        for ability in abilities {
            trees
                .entry(ability.tree.clone())
                .or_default()
                .push(ability.clone());
        }
        // Stable sort keeps catalog order among equal levels
        for ladder in trees.values_mut() {
            ladder.sort_by_key(|a| a.level);
        }
        Self { trees }
    }

    /// Abilities of `tree` in level order, empty if the tree is unknown
    pub fn tree(&self, tree: &str) -> &[Ability] {
        self.trees.get(tree).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tree_names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Ability])> {
        self.trees.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
