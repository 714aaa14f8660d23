//! Gate Calculator
//!
//! One ability unlocks at a time per tree: the only selectable level is the
//! one directly above the highest level already selected in that tree.

use crate::catalog::Ability;

/// Next selectable level in `tree`: 1 when nothing is selected, else max + 1.
/// Abilities from other trees in `selected` are ignored.
pub fn lowest_available_level<'a>(
    tree: &str,
    selected: impl IntoIterator<Item = &'a Ability>,
) -> u32 {
    selected
        .into_iter()
        .filter(|a| a.tree == tree)
        .map(|a| a.level)
        .max()
        .map_or(1, |max| max + 1)
}

pub fn is_selectable<'a>(
    ability: &Ability,
    selected_in_tree: impl IntoIterator<Item = &'a Ability>,
) -> bool {
    ability.level == lowest_available_level(&ability.tree, selected_in_tree)
}
