//! Ability Catalog
//!
//! Read-only reference data the engine consumes: abilities, classes and the
//! tree requirements that gate hybrid specializations. A catalog is loaded once
//! per session and shared freely between ledgers; nothing in the engine ever
//! mutates it.
//!
//! Catalog files are JSON or RON with three top-level lists:
//! `abilities`, `classes` and `tree_requirements`.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A single unlockable ability on a leveled tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    pub tree: String,
    /// Position on the tree ladder, starting at 1
    pub level: u32,
}

/// How a class participates in progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    /// Selectable as a primary class; grants core trees
    Core,
    /// Advanced version of one core class, taken as a specialization
    Advanced,
    /// Cross-class specialization gated by tree requirements
    Hybrid,
}

impl ClassKind {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Core => "Core",
            Self::Advanced => "Advanced",
            Self::Hybrid => "Hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecializationClass {
    pub id: String,
    pub name: String,
    pub kind: ClassKind,
    /// Trees granted as a primary class (Core only)
    #[serde(default)]
    pub core_trees: Vec<String>,
    /// Tree unlocked by taking this class as a specialization
    #[serde(default)]
    pub specialization_tree: Option<String>,
    #[serde(default)]
    pub legendary_ability_names: Vec<String>,
    /// For Advanced classes: the Core class this is the advanced version of
    #[serde(default)]
    pub advanced_of: Option<String>,
    /// Policy flag; `false` shuts off specializations for this primary class
    #[serde(default = "default_allows_specialization")]
    pub allows_specialization: bool,
}

fn default_allows_specialization() -> bool {
    true
}

impl SpecializationClass {
    pub fn has_core_tree(&self, tree: &str) -> bool {
        self.core_trees.iter().any(|t| t == tree)
    }

    pub fn has_legendary(&self, ability_name: &str) -> bool {
        self.legendary_ability_names.iter().any(|n| n == ability_name)
    }

    pub fn grants_specialization_tree(&self, tree: &str) -> bool {
        self.specialization_tree.as_deref() == Some(tree)
    }
}

/// A hybrid tree is unlockable once any of `required_trees` is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRequirement {
    pub tree: String,
    pub required_trees: Vec<String>,
}

/// Anything that can hand the engine its reference data
pub trait CatalogSource {
    fn list_abilities(&self) -> Vec<Ability>;
    fn list_classes(&self) -> Vec<SpecializationClass>;
    fn list_tree_requirements(&self) -> Vec<TreeRequirement>;
}

/// Raw catalog file contents, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub classes: Vec<SpecializationClass>,
    #[serde(default)]
    pub tree_requirements: Vec<TreeRequirement>,
}

/// Validated, indexed catalog snapshot
#[derive(Debug, Clone)]
pub struct AbilityCatalog {
    data: CatalogData,
    ability_index: HashMap<String, usize>,
    class_index: HashMap<String, usize>,
}

impl AbilityCatalog {
    pub fn new(data: CatalogData) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(data.abilities.len());
        for ability in &data.abilities {
            if ability.level == 0 {
                return Err(CatalogError::InvalidLevel {
                    id: ability.id.clone(),
                    level: ability.level,
                });
            }
            if !seen.insert(ability.id.as_str()) {
                return Err(CatalogError::DuplicateAbility(ability.id.clone()));
            }
        }

        let mut class_ids = HashSet::with_capacity(data.classes.len());
        for class in &data.classes {
            if !class_ids.insert(class.id.as_str()) {
                return Err(CatalogError::DuplicateClass(class.id.clone()));
            }
        }

        for class in data.classes.iter().filter(|c| c.kind == ClassKind::Advanced) {
            let base_ok = class
                .advanced_of
                .as_deref()
                .is_some_and(|base| class_ids.contains(base));
            if !base_ok {
                return Err(CatalogError::UnknownBaseClass {
                    class_id: class.id.clone(),
                    base_id: class.advanced_of.clone(),
                });
            }
        }

        Ok(Self::indexed(data))
    }

    fn indexed(data: CatalogData) -> Self {
        let ability_index = data
            .abilities
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
        let class_index = data
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self {
            data,
            ability_index,
            class_index,
        }
    }

    /// Snapshot any [`CatalogSource`] into a validated catalog
    pub fn from_source(source: &impl CatalogSource) -> Result<Self, CatalogError> {
        Self::new(CatalogData {
            abilities: source.list_abilities(),
            classes: source.list_classes(),
            tree_requirements: source.list_tree_requirements(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_ron_str(ron_str: &str) -> Result<Self, CatalogError> {
        Self::new(ron::from_str(ron_str)?)
    }

    /// Load a catalog file, format chosen by extension
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            Some("ron") => Self::from_ron_str(&contents)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::info!(
            path = %path.display(),
            abilities = catalog.data.abilities.len(),
            classes = catalog.data.classes.len(),
            "ability catalog loaded"
        );
        Ok(catalog)
    }

    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.ability_index.get(id).map(|&i| &self.data.abilities[i])
    }

    pub fn class(&self, id: &str) -> Option<&SpecializationClass> {
        self.class_index.get(id).map(|&i| &self.data.classes[i])
    }

    pub fn abilities(&self) -> &[Ability] {
        &self.data.abilities
    }

    pub fn classes(&self) -> &[SpecializationClass] {
        &self.data.classes
    }

    pub fn tree_requirements(&self) -> &[TreeRequirement] {
        &self.data.tree_requirements
    }

    pub fn tree_requirement(&self, tree: &str) -> Option<&TreeRequirement> {
        self.data.tree_requirements.iter().find(|r| r.tree == tree)
    }

    /// The Advanced class that is the advanced version of `core_class_id`
    pub fn advanced_version_of(&self, core_class_id: &str) -> Option<&SpecializationClass> {
        self.data.classes.iter().find(|c| {
            c.kind == ClassKind::Advanced && c.advanced_of.as_deref() == Some(core_class_id)
        })
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.data).unwrap_or_default()
    }
}

impl CatalogSource for AbilityCatalog {
    fn list_abilities(&self) -> Vec<Ability> {
        self.data.abilities.clone()
    }

    fn list_classes(&self) -> Vec<SpecializationClass> {
        self.data.classes.clone()
    }

    fn list_tree_requirements(&self) -> Vec<TreeRequirement> {
        self.data.tree_requirements.clone()
    }
}

fn tree_abilities(prefix: &str, tree: &str, names: &[&str]) -> Vec<Ability> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Ability {
            id: format!("{}_{}", prefix, i + 1),
            name: (*name).into(),
            tree: tree.into(),
            level: i as u32 + 1,
        })
        .collect()
}

fn legendary(id: &str, name: &str, tree: &str, level: u32) -> Ability {
    Ability {
        id: id.into(),
        name: name.into(),
        tree: tree.into(),
        level,
    }
}

fn core_class(id: &str, name: &str, trees: &[&str]) -> SpecializationClass {
    SpecializationClass {
        id: id.into(),
        name: name.into(),
        kind: ClassKind::Core,
        core_trees: trees.iter().map(|t| (*t).into()).collect(),
        specialization_tree: None,
        legendary_ability_names: vec![],
        advanced_of: None,
        allows_specialization: true,
    }
}

fn spec_class(
    id: &str,
    name: &str,
    kind: ClassKind,
    tree: &str,
    legendary: &str,
    advanced_of: Option<&str>,
) -> SpecializationClass {
    SpecializationClass {
        id: id.into(),
        name: name.into(),
        kind,
        core_trees: vec![],
        specialization_tree: Some(tree.into()),
        legendary_ability_names: vec![legendary.into()],
        advanced_of: advanced_of.map(Into::into),
        allows_specialization: true,
    }
}

/// Built-in catalog used when no catalog file is supplied
pub fn starter_catalog_data() -> CatalogData {
    let mut abilities = Vec::new();

    // === Core trees ===
    abilities.extend(tree_abilities(
        "hack",
        "Hacking",
        &["Backdoor", "Packet Sniffer", "Firewall Breach", "Root Access"],
    ));
    abilities.extend(tree_abilities(
        "tech",
        "Tech",
        &["Field Repair", "Gadgeteer", "Overcharge", "Jury Rig"],
    ));
    abilities.extend(tree_abilities(
        "fire",
        "Firearms",
        &["Steady Aim", "Quick Draw", "Suppressing Fire", "Deadeye"],
    ));
    abilities.extend(tree_abilities(
        "tact",
        "Tactics",
        &["Flanking", "Cover Discipline", "Squad Orders", "Battle Plan"],
    ));
    abilities.extend(tree_abilities(
        "pilot",
        "Piloting",
        &["Evasive Maneuvers", "Afterburn", "Tight Turn"],
    ));
    abilities.extend(tree_abilities(
        "eng",
        "Engineering",
        &["Hull Patch", "Power Routing", "Shield Tuning"],
    ));
    abilities.extend(tree_abilities(
        "surv",
        "Survival",
        &["Scavenge", "Hardy", "Keep Moving"],
    ));

    // === Specialization trees ===
    abilities.extend(tree_abilities(
        "net",
        "Netrunning",
        &["Deep Dive", "ICE Breaker", "Daemon Swarm"],
    ));
    abilities.push(legendary("net_legend", "Ghost Protocol", "Netrunning", 4));
    abilities.extend(tree_abilities(
        "vang",
        "Vanguard",
        &["Shield Wall", "Bulwark", "Hold The Line"],
    ));
    abilities.push(legendary("vang_legend", "Last Stand", "Vanguard", 4));
    abilities.extend(tree_abilities(
        "aero",
        "Aerobatics",
        &["Barrel Roll", "Split-S", "Immelmann"],
    ));
    abilities.push(legendary("aero_legend", "Untouchable", "Aerobatics", 4));
    abilities.extend(tree_abilities(
        "tmancy",
        "Technomancy",
        &["Signal Ghost", "Drone Link", "Overclock"],
    ));
    abilities.push(legendary("tmancy_legend", "Machine Spirit", "Technomancy", 4));
    abilities.extend(tree_abilities(
        "infil",
        "Infiltration",
        &["Silent Step", "Disguise", "Vanish"],
    ));
    abilities.push(legendary("infil_legend", "Nobody Was Here", "Infiltration", 4));

    let mut civilian = core_class("civilian", "Civilian", &["Survival", "Tech"]);
    civilian.allows_specialization = false;

    let classes = vec![
        core_class("hacker", "Hacker", &["Hacking", "Tech"]),
        core_class("soldier", "Soldier", &["Firearms", "Tactics"]),
        core_class("pilot", "Pilot", &["Piloting", "Engineering"]),
        civilian,
        spec_class(
            "netrunner",
            "Netrunner",
            ClassKind::Hybrid,
            "Technomancy",
            "Machine Spirit",
            None,
        ),
        spec_class(
            "infiltrator",
            "Infiltrator",
            ClassKind::Hybrid,
            "Infiltration",
            "Nobody Was Here",
            None,
        ),
        spec_class(
            "elite_hacker",
            "Elite Hacker",
            ClassKind::Advanced,
            "Netrunning",
            "Ghost Protocol",
            Some("hacker"),
        ),
        spec_class(
            "veteran",
            "Veteran",
            ClassKind::Advanced,
            "Vanguard",
            "Last Stand",
            Some("soldier"),
        ),
        spec_class(
            "ace_pilot",
            "Ace Pilot",
            ClassKind::Advanced,
            "Aerobatics",
            "Untouchable",
            Some("pilot"),
        ),
    ];

    let tree_requirements = vec![
        TreeRequirement {
            tree: "Technomancy".into(),
            required_trees: vec!["Hacking".into(), "Engineering".into()],
        },
        TreeRequirement {
            tree: "Infiltration".into(),
            required_trees: vec!["Tactics".into()],
        },
    ];

    CatalogData {
        abilities,
        classes,
        tree_requirements,
    }
}

/// Built-in catalog, already known to be valid
pub fn starter_catalog() -> AbilityCatalog {
    AbilityCatalog::indexed(starter_catalog_data())
}
