// ABOUTME: Canonical muscle and muscle-group taxonomy with alias normalization
// ABOUTME: Maps free-form catalog muscle names ("pecs", "lats") to canonical ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Canonical groups with their muscles
const STANDARD_MUSCLES: &[(&str, &[&str])] = &[
    ("chest", &["pectoralis_major", "pectoralis_minor"]),
    (
        "back",
        &["latissimus_dorsi", "trapezius", "rhomboids", "erector_spinae"],
    ),
    (
        "shoulders",
        &[
            "anterior_deltoid",
            "lateral_deltoid",
            "posterior_deltoid",
            "rotator_cuff",
        ],
    ),
    ("arms", &["biceps", "triceps", "forearms"]),
    (
        "legs",
        &[
            "quadriceps",
            "hamstrings",
            "glutes",
            "adductors",
            "abductors",
            "calves",
        ],
    ),
    ("core", &["abdominals", "obliques"]),
];

/// Free-form names seen in catalogs, after normalization
const STANDARD_ALIASES: &[(&str, &str)] = &[
    ("pecs", "pectoralis_major"),
    ("pec", "pectoralis_major"),
    ("pectorals", "pectoralis_major"),
    ("upper_chest", "pectoralis_major"),
    ("lower_chest", "pectoralis_major"),
    ("lats", "latissimus_dorsi"),
    ("lat", "latissimus_dorsi"),
    ("traps", "trapezius"),
    ("upper_back", "rhomboids"),
    ("lower_back", "erector_spinae"),
    ("spinal_erectors", "erector_spinae"),
    ("front_delts", "anterior_deltoid"),
    ("front_delt", "anterior_deltoid"),
    ("side_delts", "lateral_deltoid"),
    ("side_delt", "lateral_deltoid"),
    ("rear_delts", "posterior_deltoid"),
    ("rear_delt", "posterior_deltoid"),
    ("delts", "shoulders"),
    ("bicep", "biceps"),
    ("tricep", "triceps"),
    ("forearm", "forearms"),
    ("quads", "quadriceps"),
    ("quad", "quadriceps"),
    ("hams", "hamstrings"),
    ("hamstring", "hamstrings"),
    ("glute", "glutes"),
    ("gluteus_maximus", "glutes"),
    ("calf", "calves"),
    ("abs", "abdominals"),
    ("rectus_abdominis", "abdominals"),
    ("oblique", "obliques"),
    ("pectoral", "pectoralis_major"),
];

/// What a catalog name resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolved {
    /// A canonical muscle and its parent group
    Muscle {
        /// Canonical muscle id
        muscle: String,
        /// Parent group id
        group: String,
    },
    /// A whole muscle group
    Group {
        /// Canonical group id
        group: String,
    },
}

impl Resolved {
    /// Group this resolution belongs to
    #[must_use]
    pub fn group(&self) -> &str {
        match self {
            Self::Muscle { group, .. } | Self::Group { group } => group,
        }
    }
}

/// Immutable muscle taxonomy.
///
/// Built once at startup and passed explicitly to the set-fact generator.
#[derive(Debug, Clone)]
pub struct MuscleTaxonomy {
    /// group id -> muscles in that group
    groups: BTreeMap<String, BTreeSet<String>>,
    /// muscle id -> parent group id
    muscle_to_group: HashMap<String, String>,
    /// normalized alias -> canonical muscle or group id
    aliases: HashMap<String, String>,
}

impl Default for MuscleTaxonomy {
    fn default() -> Self {
        Self::standard()
    }
}

impl MuscleTaxonomy {
    /// The built-in taxonomy
    #[must_use]
    pub fn standard() -> Self {
        let mut taxonomy = Self {
            groups: BTreeMap::new(),
            muscle_to_group: HashMap::new(),
            aliases: HashMap::new(),
        };
        for (group, muscles) in STANDARD_MUSCLES {
            for muscle in *muscles {
                taxonomy.insert_muscle(group, muscle);
            }
        }
        for (alias, canonical) in STANDARD_ALIASES {
            taxonomy.insert_alias(alias, canonical);
        }
        taxonomy
    }

    /// Add a muscle under a group, creating the group if needed
    #[must_use]
    pub fn with_muscle(mut self, group: &str, muscle: &str) -> Self {
        self.insert_muscle(group, muscle);
        self
    }

    /// Add an alias for an existing canonical muscle or group
    #[must_use]
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.insert_alias(alias, canonical);
        self
    }

    fn insert_muscle(&mut self, group: &str, muscle: &str) {
        let group = normalize(group);
        let muscle = normalize(muscle);
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(muscle.clone());
        self.muscle_to_group.insert(muscle, group);
    }

    fn insert_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases.insert(normalize(alias), normalize(canonical));
    }

    /// Resolve a free-form catalog name. Unknown names resolve to `None`.
    #[must_use]
    pub fn resolve(&self, raw_name: &str) -> Option<Resolved> {
        let normalized = normalize(raw_name);
        let canonical = self.aliases.get(&normalized).unwrap_or(&normalized);

        if let Some(group) = self.muscle_to_group.get(canonical) {
            return Some(Resolved::Muscle {
                muscle: canonical.clone(),
                group: group.clone(),
            });
        }
        self.groups.contains_key(canonical).then(|| Resolved::Group {
            group: canonical.clone(),
        })
    }

    /// Canonical group ids, sorted
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Canonical muscles of a group, sorted
    pub fn muscles_of(&self, group: &str) -> impl Iterator<Item = &str> {
        self.groups
            .get(group)
            .into_iter()
            .flat_map(|muscles| muscles.iter().map(String::as_str))
    }

    /// Parent group of a canonical muscle
    #[must_use]
    pub fn group_of(&self, muscle: &str) -> Option<&str> {
        self.muscle_to_group.get(muscle).map(String::as_str)
    }

    /// Whether `id` is a canonical group id
    #[must_use]
    pub fn is_group(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    /// Whether `id` is a canonical muscle id
    #[must_use]
    pub fn is_muscle(&self, id: &str) -> bool {
        self.muscle_to_group.contains_key(id)
    }
}

/// Lowercase, trim, and fold spaces and hyphens to underscores
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve_to_canonical_muscles() {
        let taxonomy = MuscleTaxonomy::standard();
        assert_eq!(
            taxonomy.resolve("Pecs"),
            Some(Resolved::Muscle {
                muscle: "pectoralis_major".to_owned(),
                group: "chest".to_owned(),
            })
        );
        assert_eq!(
            taxonomy.resolve(" lats "),
            Some(Resolved::Muscle {
                muscle: "latissimus_dorsi".to_owned(),
                group: "back".to_owned(),
            })
        );
        assert_eq!(
            taxonomy.resolve("rear-delts").map(|r| r.group().to_owned()),
            Some("shoulders".to_owned())
        );
    }

    #[test]
    fn test_group_names_resolve_to_groups() {
        let taxonomy = MuscleTaxonomy::standard();
        assert_eq!(
            taxonomy.resolve("Back"),
            Some(Resolved::Group {
                group: "back".to_owned()
            })
        );
        assert_eq!(
            taxonomy.resolve("delts"),
            Some(Resolved::Group {
                group: "shoulders".to_owned()
            })
        );
    }

    #[test]
    fn test_unknown_names_resolve_to_none() {
        let taxonomy = MuscleTaxonomy::standard();
        assert_eq!(taxonomy.resolve("spleen"), None);
        assert_eq!(taxonomy.resolve(""), None);
    }

    #[test]
    fn test_every_muscle_has_a_group() {
        let taxonomy = MuscleTaxonomy::standard();
        for group in taxonomy.groups() {
            for muscle in taxonomy.muscles_of(group) {
                assert_eq!(taxonomy.group_of(muscle), Some(group));
            }
        }
        assert!(taxonomy.is_group("legs"));
        assert!(taxonomy.is_muscle("quadriceps"));
    }

    #[test]
    fn test_extension() {
        let taxonomy = MuscleTaxonomy::standard()
            .with_muscle("neck", "sternocleidomastoid")
            .with_alias("scm", "sternocleidomastoid");
        assert_eq!(taxonomy.group_of("sternocleidomastoid"), Some("neck"));
        assert_eq!(
            taxonomy.resolve("SCM").map(|r| r.group().to_owned()),
            Some("neck".to_owned())
        );
    }
}
