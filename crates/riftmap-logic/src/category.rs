//! Size classes, content categories and the extension catalog.
//!
//! Categories are a closed enum for the builtin content plus an
//! `Extension` slot for mod-provided tags. Tags in a sector spec
//! ("planet.mining", "nothing", "mod.ice_giant") are resolved once, at load
//! time, through a [`Catalog`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Signal size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Big,
}

impl SizeClass {
    pub const ALL: [SizeClass; 3] = [SizeClass::Small, SizeClass::Medium, SizeClass::Big];

    /// The next larger class, if any.
    pub fn upgrade(self) -> Option<SizeClass> {
        match self {
            SizeClass::Small => Some(SizeClass::Medium),
            SizeClass::Medium => Some(SizeClass::Big),
            SizeClass::Big => None,
        }
    }
}

/// Broad family a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Empty,
    Planet,
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetKind {
    Mining,
    Industrial,
    Research,
    Agrarian,
    Habitable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Station,
    Derelict,
    Beacon,
    Relay,
    Gate,
}

/// Content category of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Empty,
    Planet(PlanetKind),
    Structure(StructureKind),
    /// Index into the catalog's extension table.
    Extension(u16),
}

const PLANETS: [(PlanetKind, &str); 5] = [
    (PlanetKind::Mining, "planet.mining"),
    (PlanetKind::Industrial, "planet.industrial"),
    (PlanetKind::Research, "planet.research"),
    (PlanetKind::Agrarian, "planet.agrarian"),
    (PlanetKind::Habitable, "planet.habitable"),
];

const STRUCTURES: [(StructureKind, &str); 5] = [
    (StructureKind::Station, "structure.station"),
    (StructureKind::Derelict, "structure.derelict"),
    (StructureKind::Beacon, "structure.beacon"),
    (StructureKind::Relay, "structure.relay"),
    (StructureKind::Gate, "structure.gate"),
];

/// A mod-provided category declared in the sector spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSpec {
    pub tag: String,
    pub family: Family,
}

/// Resolves category tags and answers family lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    extensions: Vec<ExtensionSpec>,
}

impl Catalog {
    /// Build a catalog, rejecting extension tags that shadow builtins or
    /// repeat.
    pub fn new(extensions: &[ExtensionSpec]) -> Result<Catalog, Vec<ConfigError>> {
        let mut errors = Vec::new();
        let mut catalog = Catalog::default();
        for ext in extensions {
            if catalog.resolve(&ext.tag).is_some() {
                errors.push(ConfigError::DuplicateExtension(ext.tag.clone()));
                continue;
            }
            if ext.family == Family::Empty {
                errors.push(ConfigError::UnknownCategory(ext.tag.clone()));
                continue;
            }
            catalog.extensions.push(ext.clone());
        }
        if errors.is_empty() {
            Ok(catalog)
        } else {
            Err(errors)
        }
    }

    /// Look up a tag. "nothing" and "empty" both name [`Category::Empty`].
    pub fn resolve(&self, tag: &str) -> Option<Category> {
        if tag == "nothing" || tag == "empty" {
            return Some(Category::Empty);
        }
        if let Some((kind, _)) = PLANETS.iter().find(|(_, t)| *t == tag) {
            return Some(Category::Planet(*kind));
        }
        if let Some((kind, _)) = STRUCTURES.iter().find(|(_, t)| *t == tag) {
            return Some(Category::Structure(*kind));
        }
        self.extensions
            .iter()
            .position(|e| e.tag == tag)
            .map(|i| Category::Extension(i as u16))
    }

    pub fn resolve_or_err(&self, tag: &str) -> Result<Category, ConfigError> {
        self.resolve(tag)
            .ok_or_else(|| ConfigError::UnknownCategory(tag.to_string()))
    }

    /// Canonical tag for a category.
    pub fn tag(&self, category: Category) -> String {
        match category {
            Category::Empty => "nothing".to_string(),
            Category::Planet(kind) => PLANETS
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, t)| t.to_string())
                .unwrap_or_default(),
            Category::Structure(kind) => STRUCTURES
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, t)| t.to_string())
                .unwrap_or_default(),
            Category::Extension(i) => self
                .extensions
                .get(i as usize)
                .map(|e| e.tag.clone())
                .unwrap_or_else(|| format!("extension.{}", i)),
        }
    }

    pub fn family(&self, category: Category) -> Family {
        match category {
            Category::Empty => Family::Empty,
            Category::Planet(_) => Family::Planet,
            Category::Structure(_) => Family::Structure,
            Category::Extension(i) => self
                .extensions
                .get(i as usize)
                .map(|e| e.family)
                .unwrap_or(Family::Empty),
        }
    }

    pub fn is_planet(&self, category: Category) -> bool {
        self.family(category) == Family::Planet
    }
}

/// Special marker attached to a signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quirk(pub String);

impl Quirk {
    pub const RIFTSIDE: &'static str = "riftside";

    pub fn new(tag: impl Into<String>) -> Self {
        Quirk(tag.into())
    }

    pub fn riftside() -> Self {
        Quirk(Self::RIFTSIDE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ice_giant() -> ExtensionSpec {
        ExtensionSpec {
            tag: "mod.ice_giant".into(),
            family: Family::Planet,
        }
    }

    #[test]
    fn test_builtin_tags_round_trip() {
        let catalog = Catalog::default();
        for tag in ["nothing", "planet.research", "structure.gate"] {
            let cat = catalog.resolve(tag).unwrap();
            assert_eq!(catalog.tag(cat), tag);
        }
        assert_eq!(catalog.resolve("empty"), Some(Category::Empty));
        assert_eq!(catalog.resolve("planet.lava"), None);
    }

    #[test]
    fn test_extension_resolves_with_family() {
        let catalog = Catalog::new(&[ice_giant()]).unwrap();
        let cat = catalog.resolve("mod.ice_giant").unwrap();
        assert_eq!(cat, Category::Extension(0));
        assert!(catalog.is_planet(cat));
    }

    #[test]
    fn test_duplicate_or_shadowing_extension_rejected() {
        let shadow = ExtensionSpec {
            tag: "planet.mining".into(),
            family: Family::Planet,
        };
        let errors = Catalog::new(&[ice_giant(), ice_giant(), shadow]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ConfigError::DuplicateExtension("mod.ice_giant".into())));
        assert!(errors.contains(&ConfigError::DuplicateExtension("planet.mining".into())));
    }

    #[test]
    fn test_size_upgrade_chain() {
        assert_eq!(SizeClass::Small.upgrade(), Some(SizeClass::Medium));
        assert_eq!(SizeClass::Big.upgrade(), None);
    }
}
