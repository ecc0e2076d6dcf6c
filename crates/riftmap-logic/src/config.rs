//! Declarative sector specification and load-time validation.
//!
//! A [`SectorSpec`] is plain serde data: ring layout, weight tables keyed by
//! category tag, per-pass tuning and rift/topology requests. Distances are in
//! reference-radius units and converted to world units through [`Scale`].
//!
//! Validation happens once, before any generation work: [`validate_spec`]
//! reports every problem found, and [`SectorSpec::resolve`] turns the string
//! keyed tables into typed [`ResolvedTables`].
//!
//! ```
//! use riftmap_logic::config::{validate_spec, SectorSpec};
//!
//! let spec = SectorSpec::default();
//! assert!(validate_spec(&spec).is_empty());
//! let tables = spec.resolve().unwrap();
//! assert!(!tables.weights(riftmap_logic::category::SizeClass::Small).is_empty());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{Catalog, Category, ExtensionSpec, Family, Quirk, SizeClass};
use crate::error::ConfigError;
use crate::geometry::{Point, Side};

/// Converts abstract spec units into generation-space distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    /// World distance of one spec unit (the reference interaction radius).
    pub reference_radius: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            reference_radius: 1.0,
        }
    }
}

impl Scale {
    pub fn world(&self, units: f64) -> f64 {
        units * self.reference_radius
    }
}

/// One value per size class.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerSize<T> {
    pub small: T,
    pub medium: T,
    pub big: T,
}

impl<T> PerSize<T> {
    pub fn get(&self, size: SizeClass) -> &T {
        match size {
            SizeClass::Small => &self.small,
            SizeClass::Medium => &self.medium,
            SizeClass::Big => &self.big,
        }
    }
}

/// A concentric ring (or disc when `radius <= tolerance`) of the sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    #[serde(default)]
    pub center: Point,
    /// Ideal locus radius.
    pub radius: f64,
    /// Allowed distance from the locus.
    pub tolerance: f64,
    /// Number of signals to scatter.
    pub target_count: u32,
    /// Planet count enforced by the zone-count correction.
    #[serde(default)]
    pub target_planets: Option<u32>,
    /// Target link value per signal.
    #[serde(default)]
    pub target_link: f64,
}

/// Per-category coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub link_value: f64,
    pub change_aversion: f64,
    /// Quirk tag → chance of being applied to a signal of this category.
    #[serde(default)]
    pub quirks: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSpec {
    pub min_spacing: f64,
    pub attempts_per_signal: u32,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            min_spacing: 0.4,
            attempts_per_signal: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSpec {
    pub isolation_radius: f64,
    pub isolation_min_neighbors: u32,
    /// Share of the Small weight moved to Medium at full isolation.
    pub isolation_boost: f64,
    pub monotony_radius: f64,
    /// Weight reduction per same-category neighbor.
    pub monotony_penalty: f64,
}

impl Default for ClassifierSpec {
    fn default() -> Self {
        Self {
            isolation_radius: 1.2,
            isolation_min_neighbors: 2,
            isolation_boost: 0.6,
            monotony_radius: 1.2,
            monotony_penalty: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerSpec {
    pub enabled: bool,
    pub link_radius: f64,
    /// Big signals closer than this to a sight line block it.
    pub los_block_radius: f64,
    pub tolerance_per_signal: f64,
    pub tolerance_floor: f64,
    /// Fraction of the remaining delta each reassignment aims for.
    pub step_fraction: f64,
    pub min_effect: f64,
    /// Score penalty for creating a third same-category neighbor.
    pub repetition_penalty: f64,
}

impl Default for BalancerSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            link_radius: 1.5,
            los_block_radius: 0.15,
            tolerance_per_signal: 0.1,
            tolerance_floor: 0.5,
            step_fraction: 0.5,
            min_effect: 0.05,
            repetition_penalty: 1.0,
        }
    }
}

/// A pair of categories the loop guarantee may swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionSpec {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopGuaranteeSpec {
    pub enabled: bool,
    /// Planets farther than this from the origin are ignored.
    pub max_reach: f64,
    /// Two planets closer than this are linked.
    pub hop_distance: f64,
    pub max_cycle_len: usize,
    /// Category a non-planet is converted to by the direct extension.
    pub extension_category: String,
    pub max_extension_candidates: usize,
    pub substitutions: Vec<SubstitutionSpec>,
    pub retry_budget: u32,
}

impl Default for LoopGuaranteeSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            max_reach: 5.0,
            hop_distance: 2.0,
            max_cycle_len: 5,
            extension_category: "planet.mining".to_string(),
            max_extension_candidates: 24,
            substitutions: Vec::new(),
            retry_budget: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiftSpec {
    pub count: usize,
    pub min_length: f64,
    pub max_length: f64,
    pub start_min_radius: f64,
    pub start_max_radius: f64,
    /// Desired closest approach to the origin per rift index.
    pub forced_closeness: Vec<f64>,
    /// How many leading rifts the closeness list binds.
    pub forced_count: usize,
    /// Half width of a forced-closeness band.
    pub forced_band: f64,
    pub snap_radius: f64,
    pub step_min: f64,
    pub step_max: f64,
    /// Heading jitter of a growth proposal, radians.
    pub max_heading_jitter: f64,
    /// Sharpest allowed turn between segments, radians.
    pub max_turn: f64,
    pub inner_retries: u32,
    pub outer_retries: u32,
    pub end_extension: f64,
    /// Safety radius of the collision shape.
    pub pad: f64,
    pub origin_clearance: f64,
    pub width_min: f64,
    pub width_max: f64,
    pub taper_chance: f64,
    pub sample_step: f64,
    /// Chance a rift starts from a free endpoint of an accepted one.
    pub joint_chance: f64,
    pub joint_radius: f64,
    /// Signals this far beyond a rift's edge get the riftside quirk.
    pub tag_margin: f64,
}

impl Default for RiftSpec {
    fn default() -> Self {
        Self {
            count: 0,
            min_length: 3.0,
            max_length: 5.0,
            start_min_radius: 2.0,
            start_max_radius: 9.0,
            forced_closeness: Vec::new(),
            forced_count: 0,
            forced_band: 0.5,
            snap_radius: 1.5,
            step_min: 0.7,
            step_max: 1.3,
            max_heading_jitter: 0.6,
            max_turn: 1.0,
            inner_retries: 12,
            outer_retries: 60,
            end_extension: 0.4,
            pad: 0.2,
            origin_clearance: 1.5,
            width_min: 0.1,
            width_max: 0.2,
            taper_chance: 0.5,
            sample_step: 0.1,
            joint_chance: 0.0,
            joint_radius: 0.35,
            tag_margin: 0.3,
        }
    }
}

/// One `(side, rip)` constraint of a rip zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingSpec {
    pub side: Side,
    /// Index of the rift in request order.
    pub rip: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipZoneSpec {
    pub name: String,
    pub crossings: Vec<CrossingSpec>,
}

/// A structure that must exist exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredStructure {
    pub category: String,
    pub zone: usize,
    #[serde(default)]
    pub min_radius: f64,
    #[serde(default = "default_structure_max_radius")]
    pub max_radius: f64,
    #[serde(default = "default_structure_attempts")]
    pub attempts: u32,
}

fn default_structure_max_radius() -> f64 {
    f64::MAX
}

fn default_structure_attempts() -> u32 {
    50
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartZoneSpec {
    /// Reject the attempt when the origin zone has fewer planets.
    pub min_planets: u32,
}

/// Complete, declarative description of a sector to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSpec {
    #[serde(default)]
    pub scale: Scale,
    pub rings: Vec<RingSpec>,
    #[serde(default)]
    pub extensions: Vec<ExtensionSpec>,
    pub size_weights: PerSize<f64>,
    pub category_weights: PerSize<BTreeMap<String, f64>>,
    pub categories: BTreeMap<String, CategorySpec>,
    #[serde(default)]
    pub placement: PlacementSpec,
    #[serde(default)]
    pub classifier: ClassifierSpec,
    #[serde(default)]
    pub balancer: BalancerSpec,
    #[serde(default)]
    pub loop_guarantee: LoopGuaranteeSpec,
    #[serde(default)]
    pub rifts: RiftSpec,
    #[serde(default)]
    pub rip_zones: Vec<RipZoneSpec>,
    #[serde(default)]
    pub required_structures: Vec<RequiredStructure>,
    #[serde(default)]
    pub start_zone: StartZoneSpec,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    8
}

fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn coefficients(link_value: f64, change_aversion: f64) -> CategorySpec {
    CategorySpec {
        link_value,
        change_aversion,
        quirks: BTreeMap::new(),
    }
}

impl Default for SectorSpec {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert("nothing".to_string(), coefficients(0.0, 0.2));
        categories.insert("planet.mining".to_string(), coefficients(1.0, 0.5));
        categories.insert("planet.industrial".to_string(), coefficients(1.2, 0.7));
        categories.insert("planet.research".to_string(), coefficients(0.9, 0.6));
        categories.insert("planet.agrarian".to_string(), coefficients(0.8, 0.5));
        categories.insert("planet.habitable".to_string(), coefficients(1.4, 1.5));
        categories.insert("structure.station".to_string(), coefficients(0.7, 0.8));
        categories.insert("structure.derelict".to_string(), coefficients(0.3, 0.4));
        categories.insert("structure.beacon".to_string(), coefficients(0.5, 0.6));
        categories.insert("structure.gate".to_string(), coefficients(0.6, 3.0));
        if let Some(derelict) = categories.get_mut("structure.derelict") {
            derelict.quirks.insert("haunted".to_string(), 0.3);
        }
        if let Some(research) = categories.get_mut("planet.research") {
            research.quirks.insert("anomaly".to_string(), 0.15);
        }

        Self {
            scale: Scale::default(),
            rings: vec![
                RingSpec {
                    center: Point::ORIGIN,
                    radius: 0.0,
                    tolerance: 2.5,
                    target_count: 14,
                    target_planets: Some(6),
                    target_link: 1.0,
                },
                RingSpec {
                    center: Point::ORIGIN,
                    radius: 4.5,
                    tolerance: 1.5,
                    target_count: 40,
                    target_planets: Some(14),
                    target_link: 0.9,
                },
                RingSpec {
                    center: Point::ORIGIN,
                    radius: 8.0,
                    tolerance: 2.0,
                    target_count: 70,
                    target_planets: None,
                    target_link: 0.8,
                },
            ],
            extensions: Vec::new(),
            size_weights: PerSize {
                small: 0.55,
                medium: 0.3,
                big: 0.15,
            },
            category_weights: PerSize {
                small: weights(&[
                    ("nothing", 0.45),
                    ("planet.mining", 0.2),
                    ("planet.agrarian", 0.1),
                    ("structure.derelict", 0.15),
                    ("structure.beacon", 0.1),
                ]),
                medium: weights(&[
                    ("nothing", 0.25),
                    ("planet.mining", 0.15),
                    ("planet.industrial", 0.15),
                    ("planet.research", 0.15),
                    ("planet.agrarian", 0.1),
                    ("structure.station", 0.1),
                    ("structure.derelict", 0.1),
                ]),
                big: weights(&[
                    ("nothing", 0.1),
                    ("planet.industrial", 0.3),
                    ("planet.habitable", 0.3),
                    ("structure.station", 0.2),
                    ("structure.gate", 0.1),
                ]),
            },
            categories,
            placement: PlacementSpec::default(),
            classifier: ClassifierSpec::default(),
            balancer: BalancerSpec::default(),
            loop_guarantee: LoopGuaranteeSpec {
                substitutions: vec![
                    SubstitutionSpec {
                        from: "planet.mining".to_string(),
                        to: "nothing".to_string(),
                    },
                    SubstitutionSpec {
                        from: "planet.agrarian".to_string(),
                        to: "structure.derelict".to_string(),
                    },
                ],
                ..LoopGuaranteeSpec::default()
            },
            rifts: RiftSpec {
                count: 4,
                min_length: 2.5,
                max_length: 4.0,
                start_min_radius: 3.0,
                ..RiftSpec::default()
            },
            rip_zones: vec![RipZoneSpec {
                name: "beyond_first_rift".to_string(),
                crossings: vec![CrossingSpec {
                    side: Side::Left,
                    rip: 0,
                }],
            }],
            required_structures: vec![RequiredStructure {
                category: "structure.gate".to_string(),
                zone: 2,
                min_radius: 7.0,
                max_radius: 10.0,
                attempts: 50,
            }],
            start_zone: StartZoneSpec { min_planets: 2 },
            max_attempts: default_max_attempts(),
        }
    }
}

impl SectorSpec {
    /// Parse a spec from JSON. Does not validate.
    pub fn from_json(text: &str) -> Result<SectorSpec, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate and build typed lookup tables.
    pub fn resolve(&self) -> Result<ResolvedTables, Vec<ConfigError>> {
        let errors = validate_spec(self);
        if !errors.is_empty() {
            return Err(errors);
        }
        let catalog = Catalog::new(&self.extensions)?;
        let mut errors = Vec::new();

        let mut resolve = |tag: &str| match catalog.resolve_or_err(tag) {
            Ok(c) => Some(c),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let mut per_size = |table: &BTreeMap<String, f64>| -> Vec<(Category, f64)> {
            let mut v: Vec<(Category, f64)> = table
                .iter()
                .filter_map(|(tag, w)| resolve(tag).map(|c| (c, *w)))
                .collect();
            v.sort_by(|a, b| a.0.cmp(&b.0));
            v
        };
        let category_weights = PerSize {
            small: per_size(&self.category_weights.small),
            medium: per_size(&self.category_weights.medium),
            big: per_size(&self.category_weights.big),
        };

        let mut link_value = BTreeMap::new();
        let mut change_aversion = BTreeMap::new();
        let mut quirk_chances: BTreeMap<Category, Vec<(Quirk, f64)>> = BTreeMap::new();
        for (tag, spec) in &self.categories {
            if let Some(c) = catalog.resolve(tag) {
                link_value.insert(c, spec.link_value);
                change_aversion.insert(c, spec.change_aversion);
                if !spec.quirks.is_empty() {
                    quirk_chances.insert(
                        c,
                        spec.quirks
                            .iter()
                            .map(|(q, p)| (Quirk::new(q.clone()), *p))
                            .collect(),
                    );
                }
            }
        }

        let substitutions = self
            .loop_guarantee
            .substitutions
            .iter()
            .filter_map(|s| Some((catalog.resolve(&s.from)?, catalog.resolve(&s.to)?)))
            .collect();
        let extension_category = catalog
            .resolve(&self.loop_guarantee.extension_category)
            .unwrap_or(Category::Empty);
        let required = self
            .required_structures
            .iter()
            .filter_map(|r| catalog.resolve(&r.category).map(|c| (c, r.clone())))
            .collect();

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ResolvedTables {
            catalog,
            size_weights: self.size_weights.clone(),
            category_weights,
            link_value,
            change_aversion,
            quirk_chances,
            substitutions,
            extension_category,
            required,
        })
    }
}

/// Typed form of the spec's string-keyed tables.
#[derive(Debug, Clone)]
pub struct ResolvedTables {
    pub catalog: Catalog,
    pub size_weights: PerSize<f64>,
    /// Sorted by category so iteration order is stable.
    pub category_weights: PerSize<Vec<(Category, f64)>>,
    pub link_value: BTreeMap<Category, f64>,
    pub change_aversion: BTreeMap<Category, f64>,
    pub quirk_chances: BTreeMap<Category, Vec<(Quirk, f64)>>,
    pub substitutions: Vec<(Category, Category)>,
    pub extension_category: Category,
    pub required: Vec<(Category, RequiredStructure)>,
}

impl ResolvedTables {
    pub fn weights(&self, size: SizeClass) -> &[(Category, f64)] {
        self.category_weights.get(size)
    }

    /// Categories with positive weight for `size`.
    pub fn options(&self, size: SizeClass) -> impl Iterator<Item = Category> + '_ {
        self.weights(size)
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(c, _)| *c)
    }

    pub fn link_value(&self, category: Category) -> f64 {
        self.link_value.get(&category).copied().unwrap_or(0.0)
    }

    pub fn change_aversion(&self, category: Category) -> f64 {
        self.change_aversion.get(&category).copied().unwrap_or(0.0)
    }

    pub fn is_planet(&self, category: Category) -> bool {
        self.catalog.is_planet(category)
    }

    pub fn family(&self, category: Category) -> Family {
        self.catalog.family(category)
    }
}

fn check_range(errors: &mut Vec<ConfigError>, field: &'static str, lo: f64, hi: f64) {
    if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || lo > hi {
        errors.push(ConfigError::InvalidRange(field));
    }
}

fn check_positive(errors: &mut Vec<ConfigError>, field: &'static str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigError::InvalidRange(field));
    }
}

fn check_non_negative(errors: &mut Vec<ConfigError>, field: &'static str, value: f64) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ConfigError::InvalidRange(field));
    }
}

fn check_table(errors: &mut Vec<ConfigError>, name: &str, values: impl Iterator<Item = f64>) {
    let mut sum = 0.0;
    for v in values {
        if !v.is_finite() || v < 0.0 {
            errors.push(ConfigError::BadWeights(name.to_string()));
            return;
        }
        sum += v;
    }
    if sum <= 0.0 {
        errors.push(ConfigError::BadWeights(name.to_string()));
    }
}

/// Validate a sector spec, returning all errors found.
pub fn validate_spec(spec: &SectorSpec) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let catalog = match Catalog::new(&spec.extensions) {
        Ok(c) => c,
        Err(mut e) => {
            errors.append(&mut e);
            Catalog::default()
        }
    };

    check_positive(&mut errors, "scale.reference_radius", spec.scale.reference_radius);

    if spec.rings.is_empty() {
        errors.push(ConfigError::NoRings);
    }
    for (i, ring) in spec.rings.iter().enumerate() {
        if !(ring.radius.is_finite() && ring.radius >= 0.0) {
            errors.push(ConfigError::InvalidRing {
                ring: i,
                reason: "radius must be finite and non-negative",
            });
        }
        if !(ring.tolerance.is_finite() && ring.tolerance > 0.0) {
            errors.push(ConfigError::InvalidRing {
                ring: i,
                reason: "tolerance must be positive",
            });
        }
        if let Some(planets) = ring.target_planets {
            if planets > ring.target_count {
                errors.push(ConfigError::InvalidRing {
                    ring: i,
                    reason: "target_planets exceeds target_count",
                });
            }
        }
        if !(ring.target_link.is_finite() && ring.target_link >= 0.0) {
            errors.push(ConfigError::InvalidRing {
                ring: i,
                reason: "target_link must be non-negative",
            });
        }
    }

    check_table(
        &mut errors,
        "size_weights",
        [spec.size_weights.small, spec.size_weights.medium, spec.size_weights.big].into_iter(),
    );

    for size in SizeClass::ALL {
        let table = spec.category_weights.get(size);
        if table.is_empty() {
            errors.push(ConfigError::MissingSizeTable(size));
            continue;
        }
        check_table(
            &mut errors,
            match size {
                SizeClass::Small => "category_weights.small",
                SizeClass::Medium => "category_weights.medium",
                SizeClass::Big => "category_weights.big",
            },
            table.values().copied(),
        );
        for (tag, weight) in table {
            match catalog.resolve(tag) {
                None => errors.push(ConfigError::UnknownCategory(tag.clone())),
                Some(Category::Empty) => {}
                Some(_) if *weight > 0.0 && !spec.categories.contains_key(tag) => {
                    errors.push(ConfigError::MissingCoefficients(tag.clone()));
                }
                Some(_) => {}
            }
        }
    }

    for tag in spec.categories.keys() {
        if catalog.resolve(tag).is_none() {
            errors.push(ConfigError::UnknownCategory(tag.clone()));
        }
    }

    check_positive(&mut errors, "placement.min_spacing", spec.placement.min_spacing);
    check_positive(&mut errors, "balancer.link_radius", spec.balancer.link_radius);
    if !(0.0..=1.0).contains(&spec.balancer.step_fraction) || spec.balancer.step_fraction == 0.0 {
        errors.push(ConfigError::InvalidRange("balancer.step_fraction"));
    }

    let lg = &spec.loop_guarantee;
    check_positive(&mut errors, "loop_guarantee.max_reach", lg.max_reach);
    check_positive(&mut errors, "loop_guarantee.hop_distance", lg.hop_distance);
    if lg.max_cycle_len < 3 {
        errors.push(ConfigError::InvalidRange("loop_guarantee.max_cycle_len"));
    }
    match catalog.resolve(&lg.extension_category) {
        Some(c) if catalog.is_planet(c) => {}
        Some(_) => errors.push(ConfigError::InvalidRange("loop_guarantee.extension_category")),
        None => errors.push(ConfigError::UnknownCategory(lg.extension_category.clone())),
    }
    for sub in &lg.substitutions {
        for tag in [&sub.from, &sub.to] {
            if catalog.resolve(tag).is_none() {
                errors.push(ConfigError::UnknownCategory(tag.clone()));
            }
        }
    }

    let r = &spec.rifts;
    check_range(&mut errors, "rifts.length", r.min_length, r.max_length);
    check_range(&mut errors, "rifts.start_radius", r.start_min_radius, r.start_max_radius);
    check_range(&mut errors, "rifts.step", r.step_min, r.step_max);
    check_range(&mut errors, "rifts.width", r.width_min, r.width_max);
    if r.count > 0 {
        check_positive(&mut errors, "rifts.step_min", r.step_min);
        check_positive(&mut errors, "rifts.sample_step", r.sample_step);
        check_positive(&mut errors, "rifts.snap_radius", r.snap_radius);
    }
    check_non_negative(&mut errors, "rifts.forced_band", r.forced_band);
    check_non_negative(&mut errors, "rifts.pad", r.pad);
    check_non_negative(&mut errors, "rifts.origin_clearance", r.origin_clearance);
    check_non_negative(&mut errors, "rifts.max_turn", r.max_turn);
    check_non_negative(&mut errors, "rifts.max_heading_jitter", r.max_heading_jitter);
    check_non_negative(&mut errors, "rifts.joint_radius", r.joint_radius);
    check_non_negative(&mut errors, "rifts.end_extension", r.end_extension);
    check_non_negative(&mut errors, "rifts.tag_margin", r.tag_margin);
    if r.forced_count > r.forced_closeness.len() {
        errors.push(ConfigError::InvalidRange("rifts.forced_count"));
    }
    if r.forced_closeness.iter().any(|d| !(d.is_finite() && *d >= 0.0)) {
        errors.push(ConfigError::InvalidRange("rifts.forced_closeness"));
    }
    if !(0.0..=1.0).contains(&r.joint_chance) || !(0.0..=1.0).contains(&r.taper_chance) {
        errors.push(ConfigError::InvalidRange("rifts.chance"));
    }

    for zone in &spec.rip_zones {
        for crossing in &zone.crossings {
            if crossing.rip >= r.count {
                errors.push(ConfigError::UnknownRipIndex {
                    zone: zone.name.clone(),
                    rip: crossing.rip,
                });
            }
        }
    }

    for req in &spec.required_structures {
        match catalog.resolve(&req.category) {
            None => errors.push(ConfigError::UnknownCategory(req.category.clone())),
            Some(c) if catalog.family(c) != Family::Structure => {
                errors.push(ConfigError::InvalidRange("required_structures.category"))
            }
            Some(_) => {}
        }
        if req.zone >= spec.rings.len() {
            errors.push(ConfigError::InvalidStructureZone {
                category: req.category.clone(),
                zone: req.zone,
            });
        }
        if req.min_radius > req.max_radius {
            errors.push(ConfigError::InvalidRange("required_structures.radius"));
        }
    }

    if spec.max_attempts == 0 {
        errors.push(ConfigError::InvalidRange("max_attempts"));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_is_valid() {
        let errors = validate_spec(&SectorSpec::default());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_bundled_spec_parses_and_validates() {
        let text = include_str!("../../../data/sector_spec.json");
        let spec = SectorSpec::from_json(text).expect("bundled spec should parse");
        assert!(validate_spec(&spec).is_empty());
        assert!(spec.resolve().is_ok());
    }

    #[test]
    fn test_unknown_tag_reported() {
        let mut spec = SectorSpec::default();
        spec.category_weights
            .small
            .insert("planet.lava".to_string(), 0.2);
        let errors = validate_spec(&spec);
        assert!(errors.contains(&ConfigError::UnknownCategory("planet.lava".into())));
    }

    #[test]
    fn test_missing_coefficients_reported() {
        let mut spec = SectorSpec::default();
        spec.categories.remove("planet.mining");
        let errors = validate_spec(&spec);
        assert!(errors.contains(&ConfigError::MissingCoefficients("planet.mining".into())));
    }

    #[test]
    fn test_empty_size_table_reported() {
        let mut spec = SectorSpec::default();
        spec.category_weights.big.clear();
        assert!(validate_spec(&spec).contains(&ConfigError::MissingSizeTable(SizeClass::Big)));
    }

    #[test]
    fn test_negative_rift_distances_rejected() {
        let cases: [(&str, fn(&mut RiftSpec)); 8] = [
            ("rifts.forced_band", |r| r.forced_band = -1.0),
            ("rifts.pad", |r| r.pad = -0.1),
            ("rifts.origin_clearance", |r| r.origin_clearance = -2.0),
            ("rifts.max_turn", |r| r.max_turn = -0.5),
            ("rifts.max_heading_jitter", |r| r.max_heading_jitter = f64::NAN),
            ("rifts.joint_radius", |r| r.joint_radius = -0.35),
            ("rifts.end_extension", |r| r.end_extension = f64::INFINITY),
            ("rifts.tag_margin", |r| r.tag_margin = -0.3),
        ];
        for (field, break_it) in cases {
            let mut spec = SectorSpec::default();
            break_it(&mut spec.rifts);
            let errors = validate_spec(&spec);
            assert_eq!(errors, vec![ConfigError::InvalidRange(field)], "{}", field);
        }
    }

    #[test]
    fn test_negative_forced_band_fails_before_generation() {
        let mut spec = SectorSpec::default();
        spec.rifts.forced_band = -1.0;
        spec.rifts.forced_closeness = vec![2.0];
        spec.rifts.forced_count = 1;
        assert!(spec.resolve().is_err());
        assert!(matches!(
            crate::generate::generate(&spec, 1),
            Err(crate::error::GenError::Config(_))
        ));
    }

    #[test]
    fn test_forced_closeness_entries_checked() {
        let mut spec = SectorSpec::default();
        spec.rifts.forced_closeness = vec![2.0, -3.0];
        assert!(validate_spec(&spec).contains(&ConfigError::InvalidRange("rifts.forced_closeness")));
    }

    #[test]
    fn test_rip_zone_index_checked() {
        let mut spec = SectorSpec::default();
        spec.rip_zones[0].crossings[0].rip = 9;
        assert!(validate_spec(&spec).contains(&ConfigError::UnknownRipIndex {
            zone: "beyond_first_rift".into(),
            rip: 9
        }));
    }

    #[test]
    fn test_extension_category_usable() {
        let mut spec = SectorSpec::default();
        spec.extensions.push(ExtensionSpec {
            tag: "mod.ice_giant".into(),
            family: Family::Planet,
        });
        spec.category_weights
            .big
            .insert("mod.ice_giant".into(), 0.2);
        spec.categories
            .insert("mod.ice_giant".into(), coefficients(1.1, 0.9));
        let tables = spec.resolve().unwrap();
        let ext = tables.catalog.resolve("mod.ice_giant").unwrap();
        assert!(tables.is_planet(ext));
        assert!((tables.link_value(ext) - 1.1).abs() < 1e-12);
        assert!(tables.options(SizeClass::Big).any(|c| c == ext));
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            SectorSpec::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let text = r#"{
            "rings": [{ "radius": 0.0, "tolerance": 2.0, "target_count": 5 }],
            "size_weights": { "small": 1.0, "medium": 0.0, "big": 0.0 },
            "category_weights": {
                "small": { "nothing": 1.0 },
                "medium": { "nothing": 1.0 },
                "big": { "nothing": 1.0 }
            },
            "categories": {}
        }"#;
        let spec = SectorSpec::from_json(text).unwrap();
        assert_eq!(spec.max_attempts, 8);
        assert_eq!(spec.rifts.count, 0);
        assert!(validate_spec(&spec).is_empty());
    }
}
