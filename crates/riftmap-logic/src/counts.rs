//! Zone-count correction: pulls each zone's planet count to its target.
//!
//! Runs after classification. Surplus planets are demoted to a non-planet
//! category, shortfalls are filled by promoting non-planets, each pick drawn
//! with the size class's own weights restricted to the wanted family. A zone
//! that runs out of convertible signals keeps its closest count and logs a
//! soft deviation.

use rand::Rng;

use crate::category::{Category, Family};
use crate::classify::weighted_pick;
use crate::context::GenContext;
use crate::error::{DiagnosticKind, GenError};
use crate::pipeline::Refinement;
use crate::signal::SignalId;

pub struct ZoneCountCorrection;

impl Refinement for ZoneCountCorrection {
    fn name(&self) -> &str {
        "zone_counts"
    }

    fn priority(&self) -> i32 {
        200
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        let mut rng = ctx.stream("zone_counts");
        for zi in 0..ctx.zones.len() {
            if let Some(target) = ctx.zones[zi].target_planets {
                correct_zone(ctx, zi, target as usize, &mut rng);
            }
        }
        Ok(())
    }
}

/// Weights for `size` limited to one family (planet or not).
fn family_weights(ctx: &GenContext<'_>, id: SignalId, want_planet: bool) -> Vec<(Category, f64)> {
    let Some(signal) = ctx.signals.get(id) else {
        return Vec::new();
    };
    ctx.tables
        .weights(signal.size)
        .iter()
        .filter(|(c, w)| *w > 0.0 && (ctx.tables.family(*c) == Family::Planet) == want_planet)
        .copied()
        .collect()
}

fn correct_zone<R: Rng + ?Sized>(ctx: &mut GenContext<'_>, zi: usize, target: usize, rng: &mut R) {
    let mut current = ctx.planet_count(zi);
    let start = current;

    while current != target {
        let want_planet = current < target;
        let mut pool: Vec<SignalId> = ctx.zones[zi]
            .signals
            .iter()
            .copied()
            .filter(|id| {
                ctx.signals.get(*id).is_some_and(|s| {
                    !s.locked && ctx.tables.is_planet(s.category) != want_planet
                })
            })
            .filter(|id| !want_planet || !family_weights(ctx, *id, true).is_empty())
            .collect();
        pool.sort();

        if pool.is_empty() {
            ctx.diagnose(
                "zone_counts",
                DiagnosticKind::SoftDeviation,
                format!(
                    "zone {} planet count stuck at {} (target {}, started at {})",
                    zi, current, target, start
                ),
            );
            return;
        }

        let id = pool[rng.gen_range(0..pool.len())];
        let next = weighted_pick(rng, &family_weights(ctx, id, want_planet)).unwrap_or(Category::Empty);
        ctx.signals.set_category(id, next);
        if want_planet {
            current += 1;
        } else {
            current -= 1;
        }
    }

    if start != target {
        log::debug!("zone {} planets {} -> {}", zi, start, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RingSpec, SectorSpec};
    use crate::geometry::Point;

    fn spec_with_targets(planets: [u32; 2]) -> SectorSpec {
        let mut spec = SectorSpec::default();
        spec.rings = vec![
            RingSpec {
                center: Point::ORIGIN,
                radius: 0.0,
                tolerance: 3.0,
                target_count: 25,
                target_planets: Some(planets[0]),
                target_link: 0.0,
            },
            RingSpec {
                center: Point::ORIGIN,
                radius: 5.5,
                tolerance: 2.0,
                target_count: 45,
                target_planets: Some(planets[1]),
                target_link: 0.0,
            },
        ];
        spec.required_structures.clear();
        spec
    }

    fn run(spec: &SectorSpec, seed: u64) -> Vec<usize> {
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(spec, &tables, seed, 0);
        crate::zone::scatter(&mut ctx);
        crate::classify::classify_all(&mut ctx);
        ZoneCountCorrection.apply(&mut ctx).unwrap();
        (0..ctx.zones.len()).map(|z| ctx.planet_count(z)).collect()
    }

    #[test]
    fn test_counts_reach_targets() {
        let spec = spec_with_targets([10, 20]);
        for seed in 0..5 {
            let counts = run(&spec, seed);
            assert!(counts[0].abs_diff(10) <= 1, "seed {}: {:?}", seed, counts);
            assert!(counts[1].abs_diff(20) <= 1, "seed {}: {:?}", seed, counts);
        }
    }

    #[test]
    fn test_zero_target_clears_planets() {
        let spec = spec_with_targets([0, 0]);
        assert_eq!(run(&spec, 4), vec![0, 0]);
    }

    #[test]
    fn test_zone_counts_unchanged() {
        let spec = spec_with_targets([10, 20]);
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 8, 0);
        crate::zone::scatter(&mut ctx);
        crate::classify::classify_all(&mut ctx);
        let before: Vec<usize> = ctx.zones.iter().map(|z| z.signals.len()).collect();
        ZoneCountCorrection.apply(&mut ctx).unwrap();
        let after: Vec<usize> = ctx.zones.iter().map(|z| z.signals.len()).collect();
        assert_eq!(before, after);
    }
}
