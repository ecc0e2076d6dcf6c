//! Loop guarantee: the origin zone must sit on a short cycle of planets.
//!
//! Planets within `max_reach` of the origin form a graph whose edges join
//! planets closer than `hop_distance` with a clear sight line. The pass first
//! looks for a cycle, then tries a direct extension (turning a nearby
//! non-planet into a planet), then falls back to speculative swaps from the
//! substitution table. Only one speculative swap is ever outstanding: a swap
//! that does not close a cycle is rolled back before the next attempt.
//!
//! Extensions and swaps shift link values in zones the balancer has already
//! settled, so those zones are re-balanced afterwards with the cycle held.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::context::GenContext;
use crate::error::{DiagnosticKind, GenError};
use crate::geometry::Point;
use crate::link::line_of_sight;
use crate::pipeline::Refinement;
use crate::retry::{Exhaustion, Retry, RetryOutcome};
use crate::signal::SignalId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    AlreadySatisfied,
    /// A non-planet was converted to close the cycle.
    Extended { signal: SignalId },
    /// A substitution swap closed the cycle on this attempt.
    Speculative { attempts: u32 },
    Failed { attempts: u32 },
}

pub struct LoopGuarantee;

impl Refinement for LoopGuarantee {
    fn name(&self) -> &str {
        "loop_guarantee"
    }

    fn priority(&self) -> i32 {
        500
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        if !ctx.spec.loop_guarantee.enabled {
            return Ok(());
        }
        let outcome = guarantee_loop(ctx);
        if let LoopOutcome::Failed { attempts } = outcome {
            ctx.diagnose(
                self.name(),
                DiagnosticKind::RetryExhausted,
                format!("no planet cycle from the origin zone after {} swaps", attempts),
            );
        } else {
            log::debug!("loop guarantee: {:?}", outcome);
        }
        if matches!(outcome, LoopOutcome::Extended { .. } | LoopOutcome::Speculative { .. }) {
            let cycle = find_cycle(ctx).unwrap_or_default();
            crate::balance::rebalance(ctx, &cycle);
        }
        ctx.loop_outcome = Some(outcome);
        Ok(())
    }
}

/// Planets near the origin and the visible hops between them.
pub struct PlanetGraph {
    adjacency: BTreeMap<SignalId, Vec<SignalId>>,
}

impl PlanetGraph {
    pub fn build(ctx: &GenContext<'_>) -> Self {
        let lg = &ctx.spec.loop_guarantee;
        let reach = ctx.world(lg.max_reach);
        let hop = ctx.world(lg.hop_distance);
        let block = ctx.world(ctx.spec.balancer.los_block_radius);

        let is_node = |id: SignalId| {
            ctx.signals.get(id).is_some_and(|s| {
                ctx.tables.is_planet(s.category) && s.pos.distance(Point::ORIGIN) <= reach
            })
        };

        let mut adjacency = BTreeMap::new();
        for (id, _) in ctx.signals.within(Point::ORIGIN, reach) {
            if !is_node(id) {
                continue;
            }
            let Some(pos) = ctx.signals.get(id).map(|s| s.pos) else {
                continue;
            };
            let mut next: Vec<SignalId> = ctx
                .signals
                .within(pos, hop)
                .into_iter()
                .map(|(n, _)| n)
                .filter(|n| *n != id && is_node(*n) && line_of_sight(ctx, id, *n, block))
                .collect();
            next.sort();
            adjacency.insert(id, next);
        }
        Self { adjacency }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn neighbors(&self, id: SignalId) -> &[SignalId] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Simple cycle of 3 to `max_len` nodes through `start`.
    pub fn cycle_through(&self, start: SignalId, max_len: usize) -> Option<Vec<SignalId>> {
        let mut path = vec![start];
        self.extend(start, &mut path, max_len).then_some(path)
    }

    fn extend(&self, start: SignalId, path: &mut Vec<SignalId>, max_len: usize) -> bool {
        let Some(&last) = path.last() else {
            return false;
        };
        for &n in self.neighbors(last) {
            if n == start && path.len() >= 3 {
                return true;
            }
            if path.len() < max_len && !path.contains(&n) {
                path.push(n);
                if self.extend(start, path, max_len) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}

/// First cycle found from an origin-zone planet, trying starts in id order.
pub fn find_cycle(ctx: &GenContext<'_>) -> Option<Vec<SignalId>> {
    let graph = PlanetGraph::build(ctx);
    if graph.len() < 3 {
        return None;
    }
    let max_len = ctx.spec.loop_guarantee.max_cycle_len;
    let origin = ctx.zones.first()?;
    let mut starts: Vec<SignalId> = origin
        .signals
        .iter()
        .copied()
        .filter(|id| !graph.neighbors(*id).is_empty())
        .collect();
    starts.sort();
    starts
        .into_iter()
        .find_map(|s| graph.cycle_through(s, max_len))
}

pub fn guarantee_loop(ctx: &mut GenContext<'_>) -> LoopOutcome {
    if find_cycle(ctx).is_some() {
        return LoopOutcome::AlreadySatisfied;
    }
    if let Some(signal) = try_extension(ctx) {
        return LoopOutcome::Extended { signal };
    }
    speculate(ctx)
}

/// Convert the nearest eligible non-planet that closes a cycle. Conversions
/// that do not help are reverted immediately.
fn try_extension(ctx: &mut GenContext<'_>) -> Option<SignalId> {
    let tables = ctx.tables;
    let lg = &ctx.spec.loop_guarantee;
    let reach = ctx.world(lg.max_reach);
    let limit = lg.max_extension_candidates;

    let candidates: Vec<SignalId> = ctx
        .signals
        .within(Point::ORIGIN, reach)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| {
            ctx.signals
                .get(*id)
                .is_some_and(|s| !s.locked && !tables.is_planet(s.category))
        })
        .take(limit)
        .collect();

    for id in candidates {
        let Some(previous) = ctx.signals.set_category(id, tables.extension_category) else {
            continue;
        };
        if find_cycle(ctx).is_some() {
            return Some(id);
        }
        ctx.signals.set_category(id, previous);
    }
    None
}

/// Unlocked signals of `category` in zone `zone` within reach, by id.
fn pool(ctx: &GenContext<'_>, zone: usize, category: Category, reach: f64) -> Vec<SignalId> {
    let mut ids: Vec<SignalId> = ctx.zones[zone]
        .signals
        .iter()
        .copied()
        .filter(|id| {
            ctx.signals.get(*id).is_some_and(|s| {
                !s.locked && s.category == category && s.pos.distance(Point::ORIGIN) <= reach
            })
        })
        .collect();
    ids.sort();
    ids
}

fn speculate(ctx: &mut GenContext<'_>) -> LoopOutcome {
    let tables = ctx.tables;
    let lg = &ctx.spec.loop_guarantee;
    let reach = ctx.world(lg.max_reach);
    let retry = Retry::new(lg.retry_budget, Exhaustion::Warn);
    let mut rng = ctx.stream("loop_guarantee");

    let outcome = retry.run(|_| {
        if tables.substitutions.is_empty() {
            return None;
        }
        let (a, b) = tables.substitutions[rng.gen_range(0..tables.substitutions.len())];
        let zones: Vec<(Vec<SignalId>, Vec<SignalId>)> = (0..ctx.zones.len())
            .map(|z| (pool(ctx, z, a, reach), pool(ctx, z, b, reach)))
            .filter(|(pa, pb)| !pa.is_empty() && !pb.is_empty())
            .collect();
        if zones.is_empty() {
            return None;
        }
        let (pa, pb) = &zones[rng.gen_range(0..zones.len())];
        let sa = pa[rng.gen_range(0..pa.len())];
        let sb = pb[rng.gen_range(0..pb.len())];

        ctx.signals.set_category(sa, b);
        ctx.signals.set_category(sb, a);
        if find_cycle(ctx).is_some() {
            return Some(());
        }
        ctx.signals.set_category(sa, a);
        ctx.signals.set_category(sb, b);
        None
    });

    match outcome {
        RetryOutcome::Succeeded { attempts, .. } => LoopOutcome::Speculative { attempts },
        RetryOutcome::Exhausted { attempts } => LoopOutcome::Failed { attempts },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{PlanetKind, SizeClass, StructureKind};
    use crate::config::{RingSpec, SectorSpec, SubstitutionSpec};
    use crate::signal::ZoneId;

    const MINING: Category = Category::Planet(PlanetKind::Mining);
    const AGRARIAN: Category = Category::Planet(PlanetKind::Agrarian);
    const DERELICT: Category = Category::Structure(StructureKind::Derelict);

    fn put(ctx: &mut GenContext<'_>, x: f64, y: f64, cat: Category) -> SignalId {
        let id = ctx.signals.push(Point::new(x, y), ZoneId(0));
        ctx.zones[0].signals.push(id);
        let s = ctx.signals.get_mut(id).unwrap();
        s.category = cat;
        s.size = SizeClass::Small;
        s.classified = true;
        id
    }

    fn hand_built_spec() -> SectorSpec {
        let mut spec = SectorSpec::default();
        spec.loop_guarantee.substitutions = vec![SubstitutionSpec {
            from: "planet.agrarian".into(),
            to: "structure.derelict".into(),
        }];
        spec
    }

    #[test]
    fn test_triangle_is_found() {
        let spec = SectorSpec::default();
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        put(&mut ctx, 0.5, 0.0, MINING);
        put(&mut ctx, -0.5, 0.0, MINING);
        put(&mut ctx, 0.0, 0.8, MINING);

        let cycle = find_cycle(&ctx).unwrap();
        assert_eq!(cycle.len(), 3);
        assert_eq!(guarantee_loop(&mut ctx), LoopOutcome::AlreadySatisfied);
    }

    #[test]
    fn test_extension_closes_cycle() {
        let spec = hand_built_spec();
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        put(&mut ctx, 0.5, 0.0, MINING);
        put(&mut ctx, -0.5, 0.0, MINING);
        let gap = put(&mut ctx, 0.0, 0.8, Category::Empty);

        assert!(find_cycle(&ctx).is_none());
        assert_eq!(guarantee_loop(&mut ctx), LoopOutcome::Extended { signal: gap });
        assert!(find_cycle(&ctx).is_some());
    }

    #[test]
    fn test_speculative_swap_closes_cycle() {
        let mut spec = hand_built_spec();
        spec.loop_guarantee.max_extension_candidates = 0;
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        put(&mut ctx, 0.5, 0.0, MINING);
        put(&mut ctx, -0.5, 0.0, MINING);
        let derelict = put(&mut ctx, 0.0, 0.8, DERELICT);
        let agrarian = put(&mut ctx, 0.0, -2.3, AGRARIAN);

        let outcome = guarantee_loop(&mut ctx);
        assert!(matches!(outcome, LoopOutcome::Speculative { .. }), "{:?}", outcome);
        assert_eq!(ctx.signals.category(derelict), Some(AGRARIAN));
        assert_eq!(ctx.signals.category(agrarian), Some(DERELICT));
        assert!(find_cycle(&ctx).is_some());
    }

    #[test]
    fn test_zero_budget_fails_cleanly() {
        let mut spec = SectorSpec::default();
        spec.rings = vec![
            RingSpec {
                center: Point::ORIGIN,
                radius: 0.0,
                tolerance: 2.5,
                target_count: 14,
                target_planets: Some(0),
                target_link: 0.0,
            },
            RingSpec {
                center: Point::ORIGIN,
                radius: 4.5,
                tolerance: 1.5,
                target_count: 40,
                target_planets: None,
                target_link: 0.0,
            },
        ];
        spec.required_structures.clear();
        spec.loop_guarantee.retry_budget = 0;
        spec.loop_guarantee.max_extension_candidates = 0;
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 6, 0);
        crate::zone::scatter(&mut ctx);
        crate::classify::classify_all(&mut ctx);
        crate::counts::ZoneCountCorrection.apply(&mut ctx).unwrap();

        let before: Vec<Category> = ctx.signals.iter().map(|s| s.category).collect();
        LoopGuarantee.apply(&mut ctx).unwrap();
        let after: Vec<Category> = ctx.signals.iter().map(|s| s.category).collect();

        assert_eq!(ctx.loop_outcome, Some(LoopOutcome::Failed { attempts: 0 }));
        assert_eq!(before, after);
        assert!(ctx
            .diagnostics
            .iter()
            .any(|d| d.pass == "loop_guarantee" && d.kind == DiagnosticKind::RetryExhausted));
    }

    #[test]
    fn test_failed_swaps_are_rolled_back() {
        let mut spec = hand_built_spec();
        spec.loop_guarantee.max_extension_candidates = 0;
        spec.loop_guarantee.retry_budget = 8;
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        // Two planets far apart and a swap pair that cannot help.
        put(&mut ctx, 0.5, 0.0, MINING);
        put(&mut ctx, -2.0, 0.0, MINING);
        put(&mut ctx, 2.0, 1.5, DERELICT);
        put(&mut ctx, 1.5, -1.5, AGRARIAN);

        let before: Vec<Category> = ctx.signals.iter().map(|s| s.category).collect();
        let outcome = guarantee_loop(&mut ctx);
        let after: Vec<Category> = ctx.signals.iter().map(|s| s.category).collect();
        assert_eq!(outcome, LoopOutcome::Failed { attempts: 8 });
        assert_eq!(before, after);
    }
}
