//! Fairness balancer: greedy local search on zone link value.
//!
//! Zones are processed from the outermost ring inward. Inside a zone,
//! non-empty signals are visited in change-aversion order and each may be
//! moved to another category of its own family allowed for its size; the
//! move whose counterfactual effect lands closest to the desired partial
//! correction wins. There is no backtracking across zones. Staying within
//! the family keeps the corrected zone planet counts intact.
//!
//! Neighbor contributions from other zones count toward the acting zone's
//! running total. This overstates the effect of moves near zone borders; the
//! realized total is recomputed at the end and judged against the tolerance.

use serde::{Deserialize, Serialize};

use crate::category::{Category, Family};
use crate::context::GenContext;
use crate::error::{DiagnosticKind, GenError};
use crate::geometry::Point;
use crate::link::LinkModel;
use crate::pipeline::Refinement;
use crate::signal::{SignalId, ZoneId};

/// Realized totals closer than this to the recorded result are unchanged.
const STALE_EPSILON: f64 = 1e-9;

/// Outcome of balancing one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBalance {
    pub zone: ZoneId,
    pub target: f64,
    pub before: f64,
    pub after: f64,
    pub threshold: f64,
    pub mutations: u32,
    pub converged: bool,
}

pub struct LinkBalance;

impl Refinement for LinkBalance {
    fn name(&self) -> &str {
        "link_balance"
    }

    fn priority(&self) -> i32 {
        400
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        if !ctx.spec.balancer.enabled {
            return Ok(());
        }
        let results = balance_all(ctx);
        for r in results.iter().filter(|r| !r.converged) {
            report(ctx, r);
        }
        ctx.balance = results;
        Ok(())
    }
}

fn report(ctx: &mut GenContext<'_>, r: &ZoneBalance) {
    ctx.diagnose(
        "link_balance",
        DiagnosticKind::SoftDeviation,
        format!(
            "zone {} link value {:.2} vs target {:.2} (tolerance {:.2}, {} moves)",
            r.zone.0, r.after, r.target, r.threshold, r.mutations
        ),
    );
}

/// Balance every zone, outermost first.
pub fn balance_all(ctx: &mut GenContext<'_>) -> Vec<ZoneBalance> {
    let zones: Vec<ZoneId> = ctx.zones.iter().map(|z| z.id).collect();
    let mut model = LinkModel::new(ctx);
    outermost_first(ctx, zones)
        .into_iter()
        .map(|zone| balance_zone(ctx, &mut model, zone))
        .collect()
}

fn outermost_first(ctx: &GenContext<'_>, zones: Vec<ZoneId>) -> Vec<ZoneId> {
    let mut order: Vec<(f64, ZoneId)> = zones
        .into_iter()
        .filter_map(|id| ctx.zones.get(id.index()).map(|z| (z.outer, id)))
        .collect();
    order.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    order.into_iter().map(|(_, id)| id).collect()
}

/// Re-balance zones whose realized link total no longer matches the recorded
/// result, after a later pass changed categories. Signals in `hold` are
/// locked for the duration. Results are folded into `ctx.balance` and every
/// zone that ends up outside tolerance is reported again.
pub fn rebalance(ctx: &mut GenContext<'_>, hold: &[SignalId]) {
    if !ctx.spec.balancer.enabled || ctx.balance.is_empty() {
        return;
    }
    let mut model = LinkModel::new(ctx);
    let recorded: Vec<(ZoneId, f64)> = ctx.balance.iter().map(|b| (b.zone, b.after)).collect();
    let mut stale = Vec::new();
    for (zone, after) in recorded {
        if (model.zone_total(ctx, zone) - after).abs() > STALE_EPSILON {
            stale.push(zone);
        }
    }
    if stale.is_empty() {
        return;
    }

    let held: Vec<SignalId> = hold
        .iter()
        .copied()
        .filter(|id| ctx.signals.get(*id).is_some_and(|s| !s.locked))
        .collect();
    set_locked(ctx, &held, true);

    for zone in outermost_first(ctx, stale) {
        let r = balance_zone(ctx, &mut model, zone);
        log::debug!(
            "zone {} re-balanced: {:.2} -> {:.2} ({} moves)",
            zone.0,
            r.before,
            r.after,
            r.mutations
        );
        let Some(i) = ctx.balance.iter().position(|b| b.zone == zone) else {
            continue;
        };
        let merged = ZoneBalance {
            before: ctx.balance[i].before,
            mutations: ctx.balance[i].mutations + r.mutations,
            ..r
        };
        if !merged.converged {
            report(ctx, &merged);
        }
        ctx.balance[i] = merged;
    }

    set_locked(ctx, &held, false);
}

fn set_locked(ctx: &mut GenContext<'_>, ids: &[SignalId], locked: bool) {
    for id in ids {
        if let Some(s) = ctx.signals.get_mut(*id) {
            s.locked = locked;
        }
    }
}

fn threshold(ctx: &GenContext<'_>, zone: ZoneId) -> f64 {
    let b = &ctx.spec.balancer;
    let n = ctx.zones[zone.index()].signals.len() as f64;
    (b.tolerance_per_signal * n).max(b.tolerance_floor)
}

/// Unlocked non-empty signals of the zone, least change-averse first, then by
/// distance to the zone center and position.
fn candidates(ctx: &GenContext<'_>, zone: ZoneId) -> Vec<SignalId> {
    let z = &ctx.zones[zone.index()];
    let mut ranked: Vec<(f64, f64, Point, SignalId)> = z
        .signals
        .iter()
        .filter_map(|id| ctx.signals.get(*id))
        .filter(|s| !s.locked && ctx.tables.family(s.category) != Family::Empty)
        .map(|s| {
            (
                ctx.tables.change_aversion(s.category),
                s.pos.distance(z.center),
                s.pos,
                s.id,
            )
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.x.total_cmp(&b.2.x))
            .then(a.2.y.total_cmp(&b.2.y))
            .then(a.3.cmp(&b.3))
    });
    ranked.into_iter().map(|r| r.3).collect()
}

fn same_category_neighbors(ctx: &GenContext<'_>, id: SignalId, category: Category) -> usize {
    let Some(s) = ctx.signals.get(id) else {
        return 0;
    };
    let radius = ctx.world(ctx.spec.classifier.monotony_radius);
    ctx.signals
        .within(s.pos, radius)
        .into_iter()
        .filter(|(n, _)| *n != id && ctx.signals.category(*n) == Some(category))
        .count()
}

/// Greedy pass over one zone. Performs no mutation when the zone is already
/// within tolerance.
pub fn balance_zone(ctx: &mut GenContext<'_>, model: &mut LinkModel, zone: ZoneId) -> ZoneBalance {
    let b = ctx.spec.balancer.clone();
    let tables = ctx.tables;
    let target = ctx.zones[zone.index()].link_target();
    let threshold = threshold(ctx, zone);
    let before = model.zone_total(ctx, zone);
    let mut total = before;
    let mut mutations = 0u32;

    for id in candidates(ctx, zone) {
        let delta = target - total;
        if delta.abs() <= threshold {
            break;
        }
        let desired = delta * b.step_fraction;
        let Some(signal) = ctx.signals.get(id) else {
            continue;
        };
        let (current, size) = (signal.category, signal.size);

        let mut best: Option<(Category, f64, f64)> = None;
        let family = tables.family(current);
        for option in tables.options(size) {
            if option == current || tables.family(option) != family {
                continue;
            }
            let effect = model.counterfactual(ctx, id, option);
            let penalty = if same_category_neighbors(ctx, id, option) >= 2 {
                b.repetition_penalty
            } else {
                0.0
            };
            let score = (effect - desired).abs() + penalty;
            if best.map_or(true, |(_, _, s)| score < s) {
                best = Some((option, effect, score));
            }
        }

        let Some((option, effect, _)) = best else {
            continue;
        };
        if effect.abs() < b.min_effect || (delta - effect).abs() >= delta.abs() {
            continue;
        }
        ctx.signals.set_category(id, option);
        model.invalidate(ctx, id);
        total += effect;
        mutations += 1;
    }

    let after = model.zone_total(ctx, zone);
    ZoneBalance {
        zone,
        target,
        before,
        after,
        threshold,
        mutations,
        converged: (target - after).abs() <= threshold,
    }
}
