//! Link-value model.
//!
//! The link value of a signal is the sum, over every neighbor it can see
//! within `link_radius`, of `link(own) * link(neighbor)`. A sight line is
//! blocked by a Big signal sitting within `los_block_radius` of it, or by a
//! rift. Visibility is symmetric, so reassigning one signal changes its own
//! value and the value of every neighbor it sees.
//!
//! Positions and sizes are frozen once the balancer runs, so neighbor lists
//! are cached for the model's lifetime; link values are cached per signal
//! and invalidated explicitly on reassignment.

use std::collections::HashMap;

use crate::category::{Category, SizeClass};
use crate::context::GenContext;
use crate::geometry::point_segment_distance;
use crate::signal::{SignalId, ZoneId};

pub struct LinkModel {
    radius: f64,
    block_radius: f64,
    neighbors: HashMap<SignalId, Vec<SignalId>>,
    values: HashMap<SignalId, f64>,
}

impl LinkModel {
    pub fn new(ctx: &GenContext<'_>) -> Self {
        Self {
            radius: ctx.world(ctx.spec.balancer.link_radius),
            block_radius: ctx.world(ctx.spec.balancer.los_block_radius),
            neighbors: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Neighbors of `id` within the link radius with a clear sight line.
    pub fn visible_neighbors(&mut self, ctx: &GenContext<'_>, id: SignalId) -> Vec<SignalId> {
        if let Some(cached) = self.neighbors.get(&id) {
            return cached.clone();
        }
        let found = match ctx.signals.get(id) {
            Some(s) => ctx
                .signals
                .within(s.pos, self.radius)
                .into_iter()
                .map(|(n, _)| n)
                .filter(|n| *n != id && line_of_sight(ctx, id, *n, self.block_radius))
                .collect(),
            None => Vec::new(),
        };
        self.neighbors.insert(id, found.clone());
        found
    }

    /// Link value of `id` as if it had category `own`.
    pub fn link_as(&mut self, ctx: &GenContext<'_>, id: SignalId, own: Category) -> f64 {
        let own_value = ctx.tables.link_value(own);
        if own_value == 0.0 {
            return 0.0;
        }
        self.visible_neighbors(ctx, id)
            .into_iter()
            .filter_map(|n| ctx.signals.category(n))
            .map(|c| own_value * ctx.tables.link_value(c))
            .sum()
    }

    /// Current (cached) link value of `id`.
    pub fn link(&mut self, ctx: &GenContext<'_>, id: SignalId) -> f64 {
        if let Some(v) = self.values.get(&id) {
            return *v;
        }
        let v = match ctx.signals.category(id) {
            Some(c) => self.link_as(ctx, id, c),
            None => 0.0,
        };
        self.values.insert(id, v);
        v
    }

    /// Sum of link values over the zone's signals. Neighbors outside the
    /// zone still contribute to each member's value.
    pub fn zone_total(&mut self, ctx: &GenContext<'_>, zone: ZoneId) -> f64 {
        let members = ctx.zones[zone.index()].signals.clone();
        members.into_iter().map(|id| self.link(ctx, id)).sum()
    }

    /// Change in total link value if `id` were reassigned to `to`: its own
    /// change plus the change seen by each visible neighbor.
    pub fn counterfactual(&mut self, ctx: &GenContext<'_>, id: SignalId, to: Category) -> f64 {
        let Some(from) = ctx.signals.category(id) else {
            return 0.0;
        };
        if from == to {
            return 0.0;
        }
        let own = self.link_as(ctx, id, to) - self.link(ctx, id);
        let dv = ctx.tables.link_value(to) - ctx.tables.link_value(from);
        let spill: f64 = self
            .visible_neighbors(ctx, id)
            .into_iter()
            .filter_map(|n| ctx.signals.category(n))
            .map(|c| ctx.tables.link_value(c) * dv)
            .sum();
        own + spill
    }

    /// Drop cached values of `id` and its neighbors after a reassignment.
    pub fn invalidate(&mut self, ctx: &GenContext<'_>, id: SignalId) {
        self.values.remove(&id);
        for n in self.visible_neighbors(ctx, id) {
            self.values.remove(&n);
        }
    }
}

/// True when nothing blocks the sight line between `a` and `b`.
pub fn line_of_sight(ctx: &GenContext<'_>, a: SignalId, b: SignalId, block_radius: f64) -> bool {
    let (Some(sa), Some(sb)) = (ctx.signals.get(a), ctx.signals.get(b)) else {
        return false;
    };
    if ctx.rifts.blocks(sa.pos, sb.pos) {
        return false;
    }
    if block_radius <= 0.0 {
        return true;
    }
    let mid = sa.pos.lerp(sb.pos, 0.5);
    let reach = sa.pos.distance(sb.pos) * 0.5 + block_radius;
    !ctx.signals.within(mid, reach).into_iter().any(|(k, _)| {
        k != a
            && k != b
            && ctx.signals.get(k).is_some_and(|s| {
                s.size == SizeClass::Big
                    && point_segment_distance(s.pos, sa.pos, sb.pos) < block_radius
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::PlanetKind;
    use crate::config::SectorSpec;
    use crate::geometry::Point;

    fn setup(spec: &SectorSpec) -> crate::config::ResolvedTables {
        spec.resolve().unwrap()
    }

    fn put(ctx: &mut GenContext<'_>, x: f64, y: f64, cat: Category, size: SizeClass) -> SignalId {
        let id = ctx.signals.push(Point::new(x, y), ZoneId(0));
        ctx.zones[0].signals.push(id);
        let s = ctx.signals.get_mut(id).unwrap();
        s.category = cat;
        s.size = size;
        s.classified = true;
        id
    }

    const MINING: Category = Category::Planet(PlanetKind::Mining);

    #[test]
    fn test_pair_link_value() {
        let spec = SectorSpec::default();
        let tables = setup(&spec);
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        let a = put(&mut ctx, 0.0, 0.0, MINING, SizeClass::Small);
        let b = put(&mut ctx, 1.0, 0.0, MINING, SizeClass::Small);
        let _far = put(&mut ctx, 0.0, 5.0, MINING, SizeClass::Small);

        let mut model = LinkModel::new(&ctx);
        assert_eq!(model.visible_neighbors(&ctx, a), vec![b]);
        assert!((model.link(&ctx, a) - 1.0).abs() < 1e-12);
        assert!((model.zone_total(&ctx, ZoneId(0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_big_signal_blocks_sight() {
        let spec = SectorSpec::default();
        let tables = setup(&spec);
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        let a = put(&mut ctx, 0.0, 0.0, MINING, SizeClass::Small);
        let b = put(&mut ctx, 1.2, 0.0, MINING, SizeClass::Small);
        let blocker = put(&mut ctx, 0.6, 0.05, Category::Empty, SizeClass::Big);

        let mut model = LinkModel::new(&ctx);
        let seen = model.visible_neighbors(&ctx, a);
        assert!(!seen.contains(&b));
        assert!(seen.contains(&blocker));
    }

    #[test]
    fn test_counterfactual_matches_recomputation() {
        let spec = SectorSpec::default();
        let tables = setup(&spec);
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        ctx.zones = crate::zone::layout_zones(&ctx);
        let a = put(&mut ctx, 0.0, 0.0, Category::Empty, SizeClass::Small);
        put(&mut ctx, 0.8, 0.0, MINING, SizeClass::Small);
        put(&mut ctx, 0.0, 0.9, Category::Planet(PlanetKind::Industrial), SizeClass::Medium);

        let mut model = LinkModel::new(&ctx);
        let before = model.zone_total(&ctx, ZoneId(0));
        let predicted = model.counterfactual(&ctx, a, MINING);

        ctx.signals.set_category(a, MINING);
        model.invalidate(&ctx, a);
        let after = model.zone_total(&ctx, ZoneId(0));
        assert!((after - before - predicted).abs() < 1e-9);
    }
}
