//! Zone layout and candidate placement.
//!
//! Each ring of the spec becomes one [`Zone`]: an annulus around the ring's
//! center spanning `radius ± tolerance`. Signals are scattered uniformly by
//! area inside the annulus with a minimum spacing against every signal placed
//! so far. A zone that cannot reach its target count within the attempt
//! budget is kept under-filled and a soft deviation is logged.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::GenContext;
use crate::error::DiagnosticKind;
use crate::geometry::Point;
use crate::signal::{SignalId, ZoneId};

/// A spatial partition of the sector owning a subset of signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub center: Point,
    /// Inner boundary radius, world units.
    pub inner: f64,
    /// Outer boundary radius, world units.
    pub outer: f64,
    pub target_count: u32,
    pub target_planets: Option<u32>,
    /// Target link value per signal.
    pub target_link: f64,
    pub unlocked: bool,
    pub signals: Vec<SignalId>,
}

impl Zone {
    pub fn contains(&self, p: Point) -> bool {
        let d = p.distance(self.center);
        d >= self.inner && d <= self.outer
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * (self.outer * self.outer - self.inner * self.inner)
    }

    /// Total link target for the zone's current population.
    pub fn link_target(&self) -> f64 {
        self.target_link * self.signals.len() as f64
    }
}

/// Build one empty zone per ring. Zone 0 starts unlocked.
pub fn layout_zones(ctx: &GenContext<'_>) -> Vec<Zone> {
    let scale = ctx.spec.scale;
    ctx.spec
        .rings
        .iter()
        .enumerate()
        .map(|(i, ring)| Zone {
            id: ZoneId(i as u16),
            center: Point::new(scale.world(ring.center.x), scale.world(ring.center.y)),
            inner: scale.world((ring.radius - ring.tolerance).max(0.0)),
            outer: scale.world(ring.radius + ring.tolerance),
            target_count: ring.target_count,
            target_planets: ring.target_planets,
            target_link: ring.target_link,
            unlocked: i == 0,
            signals: Vec::new(),
        })
        .collect()
}

/// Lay out zones and scatter candidate signals into them.
pub fn scatter(ctx: &mut GenContext<'_>) {
    ctx.zones = layout_zones(ctx);
    let mut rng = ctx.stream("scatter");
    let spacing = ctx.world(ctx.spec.placement.min_spacing);
    let attempts_per_signal = ctx.spec.placement.attempts_per_signal;

    for zi in 0..ctx.zones.len() {
        let (center, inner, outer, target) = {
            let z = &ctx.zones[zi];
            (z.center, z.inner, z.outer, z.target_count)
        };
        let budget = target.saturating_mul(attempts_per_signal);
        let mut placed = 0u32;
        let mut tries = 0u32;

        while placed < target && tries < budget {
            tries += 1;
            let r = rng.gen_range(inner * inner..=outer * outer).sqrt();
            let theta = rng.gen_range(0.0..std::f64::consts::TAU);
            let p = center + Point::polar(theta, r);
            if ctx.signals.any_within(p, spacing) {
                continue;
            }
            let id = ctx.signals.push(p, ZoneId(zi as u16));
            ctx.zones[zi].signals.push(id);
            placed += 1;
        }

        if placed < target {
            ctx.diagnose(
                "scatter",
                DiagnosticKind::SoftDeviation,
                format!(
                    "zone {} under-filled: {} of {} signals after {} tries",
                    zi, placed, target, tries
                ),
            );
        }
    }
}
