//! Signal classifier: size class, then content category.
//!
//! Signals are visited in scatter order. Two local rules reshape the weight
//! tables before the single weighted pick per decision:
//!
//! - **Isolation boost**: too few classified neighbors within
//!   `isolation_radius` moves part of the Small weight onto Medium.
//! - **Monotony penalty**: each classified neighbor of category `c` within
//!   `monotony_radius` scales `c`'s weight down by `monotony_penalty`.
//!
//! Both rules only read already-classified neighbors, so the result depends
//! on visiting order; scatter order is fixed by the seed.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::category::{Category, SizeClass};
use crate::context::GenContext;
use crate::signal::SignalId;

/// Pick one item proportionally to its weight. `None` when no weight is
/// positive.
pub fn weighted_pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, items: &[(T, f64)]) -> Option<T> {
    let dist = WeightedIndex::new(items.iter().map(|(_, w)| w.max(0.0))).ok()?;
    Some(items[dist.sample(rng)].0)
}

fn classified_neighbors(ctx: &GenContext<'_>, id: SignalId, radius: f64) -> Vec<SignalId> {
    let Some(signal) = ctx.signals.get(id) else {
        return Vec::new();
    };
    ctx.signals
        .within(signal.pos, radius)
        .into_iter()
        .map(|(n, _)| n)
        .filter(|n| *n != id)
        .filter(|n| ctx.signals.get(*n).is_some_and(|s| s.classified))
        .collect()
}

/// Size weights for `id` after the isolation boost.
pub fn size_weights(ctx: &GenContext<'_>, id: SignalId) -> [(SizeClass, f64); 3] {
    let c = &ctx.spec.classifier;
    let base = &ctx.tables.size_weights;
    let mut small = base.small;
    let mut medium = base.medium;

    let min = c.isolation_min_neighbors;
    if min > 0 {
        let radius = ctx.world(c.isolation_radius);
        let found = classified_neighbors(ctx, id, radius).len() as u32;
        if found < min {
            let deficit = (min - found) as f64 / min as f64;
            let shift = (small * c.isolation_boost * deficit).clamp(0.0, small);
            small -= shift;
            medium += shift;
        }
    }

    [
        (SizeClass::Small, small),
        (SizeClass::Medium, medium),
        (SizeClass::Big, base.big),
    ]
}

/// Category weights for `id` at `size` after the monotony penalty.
pub fn category_weights(ctx: &GenContext<'_>, id: SignalId, size: SizeClass) -> Vec<(Category, f64)> {
    let c = &ctx.spec.classifier;
    let radius = ctx.world(c.monotony_radius);
    let neighbors: Vec<Category> = classified_neighbors(ctx, id, radius)
        .into_iter()
        .filter_map(|n| ctx.signals.category(n))
        .collect();

    ctx.tables
        .weights(size)
        .iter()
        .map(|(cat, w)| {
            if *cat == Category::Empty {
                return (*cat, *w);
            }
            let same = neighbors.iter().filter(|n| *n == cat).count() as f64;
            (*cat, w * (1.0 - c.monotony_penalty * same).max(0.0))
        })
        .collect()
}

/// Classify one signal in place.
pub fn classify_signal<R: Rng + ?Sized>(ctx: &mut GenContext<'_>, id: SignalId, rng: &mut R) {
    let size = weighted_pick(rng, &size_weights(ctx, id)).unwrap_or(SizeClass::Small);
    let category = weighted_pick(rng, &category_weights(ctx, id, size)).unwrap_or(Category::Empty);
    if let Some(signal) = ctx.signals.get_mut(id) {
        signal.size = size;
        signal.category = category;
        signal.classified = true;
    }
}

/// Classify every signal in scatter order.
pub fn classify_all(ctx: &mut GenContext<'_>) {
    let mut rng = ctx.stream("classify");
    for id in ctx.signals.ids() {
        classify_signal(ctx, id, &mut rng);
    }
    log::debug!("classified {} signals", ctx.signals.len());
}
