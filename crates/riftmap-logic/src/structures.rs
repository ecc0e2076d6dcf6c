//! Mandatory structure placement and the start-zone sanity check.

use rand::Rng;

use crate::category::Category;
use crate::context::GenContext;
use crate::error::GenError;
use crate::geometry::Point;
use crate::pipeline::Refinement;
use crate::retry::{Exhaustion, Retry, Settled};
use crate::signal::SignalId;

/// Places every required unique structure. Running out of attempts for any
/// of them aborts generation.
pub struct RequiredStructures;

impl Refinement for RequiredStructures {
    fn name(&self) -> &str {
        "required_structures"
    }

    fn priority(&self) -> i32 {
        300
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        let mut rng = ctx.stream("required_structures");
        let tables = ctx.tables;
        for (category, req) in tables.required.iter() {
            let zone = req.zone;
            let lo = ctx.world(req.min_radius);
            let hi = ctx.world(req.max_radius);
            let members: Vec<SignalId> = ctx.zones[zone].signals.clone();

            let retry = Retry::new(req.attempts, Exhaustion::Fatal);
            let settled = retry.run_settled(self.name(), |_| {
                if members.is_empty() {
                    return None;
                }
                let id = members[rng.gen_range(0..members.len())];
                let s = ctx.signals.get(id)?;
                let d = s.pos.distance(Point::ORIGIN);
                let eligible = !s.locked
                    && !ctx.tables.is_planet(s.category)
                    && d >= lo
                    && d <= hi;
                eligible.then_some(id)
            })?;

            if let Settled::Done { value: id, attempts } = settled {
                place_unique(ctx, id, *category);
                log::debug!(
                    "placed {} at signal {} after {} attempts",
                    tables.catalog.tag(*category),
                    id.0,
                    attempts
                );
            }
        }
        Ok(())
    }
}

/// Lock `id` as the single signal of `category`; any other signal carrying
/// it is cleared.
fn place_unique(ctx: &mut GenContext<'_>, id: SignalId, category: Category) {
    let duplicates: Vec<SignalId> = ctx
        .signals
        .iter()
        .filter(|s| s.id != id && s.category == category)
        .map(|s| s.id)
        .collect();
    for dup in duplicates {
        ctx.signals.set_category(dup, Category::Empty);
    }
    if let Some(s) = ctx.signals.get_mut(id) {
        s.category = category;
        s.locked = true;
    }
}

/// Rejects the attempt when the origin zone is too poor to start in.
pub struct StartZoneCheck;

impl Refinement for StartZoneCheck {
    fn name(&self) -> &str {
        "start_zone_check"
    }

    fn priority(&self) -> i32 {
        350
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        let min = ctx.spec.start_zone.min_planets as usize;
        if ctx.zones.is_empty() {
            return Err(ctx.reject(self.name(), "no origin zone"));
        }
        let found = ctx.planet_count(0);
        if found < min {
            return Err(ctx.reject(
                self.name(),
                format!("origin zone has {} planets, need {}", found, min),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::StructureKind;
    use crate::config::SectorSpec;

    fn prepare(ctx: &mut GenContext<'_>) {
        crate::zone::scatter(ctx);
        crate::classify::classify_all(ctx);
    }

    #[test]
    fn test_gate_placed_once_and_locked() {
        let spec = SectorSpec::default();
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 21, 0);
        prepare(&mut ctx);
        RequiredStructures.apply(&mut ctx).unwrap();

        let gate = Category::Structure(StructureKind::Gate);
        let gates: Vec<_> = ctx.signals.iter().filter(|s| s.category == gate).collect();
        assert_eq!(gates.len(), 1);
        assert!(gates[0].locked);
        assert_eq!(gates[0].zone.index(), 2);
        let d = gates[0].pos.distance(Point::ORIGIN);
        assert!((7.0..=10.0).contains(&d));
    }

    #[test]
    fn test_impossible_band_is_fatal() {
        let mut spec = SectorSpec::default();
        spec.required_structures[0].min_radius = 50.0;
        spec.required_structures[0].max_radius = 60.0;
        spec.required_structures[0].attempts = 5;
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 2, 0);
        prepare(&mut ctx);
        let err = RequiredStructures.apply(&mut ctx).unwrap_err();
        assert_eq!(
            err,
            GenError::MandatoryExhausted {
                pass: "required_structures".into(),
                attempts: 5
            }
        );
    }

    #[test]
    fn test_start_zone_rejects_when_too_few_planets() {
        let mut spec = SectorSpec::default();
        spec.start_zone.min_planets = 1000;
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 2, 0);
        prepare(&mut ctx);
        assert!(StartZoneCheck.apply(&mut ctx).unwrap_err().is_rejection());
    }

    #[test]
    fn test_start_zone_accepts_with_no_minimum() {
        let mut spec = SectorSpec::default();
        spec.start_zone.min_planets = 0;
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 2, 0);
        prepare(&mut ctx);
        assert!(StartZoneCheck.apply(&mut ctx).is_ok());
    }
}
