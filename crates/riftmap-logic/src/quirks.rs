//! Quirk markers from the per-category chance table.
//!
//! Signals that already carry a quirk (riftside tags from evacuation) keep
//! it. Each remaining signal rolls its category's quirks in table order and
//! takes the first that hits.

use rand::Rng;

use crate::context::GenContext;
use crate::error::GenError;
use crate::pipeline::Refinement;
use crate::signal::SignalId;

pub struct QuirkAssignment;

impl Refinement for QuirkAssignment {
    fn name(&self) -> &str {
        "quirks"
    }

    fn priority(&self) -> i32 {
        600
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        let tables = ctx.tables;
        let mut rng = ctx.stream("quirks");
        let ids: Vec<SignalId> = ctx.signals.ids();
        let mut assigned = 0usize;

        for id in ids {
            let Some(signal) = ctx.signals.get_mut(id) else {
                continue;
            };
            if signal.quirk.is_some() {
                continue;
            }
            let Some(chances) = tables.quirk_chances.get(&signal.category) else {
                continue;
            };
            for (quirk, chance) in chances {
                if rng.gen_bool(chance.clamp(0.0, 1.0)) {
                    signal.quirk = Some(quirk.clone());
                    assigned += 1;
                    break;
                }
            }
        }

        log::debug!("assigned {} quirks", assigned);
        Ok(())
    }
}
