//! Rip zones: regions bounded by directed crossings of rips.

use serde::{Deserialize, Serialize};

use crate::context::GenContext;
use crate::error::DiagnosticKind;
use crate::geometry::{side_of_polyline, Point, Side};
use crate::rift::{RiftNetwork, RipId};
use crate::signal::SignalId;

/// A named region. A point is inside when it lies on the given side of
/// every listed rip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipZone {
    pub name: String,
    pub crossings: Vec<(Side, RipId)>,
    pub unlocked: bool,
}

impl RipZone {
    pub fn contains(&self, p: Point, network: &RiftNetwork) -> bool {
        !self.crossings.is_empty()
            && self.crossings.iter().all(|(side, id)| {
                network
                    .get(*id)
                    .and_then(|rip| side_of_polyline(p, &rip.samples))
                    == Some(*side)
            })
    }
}

/// Resolve the declared rip zones against the accepted rips. Definitions
/// naming a rift that was never generated are dropped.
pub fn build_rip_zones(ctx: &mut GenContext<'_>) -> Vec<RipZone> {
    let sector = ctx.spec;
    let mut zones = Vec::new();
    for def in &sector.rip_zones {
        let resolved: Option<Vec<(Side, RipId)>> = def
            .crossings
            .iter()
            .map(|c| ctx.rifts.by_request(c.rip).map(|rip| (c.side, rip.id)))
            .collect();
        match resolved {
            Some(crossings) => zones.push(RipZone {
                name: def.name.clone(),
                crossings,
                unlocked: false,
            }),
            None => ctx.diagnose(
                "rifts",
                DiagnosticKind::SoftDeviation,
                format!("rip zone {} dropped: it names a rift that was not generated", def.name),
            ),
        }
    }
    zones
}

/// Index of the first rip zone, in declaration order, containing `p`.
pub fn region_of(p: Point, zones: &[RipZone], network: &RiftNetwork) -> Option<usize> {
    zones.iter().position(|z| z.contains(p, network))
}

/// Region of every remaining signal that falls inside some rip zone.
pub fn assign_regions(ctx: &GenContext<'_>) -> Vec<(SignalId, usize)> {
    ctx.signals
        .iter()
        .filter_map(|s| region_of(s.pos, &ctx.rip_zones, &ctx.rifts).map(|r| (s.id, r)))
        .collect()
}
