//! The generation context threaded through every pass.
//!
//! Holds all mutable state of one generation attempt. Nothing outlives it
//! except the [`crate::generate::Sector`] built from it at the end.

use crate::balance::ZoneBalance;
use crate::config::{ResolvedTables, SectorSpec};
use crate::error::{Diagnostic, DiagnosticKind, GenError};
use crate::loops::LoopOutcome;
use crate::rift::RiftNetwork;
use crate::rng::{RngFactory, SectorRng};
use crate::signal::{Signal, SignalId, SignalStore};
use crate::topology::RipZone;
use crate::zone::Zone;

pub struct GenContext<'a> {
    pub spec: &'a SectorSpec,
    pub tables: &'a ResolvedTables,
    pub rngs: RngFactory,
    pub signals: SignalStore,
    pub zones: Vec<Zone>,
    pub rifts: RiftNetwork,
    pub rip_zones: Vec<RipZone>,
    pub balance: Vec<ZoneBalance>,
    pub loop_outcome: Option<LoopOutcome>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> GenContext<'a> {
    pub fn new(spec: &'a SectorSpec, tables: &'a ResolvedTables, seed: u64, attempt: u32) -> Self {
        Self {
            spec,
            tables,
            rngs: RngFactory::new(seed, attempt),
            signals: SignalStore::new(),
            zones: Vec::new(),
            rifts: RiftNetwork::default(),
            rip_zones: Vec::new(),
            balance: Vec::new(),
            loop_outcome: None,
            diagnostics: Vec::new(),
        }
    }

    /// Random stream for a named task.
    pub fn stream(&self, task: &str) -> SectorRng {
        self.rngs.stream(task)
    }

    /// Spec units to world units.
    pub fn world(&self, units: f64) -> f64 {
        self.spec.scale.world(units)
    }

    /// Record and log a non-fatal event.
    pub fn diagnose(&mut self, pass: &str, kind: DiagnosticKind, message: String) {
        log::warn!("[{}] {}", pass, message);
        self.diagnostics.push(Diagnostic {
            pass: pass.to_string(),
            kind,
            message,
        });
    }

    /// Build the rejection error for this attempt. Passes return it with `?`
    /// or `Err(..)` so the attempt loop can restart.
    pub fn reject(&self, pass: &str, reason: impl Into<String>) -> GenError {
        let reason = reason.into();
        log::info!(
            "attempt {} rejected by {}: {}",
            self.rngs.attempt(),
            pass,
            reason
        );
        GenError::Rejected {
            pass: pass.to_string(),
            reason,
        }
    }

    /// Remove a signal from the map and from its zone.
    pub fn remove_signal(&mut self, id: SignalId) -> Option<Signal> {
        let signal = self.signals.remove(id)?;
        if let Some(zone) = self.zones.get_mut(signal.zone.index()) {
            zone.signals.retain(|s| *s != id);
        }
        Some(signal)
    }

    /// Number of planet-family signals in a zone.
    pub fn planet_count(&self, zone: usize) -> usize {
        self.zones[zone]
            .signals
            .iter()
            .filter_map(|id| self.signals.get(*id))
            .filter(|s| self.tables.is_planet(s.category))
            .count()
    }
}
