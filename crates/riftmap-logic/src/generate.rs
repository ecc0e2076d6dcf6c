//! The attempt loop and the finished sector.
//!
//! An attempt is scatter, classify, then the refinement pipeline, all inside
//! a fresh [`GenContext`]. A rejection discards the attempt and starts the
//! next one; every random stream is reseeded from the attempt number, so
//! attempt `n` of a seed is always the same map.

use serde::{Deserialize, Serialize};

use crate::balance::ZoneBalance;
use crate::category::Category;
use crate::classify::classify_all;
use crate::config::{ResolvedTables, SectorSpec};
use crate::context::GenContext;
use crate::error::{Diagnostic, GenError};
use crate::loops::LoopOutcome;
use crate::pipeline::{default_pipeline, Pipeline};
use crate::rift::{Joint, Rip};
use crate::signal::{Signal, SignalId};
use crate::topology::{assign_regions, RipZone};
use crate::zone::{scatter, Zone};

/// A finished sector map, ready to hand to the game-rule layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub seed: u64,
    /// Index of the attempt that produced this map.
    pub attempt: u32,
    pub zones: Vec<Zone>,
    /// Every remaining signal, in id order.
    pub signals: Vec<Signal>,
    pub rips: Vec<Rip>,
    pub joints: Vec<Joint>,
    pub rip_zones: Vec<RipZone>,
    /// Signal to rip-zone index, for signals inside some rip zone.
    pub regions: Vec<(SignalId, usize)>,
    pub balance: Vec<ZoneBalance>,
    pub loop_outcome: Option<LoopOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    /// Tag of every category present on the map.
    pub tags: Vec<(Category, String)>,
}

impl Sector {
    fn from_context(ctx: GenContext<'_>) -> Self {
        let regions = assign_regions(&ctx);
        let signals = ctx.signals.snapshot();
        let mut present: Vec<Category> = signals.iter().map(|s| s.category).collect();
        present.sort();
        present.dedup();
        let tags = present
            .into_iter()
            .map(|c| (c, ctx.tables.catalog.tag(c)))
            .collect();

        Sector {
            seed: ctx.rngs.seed(),
            attempt: ctx.rngs.attempt(),
            zones: ctx.zones,
            signals,
            rips: ctx.rifts.rips,
            joints: ctx.rifts.joints,
            rip_zones: ctx.rip_zones,
            regions,
            balance: ctx.balance,
            loop_outcome: ctx.loop_outcome,
            diagnostics: ctx.diagnostics,
            tags,
        }
    }

    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.signals[i])
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Validate `spec` and generate the sector for `seed` with the standard
/// pipeline.
pub fn generate(spec: &SectorSpec, seed: u64) -> Result<Sector, GenError> {
    let tables = spec.resolve()?;
    generate_with(spec, &tables, seed, &default_pipeline())
}

/// Attempt loop over an explicit pipeline.
pub fn generate_with(
    spec: &SectorSpec,
    tables: &ResolvedTables,
    seed: u64,
    pipeline: &Pipeline,
) -> Result<Sector, GenError> {
    for attempt in 0..spec.max_attempts {
        log::info!("sector seed {} attempt {}", seed, attempt);
        match run_attempt(spec, tables, seed, attempt, pipeline) {
            Ok(sector) => {
                log::info!(
                    "sector seed {} done on attempt {}: {} signals, {} rips, {} diagnostics",
                    seed,
                    attempt,
                    sector.signals.len(),
                    sector.rips.len(),
                    sector.diagnostics.len()
                );
                return Ok(sector);
            }
            Err(e) if e.is_rejection() => continue,
            Err(e) => return Err(e),
        }
    }
    Err(GenError::AttemptsExhausted {
        attempts: spec.max_attempts,
    })
}

/// One attempt, with no restart on rejection.
pub fn run_attempt(
    spec: &SectorSpec,
    tables: &ResolvedTables,
    seed: u64,
    attempt: u32,
    pipeline: &Pipeline,
) -> Result<Sector, GenError> {
    let mut ctx = GenContext::new(spec, tables, seed, attempt);
    scatter(&mut ctx);
    classify_all(&mut ctx);
    pipeline.run(&mut ctx)?;
    Ok(Sector::from_context(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::pipeline::Refinement;

    struct AlwaysReject;

    impl Refinement for AlwaysReject {
        fn name(&self) -> &str {
            "always_reject"
        }

        fn priority(&self) -> i32 {
            0
        }

        fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
            Err(ctx.reject(self.name(), "never good enough"))
        }
    }

    struct RejectFirst;

    impl Refinement for RejectFirst {
        fn name(&self) -> &str {
            "reject_first"
        }

        fn priority(&self) -> i32 {
            0
        }

        fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
            if ctx.rngs.attempt() == 0 {
                return Err(ctx.reject(self.name(), "first attempt"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_generate_default_spec() {
        let sector = generate(&SectorSpec::default(), 1).unwrap();
        assert!(!sector.signals.is_empty());
        assert_eq!(sector.zones.len(), 3);
        assert!(sector.loop_outcome.is_some());
        assert_eq!(sector.balance.len(), 3);
    }

    #[test]
    fn test_rejection_moves_to_next_attempt() {
        let spec = SectorSpec::default();
        let tables = spec.resolve().unwrap();
        let sector = generate_with(&spec, &tables, 4, &Pipeline::new().with(RejectFirst)).unwrap();
        assert_eq!(sector.attempt, 1);
    }

    #[test]
    fn test_every_attempt_rejected() {
        let mut spec = SectorSpec::default();
        spec.max_attempts = 3;
        let tables = spec.resolve().unwrap();
        let err = generate_with(&spec, &tables, 4, &Pipeline::new().with(AlwaysReject)).unwrap_err();
        assert_eq!(err, GenError::AttemptsExhausted { attempts: 3 });
    }

    #[test]
    fn test_invalid_spec_is_reported() {
        let mut spec = SectorSpec::default();
        spec.rings.clear();
        match generate(&spec, 1) {
            Err(GenError::Config(errors)) => assert!(errors.contains(&ConfigError::NoRings)),
            other => panic!("expected config error, got {:?}", other.map(|s| s.seed)),
        }
    }

    #[test]
    fn test_sector_serializes() {
        let sector = generate(&SectorSpec::default(), 2).unwrap();
        let json = sector.to_json().unwrap();
        let back: Sector = serde_json::from_str(&json).unwrap();
        assert_eq!(back.signals.len(), sector.signals.len());
        assert!(json.contains("\"tags\""));
    }

    #[test]
    fn test_signal_lookup() {
        let sector = generate(&SectorSpec::default(), 3).unwrap();
        let first = &sector.signals[0];
        assert_eq!(sector.signal(first.id).map(|s| s.pos), Some(first.pos));
    }
}
