//! Refinement pipeline.
//!
//! A refinement is a named, prioritized pass over the whole generation
//! state. The pipeline only orders and applies them: lowest priority first,
//! ties in insertion order, each exactly once.

use crate::context::GenContext;
use crate::error::GenError;

/// A mutation pass applied once to the full generated state.
pub trait Refinement {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError>;
}

#[derive(Default)]
pub struct Pipeline {
    refinements: Vec<Box<dyn Refinement>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, refinement: impl Refinement + 'static) -> Self {
        self.add(Box::new(refinement));
        self
    }

    pub fn add(&mut self, refinement: Box<dyn Refinement>) {
        self.refinements.push(refinement);
    }

    /// Names in application order.
    pub fn order(&self) -> Vec<&str> {
        self.sorted().into_iter().map(|r| r.name()).collect()
    }

    fn sorted(&self) -> Vec<&dyn Refinement> {
        let mut v: Vec<&dyn Refinement> = self.refinements.iter().map(|r| r.as_ref()).collect();
        // sort_by_key is stable: equal priorities keep insertion order
        v.sort_by_key(|r| r.priority());
        v
    }

    /// Apply every refinement in order. The first error stops the run.
    pub fn run(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        for r in self.sorted() {
            log::debug!("refinement {} (priority {})", r.name(), r.priority());
            let before = ctx.signals.len();
            r.apply(ctx)?;
            let after = ctx.signals.len();
            if after != before {
                log::debug!("refinement {} removed {} signals", r.name(), before - after);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.refinements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refinements.is_empty()
    }
}

/// The standard sector pipeline.
pub fn default_pipeline() -> Pipeline {
    Pipeline::new()
        .with(crate::rift::RiftGeneration)
        .with(crate::counts::ZoneCountCorrection)
        .with(crate::structures::RequiredStructures)
        .with(crate::structures::StartZoneCheck)
        .with(crate::balance::LinkBalance)
        .with(crate::loops::LoopGuarantee)
        .with(crate::quirks::QuirkAssignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectorSpec;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        priority: i32,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl Refinement for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                return Err(ctx.reject(self.name, "test"));
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        priority: i32,
        log: &Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    ) -> Recorder {
        Recorder {
            name,
            priority,
            log: Rc::clone(log),
            fail,
        }
    }

    #[test]
    fn test_runs_in_priority_then_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(recorder("late", 50, &log, false))
            .with(recorder("first_tie", 10, &log, false))
            .with(recorder("second_tie", 10, &log, false))
            .with(recorder("early", -5, &log, false));
        assert_eq!(pipeline.order(), vec!["early", "first_tie", "second_tie", "late"]);

        let spec = SectorSpec::default();
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        pipeline.run(&mut ctx).unwrap();
        assert_eq!(*log.borrow(), vec!["early", "first_tie", "second_tie", "late"]);
    }

    #[test]
    fn test_error_stops_pipeline() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with(recorder("a", 1, &log, false))
            .with(recorder("b", 2, &log, true))
            .with(recorder("c", 3, &log, false));

        let spec = SectorSpec::default();
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 1, 0);
        let err = pipeline.run(&mut ctx).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_default_pipeline_order() {
        assert_eq!(
            default_pipeline().order(),
            vec![
                "rifts",
                "zone_counts",
                "required_structures",
                "start_zone_check",
                "link_balance",
                "loop_guarantee",
                "quirks"
            ]
        );
    }
}
