//! Bounded retry combinator shared by every pass that retries.
//!
//! ```
//! use riftmap_logic::retry::{Exhaustion, Retry, RetryOutcome};
//!
//! let retry = Retry::new(5, Exhaustion::Warn);
//! let outcome = retry.run(|attempt| if attempt == 2 { Some("ok") } else { None });
//! assert_eq!(outcome, RetryOutcome::Succeeded { value: "ok", attempts: 3 });
//! ```

use crate::error::GenError;

/// What happens when the budget runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// Caller logs a diagnostic and continues in a degraded state.
    Warn,
    /// The attempt is aborted with [`GenError::MandatoryExhausted`].
    Fatal,
}

/// A retry budget plus its exhaustion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    pub max_attempts: u32,
    pub on_exhausted: Exhaustion,
}

/// Raw result of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Result after the exhaustion policy has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    Done { value: T, attempts: u32 },
    GaveUp { attempts: u32 },
}

impl Retry {
    pub fn new(max_attempts: u32, on_exhausted: Exhaustion) -> Self {
        Self {
            max_attempts,
            on_exhausted,
        }
    }

    /// Call `attempt(i)` for `i` in `0..max_attempts` until it yields a value.
    pub fn run<T>(&self, mut attempt: impl FnMut(u32) -> Option<T>) -> RetryOutcome<T> {
        for i in 0..self.max_attempts {
            if let Some(value) = attempt(i) {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: i + 1,
                };
            }
        }
        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }

    /// Like [`Retry::run`], but the closure may fail hard, which stops the
    /// loop immediately.
    pub fn try_run<T, E>(
        &self,
        mut attempt: impl FnMut(u32) -> Result<Option<T>, E>,
    ) -> Result<RetryOutcome<T>, E> {
        for i in 0..self.max_attempts {
            if let Some(value) = attempt(i)? {
                return Ok(RetryOutcome::Succeeded {
                    value,
                    attempts: i + 1,
                });
            }
        }
        Ok(RetryOutcome::Exhausted {
            attempts: self.max_attempts,
        })
    }

    /// Run and apply the exhaustion policy on behalf of `pass`.
    pub fn run_settled<T>(
        &self,
        pass: &str,
        attempt: impl FnMut(u32) -> Option<T>,
    ) -> Result<Settled<T>, GenError> {
        match self.run(attempt) {
            RetryOutcome::Succeeded { value, attempts } => Ok(Settled::Done { value, attempts }),
            RetryOutcome::Exhausted { attempts } => match self.on_exhausted {
                Exhaustion::Warn => Ok(Settled::GaveUp { attempts }),
                Exhaustion::Fatal => Err(GenError::MandatoryExhausted {
                    pass: pass.to_string(),
                    attempts,
                }),
            },
        }
    }
}
