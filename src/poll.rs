//! Bounded retry-with-sleep loop awaiting an eventually-true condition.

use std::{thread, time::Duration};

use tracing::{debug, warn};

use crate::error::{AssertionError, StepError};

/// Successful poll: which interval boundary the condition held at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollOutcome {
    /// Nominal elapsed time of the successful attempt (`0, I, 2I, …`).
    pub elapsed: Duration,

    /// 1-based count of attempts performed.
    pub attempts: usize,
}

/// Runs `attempt` at the nominal schedule `0, I, 2I, … ≤ timeout`, sleeping
/// `interval` between attempts via `sleep`.
///
/// The first attempt runs immediately; the loop never sleeps after the last
/// one, so `timeout = 10, interval = 2` yields exactly 6 attempts. Success
/// reports the boundary the condition held at. Assertion failures are
/// retried; a transport failure aborts the poll at once, since retrying an
/// unreachable collaborator only hides the real problem.
///
/// # Errors
///
/// The last assertion failure once the budget is exhausted, or the first
/// transport failure.
pub fn poll_with<S, F>(
    timeout: Duration,
    interval: Duration,
    mut sleep: S,
    mut attempt: F,
) -> Result<PollOutcome, StepError>
where
    S: FnMut(Duration),
    F: FnMut() -> Result<(), StepError>,
{
    if interval.is_zero() {
        return Err(AssertionError::new(
            "polling interval must be positive",
        )
        .into());
    }

    let mut elapsed = Duration::ZERO;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt() {
            Ok(()) => {
                debug!(
                    "condition held after {} ({attempts} attempt(s))",
                    humantime::format_duration(elapsed),
                );
                return Ok(PollOutcome { elapsed, attempts });
            }
            Err(e @ StepError::Transport(_)) => return Err(e),
            Err(e) => {
                if elapsed >= timeout {
                    warn!(
                        "condition still failing after {} \
                         ({attempts} attempt(s)): {e}",
                        humantime::format_duration(elapsed),
                    );
                    return Err(e);
                }
                debug!(
                    "attempt {attempts} failed ({e}), retrying in {}",
                    humantime::format_duration(interval),
                );
                sleep(interval);
                elapsed += interval;
            }
        }
    }
}

/// [`poll_with`] sleeping on the current thread.
///
/// Steps are strictly sequential within a scenario, so blocking the worker
/// thread is the intended behavior.
///
/// # Errors
///
/// See [`poll_with`].
pub fn poll<F>(
    timeout: Duration,
    interval: Duration,
    attempt: F,
) -> Result<PollOutcome, StepError>
where
    F: FnMut() -> Result<(), StepError>,
{
    poll_with(timeout, interval, thread::sleep, attempt)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::error::TransportError;

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    fn fail() -> StepError {
        AssertionError::new("not yet").into()
    }

    #[test]
    fn exhausted_budget_performs_expected_attempts() {
        let slept = Cell::new(Duration::ZERO);
        let tries = Cell::new(0);
        let err = poll_with(
            10 * SECOND,
            2 * SECOND,
            |d| slept.set(slept.get() + d),
            || {
                tries.set(tries.get() + 1);
                Err(fail())
            },
        )
        .unwrap_err();

        // ⌈10/2⌉ + 1 checks at elapsed 0, 2, 4, 6, 8, 10.
        assert_eq!(tries.get(), 6);
        assert_eq!(slept.get(), 10 * SECOND);
        assert!(matches!(err, StepError::Assertion(_)));
    }

    #[test]
    fn success_reports_the_interval_boundary() {
        let tries = Cell::new(0);
        let outcome = poll_with(
            10 * SECOND,
            2 * SECOND,
            |_| (),
            || {
                tries.set(tries.get() + 1);
                // Condition becomes true at elapsed time 5, observed by the
                // check at elapsed 6 (the fourth attempt).
                if tries.get() >= 4 {
                    Ok(())
                } else {
                    Err(fail())
                }
            },
        )
        .unwrap();

        assert_eq!(outcome.elapsed, 6 * SECOND);
        assert_eq!(outcome.attempts, 4);
    }

    #[test]
    fn immediate_success_never_sleeps() {
        let slept = Cell::new(0);
        let outcome = poll_with(
            10 * SECOND,
            2 * SECOND,
            |_| slept.set(slept.get() + 1),
            || Ok(()),
        )
        .unwrap();
        assert_eq!(slept.get(), 0);
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn transport_error_aborts_without_retry() {
        let tries = Cell::new(0);
        let err = poll_with(10 * SECOND, 2 * SECOND, |_| (), || {
            tries.set(tries.get() + 1);
            Err(TransportError::http("refused").into())
        })
        .unwrap_err();
        assert_eq!(tries.get(), 1);
        assert!(matches!(err, StepError::Transport(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(poll_with(SECOND, Duration::ZERO, |_| (), || Ok(())).is_err());
    }

    #[test]
    fn uneven_interval_overshoots_to_the_next_boundary() {
        let tries = Cell::new(0);
        let err = poll_with(5 * SECOND, 2 * SECOND, |_| (), || {
            tries.set(tries.get() + 1);
            Err(fail())
        })
        .unwrap_err();
        // Checks at 0, 2, 4, 6; the check at 6 sees elapsed past the
        // timeout and stops.
        assert_eq!(tries.get(), 4);
        assert!(matches!(err, StepError::Assertion(_)));
    }
}
