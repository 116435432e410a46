//! Fixed-interval polling of a remote resource
//!
//! One state machine shared by every wait in the workflow: stack terminal
//! states, certificate ARN appearance, and certificate validation. Pending is
//! the initial state; Ready, Failed and TimedOut are terminal.
//!
//! Convention: the check runs up to `max_attempts` times with a sleep between
//! attempts and no trailing sleep, so exhaustion costs `max_attempts - 1`
//! sleeps.

use std::time::Duration;

/// One observation of the polled resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Terminal: the resource settled with a value
    Ready(T),
    /// Still waiting; sleep and retry
    Pending,
    /// Terminal: the resource failed, abort without consuming the budget
    Failed(String),
}

/// Why a poll did not produce a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    TimedOut { attempts: u32 },
    Failed { reason: String },
}

/// Sleep seam so tests never wait on the clock
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper; the workflow is a single blocking thread
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Poll `check` every `interval` until it reports Ready or Failed, or the
/// attempt budget runs out.
pub fn poll_until<T, F>(
    mut check: F,
    interval: Duration,
    max_attempts: u32,
    sleeper: &dyn Sleeper,
) -> Result<T, PollError>
where
    F: FnMut(u32) -> PollStatus<T>,
{
    for attempt in 1..=max_attempts {
        match check(attempt) {
            PollStatus::Ready(value) => return Ok(value),
            PollStatus::Failed(reason) => return Err(PollError::Failed { reason }),
            PollStatus::Pending => {
                if attempt < max_attempts {
                    sleeper.sleep(interval);
                }
            }
        }
    }
    Err(PollError::TimedOut {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Counts sleeps instead of sleeping
    pub struct RecordingSleeper {
        count: Cell<u32>,
    }

    impl RecordingSleeper {
        pub fn new() -> Self {
            Self { count: Cell::new(0) }
        }

        pub fn sleeps(&self) -> u32 {
            self.count.get()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, _duration: Duration) {
            self.count.set(self.count.get() + 1);
        }
    }

    const INTERVAL: Duration = Duration::from_secs(60);

    #[test]
    fn test_ready_on_first_check_never_sleeps() {
        let sleeper = RecordingSleeper::new();
        let result = poll_until(|_| PollStatus::Ready(42), INTERVAL, 30, &sleeper);
        assert_eq!(result, Ok(42));
        assert_eq!(sleeper.sleeps(), 0);
    }

    #[test]
    fn test_ready_mid_budget_stops_polling() {
        let sleeper = RecordingSleeper::new();
        let mut checks = 0;
        let result = poll_until(
            |attempt| {
                checks += 1;
                if attempt == 3 {
                    PollStatus::Ready("arn")
                } else {
                    PollStatus::Pending
                }
            },
            INTERVAL,
            30,
            &sleeper,
        );
        assert_eq!(result, Ok("arn"));
        assert_eq!(checks, 3);
        // Two pending observations, one sleep after each
        assert_eq!(sleeper.sleeps(), 2);
    }

    #[test]
    fn test_timeout_after_exact_attempts_no_trailing_sleep() {
        let sleeper = RecordingSleeper::new();
        let mut checks = 0u32;
        let result: Result<(), _> = poll_until(
            |_| {
                checks += 1;
                PollStatus::Pending
            },
            INTERVAL,
            5,
            &sleeper,
        );
        assert_eq!(result, Err(PollError::TimedOut { attempts: 5 }));
        assert_eq!(checks, 5);
        assert_eq!(sleeper.sleeps(), 4);
    }

    #[test]
    fn test_failed_aborts_immediately() {
        let sleeper = RecordingSleeper::new();
        let mut checks = 0u32;
        let result: Result<(), _> = poll_until(
            |attempt| {
                checks += 1;
                if attempt == 2 {
                    PollStatus::Failed("certificate failed with status FAILED".to_string())
                } else {
                    PollStatus::Pending
                }
            },
            INTERVAL,
            30,
            &sleeper,
        );
        assert_eq!(
            result,
            Err(PollError::Failed {
                reason: "certificate failed with status FAILED".to_string()
            })
        );
        assert_eq!(checks, 2);
        assert_eq!(sleeper.sleeps(), 1);
    }

    #[test]
    fn test_issued_on_attempt_thirty() {
        // 29 pending observations, then ready on the final attempt of the budget
        let sleeper = RecordingSleeper::new();
        let result = poll_until(
            |attempt| {
                if attempt == 30 {
                    PollStatus::Ready("arn:aws:acm:us-east-1:123:certificate/abc")
                } else {
                    PollStatus::Pending
                }
            },
            INTERVAL,
            30,
            &sleeper,
        );
        assert_eq!(result, Ok("arn:aws:acm:us-east-1:123:certificate/abc"));
        assert_eq!(sleeper.sleeps(), 29);
    }
}
