//! Idempotent stack deployer
//!
//! Create first, fall back to update when the stack exists, and treat a
//! "nothing to change" update as success. Operators re-run failed deploys, so
//! neither condition may surface as an error. Everything else is fatal and is
//! never retried here.

use std::time::Duration;

use crate::error::{HoistError, HoistResult};
use crate::poll::{poll_until, PollError, PollStatus, Sleeper};
use crate::provider::{ProviderError, StackProvider, StackState};
use crate::stack::{DeployOutcome, StackDefinition};

/// Interval between terminal-state checks while waiting on a stack
const WAIT_INTERVAL: Duration = Duration::from_secs(10);

/// Wait ceiling of 30 minutes, expressed in attempts
const WAIT_ATTEMPTS: u32 = 180;

/// Deploys stack definitions against one [`StackProvider`]
pub struct Deployer<'a> {
    provider: &'a dyn StackProvider,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Deployer<'a> {
    pub fn new(provider: &'a dyn StackProvider, sleeper: &'a dyn Sleeper) -> Self {
        Self { provider, sleeper }
    }

    /// Ensure the stack described by `definition` exists in the desired state.
    ///
    /// With `await_completion`, blocks until the stack settles, up to the wait
    /// ceiling; a `NoopNoUpdates` outcome never waits since no operation was
    /// started.
    pub fn deploy(
        &self,
        definition: &StackDefinition,
        await_completion: bool,
    ) -> HoistResult<DeployOutcome> {
        let outcome = self.submit(definition)?;

        if await_completion && !outcome.is_noop() {
            self.await_settled(&definition.name)?;
        }

        Ok(outcome)
    }

    fn submit(&self, definition: &StackDefinition) -> HoistResult<DeployOutcome> {
        match self.provider.create_stack(definition) {
            Ok(()) => Ok(DeployOutcome::Created),
            Err(ProviderError::StackAlreadyExists) => match self.provider.update_stack(definition) {
                Ok(()) => Ok(DeployOutcome::Updated),
                Err(ProviderError::NoChangesToApply) => Ok(DeployOutcome::NoopNoUpdates),
                Err(e) => Err(self.fatal(&definition.name, e)),
            },
            // Create never reports NoChangesToApply; classify defensively anyway
            Err(ProviderError::NoChangesToApply) => Ok(DeployOutcome::NoopNoUpdates),
            Err(e) => Err(self.fatal(&definition.name, e)),
        }
    }

    fn await_settled(&self, name: &str) -> HoistResult<()> {
        let result = poll_until(
            |_attempt| match self.provider.stack_state(name) {
                Ok(StackState::Settled) => PollStatus::Ready(()),
                Ok(StackState::InProgress) => PollStatus::Pending,
                Ok(StackState::Failed(status)) => {
                    PollStatus::Failed(format!("stack entered {status}"))
                }
                Err(e) => PollStatus::Failed(e.to_string()),
            },
            WAIT_INTERVAL,
            WAIT_ATTEMPTS,
            self.sleeper,
        );

        match result {
            Ok(()) => Ok(()),
            Err(PollError::TimedOut { .. }) => Err(HoistError::WaitTimeout {
                stack: name.to_string(),
            }),
            Err(PollError::Failed { reason }) => Err(HoistError::StackOperationFailed {
                stack: name.to_string(),
                message: reason,
            }),
        }
    }

    fn fatal(&self, stack: &str, error: ProviderError) -> HoistError {
        HoistError::StackOperationFailed {
            stack: stack.to_string(),
            message: error.to_string(),
        }
    }
}
