//! Explicit bounded waiting for asynchronously rendered content.
//!
//! Replaces ambient implicit waits: every wait has a budget, observes the
//! run's cancellation token, and ends in one of three states.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::VerifyError;
use crate::locator::LocatorChain;
use crate::traits::Session;

/// Stand-in deadline for budgets too large to add to an instant.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Budget for one bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Look exactly once, without waiting.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Default for WaitPolicy {
    /// 5 second budget polled every 100 ms.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Tri-state result of a bounded wait.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<E> {
    /// `locator` is the index in the chain of the strategy that matched.
    Found { locator: usize, matches: Vec<E> },
    /// Nothing matched on the single look of an immediate wait.
    Absent,
    /// Nothing matched within the whole budget.
    TimedOut(Duration),
}

/// One pass over the chain: the first locator with at least one
/// (text-filtered) match wins.
pub async fn sweep<S: Session>(
    session: &S,
    chain: &LocatorChain,
) -> Result<Option<(usize, Vec<S::Element>)>, VerifyError> {
    for (index, locator) in chain.iter().enumerate() {
        let candidates = session.locate(&locator.selector).await?;
        let matches = match &locator.text {
            None => candidates,
            Some(filter) => {
                let mut kept = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    if filter.accepts(&session.text(&candidate).await?) {
                        kept.push(candidate);
                    }
                }
                kept
            }
        };
        if !matches.is_empty() {
            return Ok(Some((index, matches)));
        }
    }
    Ok(None)
}

/// Poll the chain until something matches, the budget runs out, or the run
/// is cancelled.
pub async fn bounded_wait<S: Session>(
    session: &S,
    chain: &LocatorChain,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<WaitOutcome<S::Element>, VerifyError> {
    let start = Instant::now();
    let deadline = start.checked_add(policy.timeout).unwrap_or(start + FAR_FUTURE);

    loop {
        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let found = if policy.timeout.is_zero() {
            tokio::select! {
                r = sweep(session, chain) => r?,
                () = cancel.cancelled() => return Err(VerifyError::Cancelled),
            }
        } else {
            tokio::select! {
                r = tokio::time::timeout(remaining, sweep(session, chain)) => match r {
                    Ok(inner) => inner?,
                    Err(_) => {
                        tracing::debug!(chain = %chain, "Sweep exceeded wait budget");
                        return Ok(WaitOutcome::TimedOut(policy.timeout));
                    }
                },
                () = cancel.cancelled() => return Err(VerifyError::Cancelled),
            }
        };

        if let Some((locator, matches)) = found {
            if locator > 0 {
                tracing::debug!(chain = %chain, locator, "Matched fallback locator");
            }
            return Ok(WaitOutcome::Found { locator, matches });
        }

        if policy.timeout.is_zero() {
            return Ok(WaitOutcome::Absent);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome::TimedOut(policy.timeout));
        }
        let nap = policy.poll_interval.min(deadline - now);
        tokio::select! {
            () = tokio::time::sleep(nap) => {}
            () = cancel.cancelled() => return Err(VerifyError::Cancelled),
        }
    }
}
