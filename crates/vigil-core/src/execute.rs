//! Per-scenario execution.
//!
//! Steps run strictly in order on one session. Every check step yields
//! exactly one [`Outcome`]; actions only yield one when they fail or make
//! the rest of the scenario moot.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::RunConfig;
use crate::error::VerifyError;
use crate::invariant::{ElementInvariant, Verdict};
use crate::locator::LocatorChain;
use crate::models::{NavigationResponse, Readiness};
use crate::probe::{Absence, EvidenceRequest, Probe, ProbeResult};
use crate::report::{Outcome, OutcomeStatus};
use crate::scenario::{Action, Check, CheckSpec, NavigationPolicy, Presence, Scenario, Step};
use crate::traits::Session;
use crate::wait::WaitPolicy;

const CANCELLED: &str = "run cancelled before the check completed";

/// What an action means for the steps after it.
enum Flow {
    Proceed,
    /// The page or link is legitimately missing; dependent checks are skipped.
    Unavailable(String),
}

/// Why the remaining checks of a scenario will not run.
enum Halt {
    Blocked(String),
    Unavailable(String),
    Cancelled,
}

impl Halt {
    fn outcome(&self, scenario: &Scenario, check: &Check) -> Outcome {
        let (status, message) = match self {
            Halt::Blocked(reason) => (OutcomeStatus::Skipped, format!("blocked: {reason}")),
            Halt::Unavailable(reason) => (OutcomeStatus::Skipped, reason.clone()),
            Halt::Cancelled => (OutcomeStatus::Incomplete, CANCELLED.to_string()),
        };
        Outcome::new(scenario, &check.label, status, message)
    }
}

/// One `Incomplete` outcome per check, for scenarios that never started.
pub fn incomplete_outcomes(scenario: &Scenario, reason: &str) -> Vec<Outcome> {
    scenario
        .checks()
        .map(|check| Outcome::new(scenario, &check.label, OutcomeStatus::Incomplete, reason))
        .collect()
}

/// Drives one session through scenarios, one at a time.
pub struct ScenarioExecutor<'a, S: Session> {
    session: &'a S,
    config: &'a RunConfig,
    cancel: &'a CancellationToken,
}

impl<'a, S: Session> ScenarioExecutor<'a, S> {
    pub fn new(session: &'a S, config: &'a RunConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            session,
            config,
            cancel,
        }
    }

    /// Run every step of `scenario`. Never fails: errors become outcomes.
    pub async fn run(&self, scenario: &Scenario) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        let mut last_response: Option<NavigationResponse> = None;
        let mut halted: Option<Halt> = None;

        for step in &scenario.steps {
            if halted.is_none() && self.cancel.is_cancelled() {
                halted = Some(Halt::Cancelled);
            }
            if let Some(halt) = &halted {
                if let Step::Check(check) = step {
                    outcomes.push(halt.outcome(scenario, check));
                }
                continue;
            }

            match step {
                Step::Act(action) => match self.act(action, &mut last_response).await {
                    Ok(Flow::Proceed) => {}
                    Ok(Flow::Unavailable(reason)) => {
                        tracing::debug!(scenario = %scenario.qualified_name(), %reason, "Skipping remaining checks");
                        outcomes.push(Outcome::new(
                            scenario,
                            action.to_string(),
                            OutcomeStatus::Skipped,
                            reason.clone(),
                        ));
                        halted = Some(Halt::Unavailable(reason));
                    }
                    Err(e) if e.is_cancellation() => halted = Some(Halt::Cancelled),
                    Err(e) => {
                        tracing::debug!(scenario = %scenario.qualified_name(), %action, error = %e, "Action failed");
                        outcomes.push(Outcome::new(
                            scenario,
                            action.to_string(),
                            OutcomeStatus::Failed,
                            e.to_string(),
                        ));
                        halted = Some(Halt::Blocked(format!("{action} failed")));
                    }
                },
                Step::Check(check) => match self.check(check, last_response.as_ref()).await {
                    Ok(verdict) => {
                        tracing::trace!(check = %check.label, ?verdict, "Check evaluated");
                        outcomes.push(Outcome::from_verdict(scenario, &check.label, verdict));
                    }
                    Err(e) if e.is_cancellation() => {
                        outcomes.push(Outcome::new(
                            scenario,
                            &check.label,
                            OutcomeStatus::Incomplete,
                            CANCELLED,
                        ));
                        halted = Some(Halt::Cancelled);
                    }
                    Err(e) => {
                        outcomes.push(Outcome::new(
                            scenario,
                            &check.label,
                            OutcomeStatus::Failed,
                            e.to_string(),
                        ));
                    }
                },
            }
        }

        outcomes
    }

    async fn act(
        &self,
        action: &Action,
        last_response: &mut Option<NavigationResponse>,
    ) -> Result<Flow, VerifyError> {
        let budget = self.config.navigation_timeout;
        match action {
            Action::Navigate { path, policy } => {
                let url = self.config.resolve(path)?;
                self.navigate(path, &url, *policy, last_response).await
            }
            Action::GoBack => {
                self.guard("navigation back", budget, self.session.go_back())
                    .await?;
                Ok(Flow::Proceed)
            }
            Action::GoForward => {
                self.guard("navigation forward", budget, self.session.go_forward())
                    .await?;
                Ok(Flow::Proceed)
            }
            Action::Reload => {
                self.guard("navigation reload", budget, self.session.reload())
                    .await?;
                Ok(Flow::Proceed)
            }
            Action::AwaitSelector { selector, timeout } => {
                let timeout = timeout.unwrap_or(self.config.wait.timeout);
                let readiness = self
                    .guard(
                        format!("wait for {selector}"),
                        timeout.saturating_add(budget),
                        self.session.wait_for(selector, timeout),
                    )
                    .await?;
                match readiness {
                    Readiness::Ready => Ok(Flow::Proceed),
                    Readiness::TimedOut => Err(VerifyError::Timeout {
                        what: format!("wait for {selector}"),
                        millis: millis(timeout),
                    }),
                }
            }
            Action::FollowLink { chain } => {
                let probe = Probe::new(self.session, self.config.wait, self.cancel);
                let found = match probe.run(chain, &EvidenceRequest::attribute("href")).await? {
                    ProbeResult::Found(found) => found,
                    ProbeResult::Absent(absence) => {
                        return Ok(Flow::Unavailable(format!(
                            "link {chain} {}",
                            absence.describe()
                        )));
                    }
                };
                let href = found
                    .attribute("href")
                    .filter(|h| !h.trim().is_empty())
                    .ok_or_else(|| {
                        VerifyError::Session(format!("link {} has no href", found.locator))
                    })?;

                let current = self
                    .guard("current url", budget, self.session.current_url())
                    .await?;
                let url = Url::parse(&current)
                    .and_then(|base| base.join(href))
                    .map(String::from)
                    .map_err(|e| VerifyError::Navigation {
                        url: href.to_string(),
                        message: e.to_string(),
                    })?;
                self.navigate(href, &url, NavigationPolicy::Require, last_response)
                    .await
            }
        }
    }

    async fn navigate(
        &self,
        label: &str,
        url: &str,
        policy: NavigationPolicy,
        last_response: &mut Option<NavigationResponse>,
    ) -> Result<Flow, VerifyError> {
        let response = self
            .guard(
                format!("navigation to {label}"),
                self.config.navigation_timeout,
                self.session.navigate(url),
            )
            .await?;
        let ok = response.is_ok();
        let status = response.status_text();
        *last_response = Some(response);

        match policy {
            NavigationPolicy::AcceptAnyStatus => Ok(Flow::Proceed),
            _ if ok => Ok(Flow::Proceed),
            NavigationPolicy::Require => Err(VerifyError::Navigation {
                url: url.to_string(),
                message: status,
            }),
            NavigationPolicy::SkipIfUnavailable => Ok(Flow::Unavailable(format!(
                "{label} not available ({status})"
            ))),
        }
    }

    async fn check(
        &self,
        check: &Check,
        last_response: Option<&NavigationResponse>,
    ) -> Result<Verdict, VerifyError> {
        match &check.spec {
            CheckSpec::Element {
                chain,
                presence,
                invariant,
            } => {
                let policy = if invariant.waits_for_presence() {
                    self.config.wait
                } else {
                    WaitPolicy::immediate()
                };
                let probe = Probe::new(self.session, policy, self.cancel);
                let evidence = invariant.evidence();
                let result = self
                    .guard(
                        format!("probe {chain}"),
                        policy.timeout.saturating_add(self.config.navigation_timeout),
                        probe.run(chain, &evidence),
                    )
                    .await?;

                Ok(match result {
                    ProbeResult::Found(probed) => invariant.evaluate(&probed),
                    ProbeResult::Absent(absence) => {
                        absent_verdict(chain, *presence, invariant, absence)
                    }
                })
            }
            CheckSpec::Location(invariant) => {
                let url = self
                    .guard(
                        "current url",
                        self.config.navigation_timeout,
                        self.session.current_url(),
                    )
                    .await?;
                Ok(invariant.evaluate(&url))
            }
            CheckSpec::Response(invariant) => Ok(match last_response {
                Some(response) => invariant.evaluate(response),
                None => Verdict::Inconclusive("no navigation response recorded".to_string()),
            }),
        }
    }

    /// Bound a session call by `budget` and the run's cancellation token.
    async fn guard<T>(
        &self,
        what: impl Into<String>,
        budget: Duration,
        fut: impl Future<Output = Result<T, VerifyError>>,
    ) -> Result<T, VerifyError> {
        tokio::select! {
            result = tokio::time::timeout(budget, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(VerifyError::Timeout {
                    what: what.into(),
                    millis: millis(budget),
                }),
            },
            () = self.cancel.cancelled() => Err(VerifyError::Cancelled),
        }
    }
}

/// Required checks fail on absence unless the invariant judges it (counts);
/// optional checks are skipped unless absence already satisfies them.
fn absent_verdict(
    chain: &LocatorChain,
    presence: Presence,
    invariant: &ElementInvariant,
    absence: Absence,
) -> Verdict {
    match presence {
        Presence::Required if invariant.evaluates_absence() => invariant.evaluate_absent(),
        Presence::Required => Verdict::Fail(format!("{chain} {}", absence.describe())),
        Presence::Optional => match invariant.evaluate_absent() {
            pass @ Verdict::Pass(_) => pass,
            _ => Verdict::Inconclusive(format!("absent: {chain} {}", absence.describe())),
        },
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
