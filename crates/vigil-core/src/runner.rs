use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{RunConfig, SessionMode};
use crate::error::VerifyError;
use crate::execute::{ScenarioExecutor, incomplete_outcomes};
use crate::report::{Outcome, OutcomeStatus, RunReport};
use crate::scenario::Scenario;
use crate::traits::{Session, SessionFactory};

const NOT_STARTED: &str = "run cancelled before the scenario started";

/// Events emitted by the runner for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    Started {
        run_id: Uuid,
        scenarios: usize,
        mode: SessionMode,
    },
    ScenarioStarted {
        scenario: &'a Scenario,
    },
    ScenarioFinished {
        scenario: &'a Scenario,
        outcomes: &'a [Outcome],
    },
    SessionFailed {
        scenario: Option<&'a Scenario>,
        error: &'a str,
    },
    Cancelled {
        run_id: Uuid,
    },
    Finished {
        report: &'a RunReport,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Started {
                run_id,
                scenarios,
                mode,
            } => {
                tracing::info!(%run_id, %scenarios, %mode, "Run started");
            }
            RunEvent::ScenarioStarted { scenario } => {
                tracing::debug!(scenario = %scenario.qualified_name(), target = %scenario.target, "Scenario started");
            }
            RunEvent::ScenarioFinished { scenario, outcomes } => {
                let failed = outcomes
                    .iter()
                    .filter(|o| o.status == OutcomeStatus::Failed)
                    .count();
                if failed > 0 {
                    tracing::warn!(scenario = %scenario.qualified_name(), target = %scenario.target, %failed, "Scenario has failures");
                } else {
                    tracing::info!(scenario = %scenario.qualified_name(), target = %scenario.target, checks = outcomes.len(), "Scenario finished");
                }
            }
            RunEvent::SessionFailed { scenario, error } => match scenario {
                Some(s) => tracing::error!(scenario = %s.qualified_name(), %error, "Could not open session"),
                None => tracing::error!(%error, "Could not open shared session"),
            },
            RunEvent::Cancelled { run_id } => {
                tracing::warn!(%run_id, "Run cancelled, remaining checks marked incomplete");
            }
            RunEvent::Finished { report } => {
                tracing::info!(run_id = %report.run_id, summary = %report.summary(), "Run finished");
            }
        }
    }
}

/// Runs scenarios against sessions from a factory and collects the report.
pub struct Runner<F: SessionFactory> {
    factory: F,
    config: RunConfig,
}

impl<F: SessionFactory> Runner<F> {
    pub fn new(factory: F, config: RunConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every scenario until done or `cancel` fires.
    ///
    /// Never fails: session errors and cancellation become outcomes, and
    /// outcomes collected before a cancellation are kept.
    pub async fn run<R: RunReporter>(
        &self,
        scenarios: &[Scenario],
        cancel: CancellationToken,
        reporter: &R,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let token = cancel.child_token();

        reporter.report(RunEvent::Started {
            run_id,
            scenarios: scenarios.len(),
            mode: self.config.session_mode,
        });

        let timer = self.config.run_timeout.map(|limit| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(limit) => {
                        tracing::warn!(timeout_secs = limit.as_secs(), "Run timeout reached");
                        token.cancel();
                    }
                    () = token.cancelled() => {}
                }
            })
        });

        let outcomes = match self.config.session_mode {
            SessionMode::Isolated => self.run_isolated(scenarios, &token, reporter).await,
            SessionMode::Shared => self.run_shared(scenarios, &token, reporter).await,
        };

        let cancelled = token.is_cancelled();
        if let Some(timer) = timer {
            timer.abort();
        }
        if cancelled {
            reporter.report(RunEvent::Cancelled { run_id });
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            outcomes,
        };
        reporter.report(RunEvent::Finished { report: &report });
        report
    }

    async fn run_isolated<R: RunReporter>(
        &self,
        scenarios: &[Scenario],
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Vec<Outcome> {
        stream::iter(scenarios)
            .map(|scenario| self.run_one_isolated(scenario, cancel, reporter))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn run_one_isolated<R: RunReporter>(
        &self,
        scenario: &Scenario,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Vec<Outcome> {
        if cancel.is_cancelled() {
            return incomplete_outcomes(scenario, NOT_STARTED);
        }

        let session = match self.open(cancel).await {
            Ok(session) => session,
            Err(e) if e.is_cancellation() => return incomplete_outcomes(scenario, NOT_STARTED),
            Err(e) => {
                let error = e.to_string();
                reporter.report(RunEvent::SessionFailed {
                    scenario: Some(scenario),
                    error: &error,
                });
                return session_failed(scenario, &error);
            }
        };

        let outcomes = self.execute(&session, scenario, cancel, reporter).await;
        session.close().await;
        outcomes
    }

    /// One session, one scenario at a time: no interleaving on the session.
    async fn run_shared<R: RunReporter>(
        &self,
        scenarios: &[Scenario],
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Vec<Outcome> {
        let session = match self.open(cancel).await {
            Ok(session) => session,
            Err(e) if e.is_cancellation() => {
                return scenarios
                    .iter()
                    .flat_map(|s| incomplete_outcomes(s, NOT_STARTED))
                    .collect();
            }
            Err(e) => {
                let error = e.to_string();
                reporter.report(RunEvent::SessionFailed {
                    scenario: None,
                    error: &error,
                });
                return scenarios
                    .iter()
                    .flat_map(|s| session_failed(s, &error))
                    .collect();
            }
        };

        let mut outcomes = Vec::new();
        for scenario in scenarios {
            if cancel.is_cancelled() {
                outcomes.extend(incomplete_outcomes(scenario, NOT_STARTED));
                continue;
            }
            outcomes.extend(self.execute(&session, scenario, cancel, reporter).await);
        }
        session.close().await;
        outcomes
    }

    async fn execute<R: RunReporter>(
        &self,
        session: &F::Session,
        scenario: &Scenario,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Vec<Outcome> {
        reporter.report(RunEvent::ScenarioStarted { scenario });
        let outcomes = ScenarioExecutor::new(session, &self.config, cancel)
            .run(scenario)
            .await;
        reporter.report(RunEvent::ScenarioFinished {
            scenario,
            outcomes: &outcomes,
        });
        outcomes
    }

    async fn open(&self, cancel: &CancellationToken) -> Result<F::Session, VerifyError> {
        let budget = self.config.navigation_timeout;
        tokio::select! {
            result = tokio::time::timeout(budget, self.factory.open()) => match result {
                Ok(inner) => inner,
                Err(_) => Err(VerifyError::Timeout {
                    what: "session open".into(),
                    millis: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                }),
            },
            () = cancel.cancelled() => Err(VerifyError::Cancelled),
        }
    }
}

/// Every check of a scenario fails when no session could be opened for it.
fn session_failed(scenario: &Scenario, error: &str) -> Vec<Outcome> {
    scenario
        .checks()
        .map(|check| {
            Outcome::new(
                scenario,
                &check.label,
                OutcomeStatus::Failed,
                format!("session unavailable: {error}"),
            )
        })
        .collect()
}
