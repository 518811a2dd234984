use std::fmt;
use std::time::Duration;

use crate::invariant::{ElementInvariant, LocationInvariant, ResponseInvariant};
use crate::locator::LocatorChain;
use crate::models::Target;

/// How a navigation's HTTP status affects the rest of the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPolicy {
    /// A non-ok status fails the step and blocks the remaining checks.
    #[default]
    Require,
    /// A non-ok status skips the remaining checks (page not shipped).
    SkipIfUnavailable,
    /// Any status proceeds; used when the status itself is under test.
    AcceptAnyStatus,
}

/// Whether an element check tolerates absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Absent is skipped.
    Optional,
    /// Absent is failed.
    Required,
}

/// A step that drives the session.
#[derive(Debug, Clone)]
pub enum Action {
    Navigate {
        path: String,
        policy: NavigationPolicy,
    },
    GoBack,
    GoForward,
    Reload,
    /// Session-side wait; a timeout fails the step. `None` uses the run's budget.
    AwaitSelector {
        selector: String,
        timeout: Option<Duration>,
    },
    /// Read `href` from the first match of `chain` and navigate there.
    /// An absent link skips the remaining checks.
    FollowLink { chain: LocatorChain },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Navigate { path, .. } => write!(f, "navigate {path}"),
            Action::GoBack => f.write_str("go back"),
            Action::GoForward => f.write_str("go forward"),
            Action::Reload => f.write_str("reload"),
            Action::AwaitSelector { selector, .. } => write!(f, "await {selector}"),
            Action::FollowLink { chain } => write!(f, "follow {chain}"),
        }
    }
}

/// What a check inspects.
#[derive(Debug, Clone)]
pub enum CheckSpec {
    Element {
        chain: LocatorChain,
        presence: Presence,
        invariant: ElementInvariant,
    },
    Location(LocationInvariant),
    Response(ResponseInvariant),
}

/// One (probe, invariant) pair; produces exactly one outcome.
#[derive(Debug, Clone)]
pub struct Check {
    pub label: String,
    pub spec: CheckSpec,
}

#[derive(Debug, Clone)]
pub enum Step {
    Act(Action),
    Check(Check),
}

/// A named sequence of steps run against one session for one target.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub group: String,
    pub name: String,
    pub target: Target,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(group: impl Into<String>, name: impl Into<String>, target: Target) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            target,
            steps: Vec::new(),
        }
    }

    /// Navigate to the target's own path; optional targets tolerate being unavailable.
    pub fn visit(self) -> Self {
        let policy = if self.target.optional {
            NavigationPolicy::SkipIfUnavailable
        } else {
            NavigationPolicy::Require
        };
        let path = self.target.path.clone();
        self.navigate_with(path, policy)
    }

    pub fn navigate(self, path: impl Into<String>) -> Self {
        self.navigate_with(path, NavigationPolicy::Require)
    }

    pub fn navigate_with(self, path: impl Into<String>, policy: NavigationPolicy) -> Self {
        self.act(Action::Navigate {
            path: path.into(),
            policy,
        })
    }

    pub fn go_back(self) -> Self {
        self.act(Action::GoBack)
    }

    pub fn go_forward(self) -> Self {
        self.act(Action::GoForward)
    }

    pub fn reload(self) -> Self {
        self.act(Action::Reload)
    }

    pub fn await_selector(self, selector: impl Into<String>) -> Self {
        self.act(Action::AwaitSelector {
            selector: selector.into(),
            timeout: None,
        })
    }

    pub fn follow(self, chain: impl Into<LocatorChain>) -> Self {
        self.act(Action::FollowLink {
            chain: chain.into(),
        })
    }

    pub fn act(mut self, action: Action) -> Self {
        self.steps.push(Step::Act(action));
        self
    }

    /// Element check that fails when the element is absent.
    pub fn expect(
        self,
        label: impl Into<String>,
        chain: impl Into<LocatorChain>,
        invariant: ElementInvariant,
    ) -> Self {
        self.element(label, chain, Presence::Required, invariant)
    }

    /// Element check that is skipped when the element is absent.
    pub fn probe(
        self,
        label: impl Into<String>,
        chain: impl Into<LocatorChain>,
        invariant: ElementInvariant,
    ) -> Self {
        self.element(label, chain, Presence::Optional, invariant)
    }

    pub fn element(
        self,
        label: impl Into<String>,
        chain: impl Into<LocatorChain>,
        presence: Presence,
        invariant: ElementInvariant,
    ) -> Self {
        self.check(
            label,
            CheckSpec::Element {
                chain: chain.into(),
                presence,
                invariant,
            },
        )
    }

    pub fn expect_location(self, label: impl Into<String>, invariant: LocationInvariant) -> Self {
        self.check(label, CheckSpec::Location(invariant))
    }

    pub fn expect_response(self, label: impl Into<String>, invariant: ResponseInvariant) -> Self {
        self.check(label, CheckSpec::Response(invariant))
    }

    pub fn check(mut self, label: impl Into<String>, spec: CheckSpec) -> Self {
        self.steps.push(Step::Check(Check {
            label: label.into(),
            spec,
        }));
        self
    }

    /// Checks in step order.
    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.steps.iter().filter_map(|step| match step {
            Step::Check(check) => Some(check),
            Step::Act(_) => None,
        })
    }

    /// Fully qualified name, e.g. `providers/guide mentions provider`.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}
