//! Presence-tolerant probing.
//!
//! A probe locates an optional element through a fallback chain, waits a
//! bounded time for it, and extracts only the evidence the pending
//! invariant asks for. A missing element is a normal outcome.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::VerifyError;
use crate::locator::LocatorChain;
use crate::traits::Session;
use crate::wait::{WaitOutcome, WaitPolicy, bounded_wait};

/// What to extract from a found element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceRequest {
    pub text: bool,
    pub visibility: bool,
    pub styles: Vec<String>,
    pub attributes: Vec<String>,
}

impl EvidenceRequest {
    pub fn text() -> Self {
        Self {
            text: true,
            ..Self::default()
        }
    }

    pub fn visibility() -> Self {
        Self {
            visibility: true,
            ..Self::default()
        }
    }

    pub fn styles<I, P>(properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            styles: properties.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            attributes: vec![name.into()],
            ..Self::default()
        }
    }
}

/// Evidence gathered from the first element matched by a probe.
#[derive(Debug, Clone)]
pub struct Probed<E> {
    pub element: E,
    /// Number of elements matched by the winning locator.
    pub matches: usize,
    /// Display form of the winning locator.
    pub locator: String,
    pub visible: Option<bool>,
    pub text: Option<String>,
    pub styles: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, Option<String>>,
}

impl<E> Probed<E> {
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_deref())
    }
}

/// Why a probe found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// Looked once (no wait budget) and nothing matched.
    NotPresent,
    /// Nothing matched within the wait budget.
    TimedOut(Duration),
}

impl Absence {
    pub fn describe(&self) -> String {
        match self {
            Absence::NotPresent => "not present".to_string(),
            Absence::TimedOut(d) => format!("not found within {} ms", d.as_millis()),
        }
    }
}

/// Result of one probe; created per check and discarded afterwards.
#[derive(Debug, Clone)]
pub enum ProbeResult<E> {
    Found(Probed<E>),
    Absent(Absence),
}

impl<E> ProbeResult<E> {
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeResult::Found(_))
    }

    pub fn found(&self) -> Option<&Probed<E>> {
        match self {
            ProbeResult::Found(probed) => Some(probed),
            ProbeResult::Absent(_) => None,
        }
    }
}

/// Probes elements on one session under a wait policy.
pub struct Probe<'a, S: Session> {
    session: &'a S,
    policy: WaitPolicy,
    cancel: &'a CancellationToken,
}

impl<'a, S: Session> Probe<'a, S> {
    pub fn new(session: &'a S, policy: WaitPolicy, cancel: &'a CancellationToken) -> Self {
        Self {
            session,
            policy,
            cancel,
        }
    }

    /// Same session and token, different wait budget.
    pub fn with_policy(&self, policy: WaitPolicy) -> Self {
        Self {
            session: self.session,
            policy,
            cancel: self.cancel,
        }
    }

    /// Locate the first element of `chain` and extract the requested evidence.
    ///
    /// Only session failures and cancellation are errors; absence is `Ok`.
    pub async fn run(
        &self,
        chain: &LocatorChain,
        request: &EvidenceRequest,
    ) -> Result<ProbeResult<S::Element>, VerifyError> {
        let (locator, matches) =
            match bounded_wait(self.session, chain, self.policy, self.cancel).await? {
                WaitOutcome::Found { locator, matches } => (locator, matches),
                WaitOutcome::Absent => return Ok(ProbeResult::Absent(Absence::NotPresent)),
                WaitOutcome::TimedOut(d) => return Ok(ProbeResult::Absent(Absence::TimedOut(d))),
            };

        let count = matches.len();
        let Some(element) = matches.into_iter().next() else {
            return Ok(ProbeResult::Absent(Absence::NotPresent));
        };
        let locator = chain
            .get(locator)
            .map(ToString::to_string)
            .unwrap_or_default();

        let mut probed = Probed {
            element,
            matches: count,
            locator,
            visible: None,
            text: None,
            styles: BTreeMap::new(),
            attributes: BTreeMap::new(),
        };

        if request.visibility {
            probed.visible = Some(self.session.is_visible(&probed.element).await?);
        }
        if request.text {
            probed.text = Some(self.session.text(&probed.element).await?);
        }
        for property in &request.styles {
            let value = self
                .session
                .computed_style(&probed.element, property)
                .await?;
            probed.styles.insert(property.clone(), value);
        }
        for name in &request.attributes {
            let value = self.session.attribute(&probed.element, name).await?;
            probed.attributes.insert(name.clone(), value);
        }

        tracing::trace!(locator = %probed.locator, matches = count, "Probe found element");
        Ok(ProbeResult::Found(probed))
    }
}
