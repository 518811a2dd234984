use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use crate::error::VerifyError;
use crate::models::{NavigationResponse, Readiness};

/// A navigable rendering context (browser tab, static document, mock).
///
/// At most one scenario drives a session at any instant; the runner
/// enforces this by never sharing a session between concurrent scenarios.
pub trait Session: Send + Sync {
    /// Handle to a located element, valid for the current document.
    type Element: Clone + Debug + Send + Sync;

    /// Load `url` and report the final URL and HTTP status.
    fn navigate(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<NavigationResponse, VerifyError>> + Send;

    /// All elements currently matching a CSS selector, in document order.
    ///
    /// Zero matches is `Ok(vec![])`, not an error.
    fn locate(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<Self::Element>, VerifyError>> + Send;

    fn is_visible(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<bool, VerifyError>> + Send;

    /// Text content of the element and its descendants.
    fn text(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<String, VerifyError>> + Send;

    /// Computed value of a CSS property, e.g. `background-color`.
    fn computed_style(
        &self,
        element: &Self::Element,
        property: &str,
    ) -> impl Future<Output = Result<String, VerifyError>> + Send;

    fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, VerifyError>> + Send;

    /// Wait until `selector` matches at least one element or `timeout` elapses.
    fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Readiness, VerifyError>> + Send;

    fn current_url(&self) -> impl Future<Output = Result<String, VerifyError>> + Send;

    fn go_back(&self) -> impl Future<Output = Result<(), VerifyError>> + Send;

    fn go_forward(&self) -> impl Future<Output = Result<(), VerifyError>> + Send;

    fn reload(&self) -> impl Future<Output = Result<(), VerifyError>> + Send;

    /// Release the underlying resources (close the tab, ...).
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

/// Opens isolated sessions, one per scenario.
pub trait SessionFactory: Send + Sync + Clone {
    type Session: Session;

    fn open(&self) -> impl Future<Output = Result<Self::Session, VerifyError>> + Send;
}
