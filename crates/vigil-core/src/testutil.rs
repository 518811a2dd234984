//! Test utilities: a scripted in-memory site and mock sessions over it.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::error::VerifyError;
use crate::models::{NavigationResponse, Readiness};
use crate::traits::{Session, SessionFactory};

// ---------------------------------------------------------------------------
// FakeSite
// ---------------------------------------------------------------------------

/// An element in a fake page.
///
/// `selectors` lists every selector string that matches it; matching is
/// exact string equality, not CSS evaluation.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub selectors: Vec<String>,
    pub text: String,
    pub styles: HashMap<String, String>,
    pub attributes: HashMap<String, String>,
    pub visible: bool,
    /// Number of `locate` calls on the page before the element renders.
    pub appear_after: usize,
}

impl FakeElement {
    pub fn new(selectors: &[&str]) -> Self {
        Self {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            text: String::new(),
            styles: HashMap::new(),
            attributes: HashMap::new(),
            visible: true,
            appear_after: 0,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Simulate asynchronous rendering.
    pub fn appears_after(mut self, polls: usize) -> Self {
        self.appear_after = polls;
        self
    }
}

/// A page of the fake site.
#[derive(Debug, Clone)]
pub struct FakePage {
    pub status: u16,
    pub redirect: Option<String>,
    pub elements: Vec<FakeElement>,
}

impl FakePage {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            redirect: None,
            elements: Vec::new(),
        }
    }

    /// Client-side redirect: navigating here lands on `path`.
    pub fn redirect_to(path: &str) -> Self {
        Self {
            status: 200,
            redirect: Some(path.to_string()),
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_all(mut self, elements: impl IntoIterator<Item = FakeElement>) -> Self {
        self.elements.extend(elements);
        self
    }
}

/// In-memory site keyed by path. Unknown paths answer with a bare 404 page.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, page: FakePage) -> Self {
        self.pages.insert(path.to_string(), page);
        self
    }

    pub fn get(&self, path: &str) -> Option<&FakePage> {
        self.pages.get(path)
    }
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

/// Handle to an element of the page that was current when it was located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    pub path: String,
    pub index: usize,
}

#[derive(Debug, Default)]
struct MockState {
    history: Vec<String>,
    cursor: Option<usize>,
    polls: usize,
}

/// Mock session navigating a [`FakeSite`].
#[derive(Clone)]
pub struct MockSession {
    site: Arc<FakeSite>,
    state: Arc<Mutex<MockState>>,
    /// Every URL passed to `navigate`, in call order.
    pub navigations: Arc<Mutex<Vec<String>>>,
    pub locate_calls: Arc<AtomicUsize>,
    failing_paths: Arc<Mutex<Vec<String>>>,
    hang_locate: bool,
}

impl MockSession {
    pub fn new(site: FakeSite) -> Self {
        Self::shared(Arc::new(site))
    }

    pub fn shared(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            state: Arc::new(Mutex::new(MockState::default())),
            navigations: Arc::new(Mutex::new(Vec::new())),
            locate_calls: Arc::new(AtomicUsize::new(0)),
            failing_paths: Arc::new(Mutex::new(Vec::new())),
            hang_locate: false,
        }
    }

    /// Navigating to `path` fails with a network-style error.
    pub fn failing_navigation(self, path: &str) -> Self {
        self.failing_paths.lock().unwrap().push(path.to_string());
        self
    }

    /// `locate` never resolves, for cancellation and timeout tests.
    pub fn hanging(mut self) -> Self {
        self.hang_locate = true;
        self
    }

    fn current_path(&self) -> Result<String, VerifyError> {
        let state = self.state.lock().unwrap();
        let url = state
            .cursor
            .and_then(|i| state.history.get(i))
            .ok_or_else(|| VerifyError::Session("no document loaded".into()))?;
        Ok(path_of(url))
    }

    fn element(&self, element: &MockElement) -> Result<FakeElement, VerifyError> {
        self.site
            .get(&element.path)
            .and_then(|page| page.elements.get(element.index))
            .cloned()
            .ok_or_else(|| VerifyError::Session(format!("stale element {element:?}")))
    }

    fn resolve(&self, url: &str) -> (String, u16) {
        let path = path_of(url);
        match self.site.get(&path) {
            Some(page) => match &page.redirect {
                Some(target) => (replace_path(url, target), page.status),
                None => (url.to_string(), page.status),
            },
            None => (url.to_string(), 404),
        }
    }
}

fn path_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['#', '?']).next().unwrap_or(url).to_string())
}

fn replace_path(url: &str, path: &str) -> String {
    match Url::parse(url) {
        Ok(mut u) => {
            u.set_path(path);
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => path.to_string(),
    }
}

impl Session for MockSession {
    type Element = MockElement;

    async fn navigate(&self, url: &str) -> Result<NavigationResponse, VerifyError> {
        self.navigations.lock().unwrap().push(url.to_string());
        let path = path_of(url);
        if self.failing_paths.lock().unwrap().contains(&path) {
            return Err(VerifyError::Navigation {
                url: url.to_string(),
                message: "connection refused".into(),
            });
        }

        let (final_url, status) = self.resolve(url);
        let mut state = self.state.lock().unwrap();
        let keep = state.cursor.map_or(0, |i| i + 1);
        state.history.truncate(keep);
        state.history.push(final_url.clone());
        state.cursor = Some(state.history.len() - 1);
        state.polls = 0;
        Ok(NavigationResponse::new(final_url, Some(status)))
    }

    async fn locate(&self, selector: &str) -> Result<Vec<MockElement>, VerifyError> {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_locate {
            std::future::pending::<()>().await;
        }
        if selector.trim().is_empty() {
            return Err(VerifyError::InvalidSelector {
                selector: selector.to_string(),
                message: "empty selector".into(),
            });
        }

        let path = self.current_path()?;
        let polls = {
            let mut state = self.state.lock().unwrap();
            state.polls += 1;
            state.polls
        };

        let Some(page) = self.site.get(&path) else {
            return Ok(Vec::new());
        };
        Ok(page
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.appear_after < polls && el.selectors.iter().any(|s| s == selector))
            .map(|(index, _)| MockElement {
                path: path.clone(),
                index,
            })
            .collect())
    }

    async fn is_visible(&self, element: &MockElement) -> Result<bool, VerifyError> {
        Ok(self.element(element)?.visible)
    }

    async fn text(&self, element: &MockElement) -> Result<String, VerifyError> {
        Ok(self.element(element)?.text)
    }

    async fn computed_style(
        &self,
        element: &MockElement,
        property: &str,
    ) -> Result<String, VerifyError> {
        Ok(self
            .element(element)?
            .styles
            .get(property)
            .cloned()
            .unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &MockElement,
        name: &str,
    ) -> Result<Option<String>, VerifyError> {
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<Readiness, VerifyError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.locate(selector).await?.is_empty() {
                return Ok(Readiness::Ready);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(Readiness::TimedOut);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn current_url(&self) -> Result<String, VerifyError> {
        let state = self.state.lock().unwrap();
        state
            .cursor
            .and_then(|i| state.history.get(i))
            .cloned()
            .ok_or_else(|| VerifyError::Session("no document loaded".into()))
    }

    async fn go_back(&self) -> Result<(), VerifyError> {
        let mut state = self.state.lock().unwrap();
        match state.cursor {
            Some(i) if i > 0 => {
                state.cursor = Some(i - 1);
                state.polls = 0;
                Ok(())
            }
            _ => Err(VerifyError::Session("no previous history entry".into())),
        }
    }

    async fn go_forward(&self) -> Result<(), VerifyError> {
        let mut state = self.state.lock().unwrap();
        match state.cursor {
            Some(i) if i + 1 < state.history.len() => {
                state.cursor = Some(i + 1);
                state.polls = 0;
                Ok(())
            }
            _ => Err(VerifyError::Session("no next history entry".into())),
        }
    }

    async fn reload(&self) -> Result<(), VerifyError> {
        let mut state = self.state.lock().unwrap();
        if state.cursor.is_none() {
            return Err(VerifyError::Session("no document loaded".into()));
        }
        state.polls = 0;
        Ok(())
    }

    async fn close(self) {}
}

// ---------------------------------------------------------------------------
// MockSessionFactory
// ---------------------------------------------------------------------------

/// Factory handing out fresh [`MockSession`]s over one shared site.
#[derive(Clone)]
pub struct MockSessionFactory {
    site: Arc<FakeSite>,
    pub opened: Arc<AtomicUsize>,
    open_error: Arc<Mutex<Option<VerifyError>>>,
    hanging: bool,
}

impl MockSessionFactory {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            opened: Arc::new(AtomicUsize::new(0)),
            open_error: Arc::new(Mutex::new(None)),
            hanging: false,
        }
    }

    /// The next `open` call fails with `error`.
    pub fn with_open_error(self, error: VerifyError) -> Self {
        *self.open_error.lock().unwrap() = Some(error);
        self
    }

    /// Every opened session hangs in `locate`.
    pub fn hanging(mut self) -> Self {
        self.hanging = true;
        self
    }
}

impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, VerifyError> {
        if let Some(e) = self.open_error.lock().unwrap().take() {
            return Err(e);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let session = MockSession::shared(Arc::clone(&self.site));
        Ok(if self.hanging {
            session.hanging()
        } else {
            session
        })
    }
}
