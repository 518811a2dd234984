//! Static-HTML session over reqwest and scraper.
//!
//! Pages are fetched once per navigation and queried as parsed documents;
//! no JavaScript runs. Visibility and styles are judged from markup alone
//! (the `hidden` attribute, inline `display`/`visibility`), so colour
//! invariants usually come back inconclusive on this engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;
use vigil_core::error::VerifyError;
use vigil_core::models::{NavigationResponse, Readiness};
use vigil_core::traits::{Session, SessionFactory};

const USER_AGENT: &str = "Vigil/0.1 (content verifier)";
const MAX_REFRESH_HOPS: usize = 5;

/// Handle to an element of one fetched document.
///
/// Handles go stale once the session moves to another document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpElement {
    document: u64,
    selector: String,
    index: usize,
}

/// What a query learned about one matched element.
///
/// Taken from a single parse of the document so reads never re-parse.
#[derive(Debug, Clone)]
struct Snapshot {
    rendered: bool,
    text: String,
    attributes: Vec<(String, String)>,
}

impl Snapshot {
    fn of(element: ElementRef<'_>) -> Self {
        Self {
            rendered: rendered(element),
            text: text_of(element),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct Page {
    id: u64,
    url: String,
    html: Arc<str>,
    /// Query results on this document, keyed by selector.
    queries: HashMap<String, Arc<[Snapshot]>>,
}

struct Fetched {
    url: String,
    status: u16,
    html: String,
}

#[derive(Debug, Default)]
struct History {
    pages: Vec<Page>,
    cursor: Option<usize>,
    next_id: u64,
}

impl History {
    fn page(&mut self, fetched: Fetched) -> Page {
        self.next_id += 1;
        Page {
            id: self.next_id,
            url: fetched.url,
            html: fetched.html.into(),
            queries: HashMap::new(),
        }
    }

    fn push(&mut self, fetched: Fetched) {
        let page = self.page(fetched);
        let keep = self.cursor.map_or(0, |i| i + 1);
        self.pages.truncate(keep);
        self.pages.push(page);
        self.cursor = Some(self.pages.len() - 1);
    }

    fn replace_current(&mut self, fetched: Fetched) {
        let page = self.page(fetched);
        match self.cursor.and_then(|i| self.pages.get_mut(i)) {
            Some(slot) => *slot = page,
            None => {
                self.pages.push(page);
                self.cursor = Some(self.pages.len() - 1);
            }
        }
    }

    fn current(&self) -> Option<&Page> {
        self.cursor.and_then(|i| self.pages.get(i))
    }

    fn current_mut(&mut self) -> Option<&mut Page> {
        self.cursor.and_then(|i| self.pages.get_mut(i))
    }
}

/// Session fetching pages with reqwest and querying them with scraper.
pub struct HttpSession {
    client: Client,
    timeout: Duration,
    history: Mutex<History>,
}

impl HttpSession {
    fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            history: Mutex::new(History::default()),
        }
    }

    fn history(&self) -> Result<MutexGuard<'_, History>, VerifyError> {
        self.history
            .lock()
            .map_err(|_| VerifyError::Session("session state poisoned".into()))
    }

    /// Id, URL and markup of the current document.
    fn current(&self) -> Result<(u64, String, Arc<str>), VerifyError> {
        self.history()?
            .current()
            .map(|page| (page.id, page.url.clone(), Arc::clone(&page.html)))
            .ok_or_else(|| VerifyError::Session("no document loaded".into()))
    }

    /// Snapshots of every element matching `selector` in the current
    /// document, parsing it at most once per selector.
    fn query(&self, selector: &str) -> Result<(u64, Arc<[Snapshot]>), VerifyError> {
        let (id, _, html) = self.current()?;
        if let Some(hit) = self
            .history()?
            .current()
            .filter(|page| page.id == id)
            .and_then(|page| page.queries.get(selector))
        {
            return Ok((id, Arc::clone(hit)));
        }

        let snapshots = snapshot_all(&html, selector)?;
        if let Some(page) = self.history()?.current_mut().filter(|page| page.id == id) {
            page.queries
                .insert(selector.to_string(), Arc::clone(&snapshots));
        }
        Ok((id, snapshots))
    }

    /// GET `url`, following `<meta http-equiv="refresh">` redirects.
    async fn fetch(&self, url: &str) -> Result<Fetched, VerifyError> {
        let mut next = url.to_string();
        for _ in 0..=MAX_REFRESH_HOPS {
            let response = self
                .client
                .get(&next)
                .send()
                .await
                .map_err(|e| request_error(&next, e, self.timeout))?;

            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let html = response
                .text()
                .await
                .map_err(|e| VerifyError::Navigation {
                    url: final_url.clone(),
                    message: format!("Failed to read response body: {e}"),
                })?;

            match refresh_target(&html) {
                Some(target) => {
                    next = Url::parse(&final_url)
                        .and_then(|base| base.join(&target))
                        .map(String::from)
                        .map_err(|e| VerifyError::Navigation {
                            url: final_url.clone(),
                            message: format!("bad refresh target '{target}': {e}"),
                        })?;
                    tracing::debug!(from = %final_url, to = %next, "Following meta refresh");
                }
                None => {
                    return Ok(Fetched {
                        url: final_url,
                        status,
                        html,
                    });
                }
            }
        }
        Err(VerifyError::Navigation {
            url: url.to_string(),
            message: format!("more than {MAX_REFRESH_HOPS} refresh redirects"),
        })
    }

    fn with_element<T>(
        &self,
        element: &HttpElement,
        read: impl FnOnce(&Snapshot) -> T,
    ) -> Result<T, VerifyError> {
        let stale = || VerifyError::Session(format!("stale element {element:?}"));
        let (id, snapshots) = self.query(&element.selector)?;
        if id != element.document {
            return Err(stale());
        }
        snapshots.get(element.index).map(read).ok_or_else(stale)
    }
}

fn request_error(url: &str, error: reqwest::Error, timeout: Duration) -> VerifyError {
    if error.is_timeout() {
        VerifyError::Timeout {
            what: format!("navigation to {url}"),
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if error.is_connect() {
        VerifyError::Navigation {
            url: url.to_string(),
            message: format!("Connection failed: {error}"),
        }
    } else {
        VerifyError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, VerifyError> {
    Selector::parse(selector).map_err(|e| VerifyError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn snapshot_all(html: &str, selector: &str) -> Result<Arc<[Snapshot]>, VerifyError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).map(Snapshot::of).collect())
}

/// `landed` with the fragment of `requested` when the server dropped it.
fn keep_fragment(requested: &str, landed: &str) -> String {
    let fragment = Url::parse(requested)
        .ok()
        .and_then(|u| u.fragment().map(str::to_string));
    match (fragment, Url::parse(landed)) {
        (Some(fragment), Ok(mut url)) if url.fragment().is_none() => {
            url.set_fragment(Some(&fragment));
            url.into()
        }
        _ => landed.to_string(),
    }
}

/// Target of an immediate `<meta http-equiv="refresh">`, if any.
fn refresh_target(html: &str) -> Option<String> {
    let selector = Selector::parse("meta[http-equiv]").ok()?;
    let document = Html::parse_document(html);
    let content = document
        .select(&selector)
        .find(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })?
        .value()
        .attr("content")?;

    let (delay, rest) = content.split_once(';')?;
    if delay.trim().parse::<f64>().ok()? > 0.0 {
        return None;
    }
    let rest = rest.trim();
    if !rest.get(..4)?.eq_ignore_ascii_case("url=") {
        return None;
    }
    let target = rest[4..].trim().trim_matches(['\'', '"']);
    (!target.is_empty()).then(|| target.to_string())
}

/// Value of `property` in an inline `style` attribute.
fn inline_style(style: &str, property: &str) -> Option<String> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .last()
        .map(|(_, value)| {
            value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_string()
        })
}

/// Markup-level approximation of "rendered and not hidden".
fn rendered(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| {
            let value = el.value();
            if matches!(
                value.name(),
                "head" | "script" | "style" | "template" | "noscript"
            ) {
                return false;
            }
            if value.attr("hidden").is_some() {
                return false;
            }
            value.attr("style").is_none_or(|style| {
                inline_style(style, "display").is_none_or(|v| v != "none")
                    && inline_style(style, "visibility").is_none_or(|v| v != "hidden")
            })
        })
}

/// Text content with whitespace runs collapsed.
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Session for HttpSession {
    type Element = HttpElement;

    async fn navigate(&self, url: &str) -> Result<NavigationResponse, VerifyError> {
        let mut fetched = self.fetch(url).await?;
        fetched.url = keep_fragment(url, &fetched.url);
        let response = NavigationResponse::new(fetched.url.clone(), Some(fetched.status));
        self.history()?.push(fetched);
        Ok(response)
    }

    async fn locate(&self, selector: &str) -> Result<Vec<HttpElement>, VerifyError> {
        let (id, snapshots) = self.query(selector)?;
        Ok((0..snapshots.len())
            .map(|index| HttpElement {
                document: id,
                selector: selector.to_string(),
                index,
            })
            .collect())
    }

    async fn is_visible(&self, element: &HttpElement) -> Result<bool, VerifyError> {
        self.with_element(element, |el| el.rendered)
    }

    async fn text(&self, element: &HttpElement) -> Result<String, VerifyError> {
        self.with_element(element, |el| el.text.clone())
    }

    /// Only inline declarations are known; anything else is reported empty.
    async fn computed_style(
        &self,
        element: &HttpElement,
        property: &str,
    ) -> Result<String, VerifyError> {
        self.with_element(element, |el| {
            el.attribute("style")
                .and_then(|style| inline_style(style, property))
                .unwrap_or_default()
        })
    }

    async fn attribute(
        &self,
        element: &HttpElement,
        name: &str,
    ) -> Result<Option<String>, VerifyError> {
        self.with_element(element, |el| el.attribute(name).map(str::to_string))
    }

    /// A fetched document never changes, so absence is final.
    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<Readiness, VerifyError> {
        let (_, snapshots) = self.query(selector)?;
        Ok(if !snapshots.is_empty() {
            Readiness::Ready
        } else {
            Readiness::TimedOut
        })
    }

    async fn current_url(&self) -> Result<String, VerifyError> {
        Ok(self.current()?.1)
    }

    async fn go_back(&self) -> Result<(), VerifyError> {
        let mut history = self.history()?;
        match history.cursor {
            Some(i) if i > 0 => {
                history.cursor = Some(i - 1);
                Ok(())
            }
            _ => Err(VerifyError::Session("no previous history entry".into())),
        }
    }

    async fn go_forward(&self) -> Result<(), VerifyError> {
        let mut history = self.history()?;
        match history.cursor {
            Some(i) if i + 1 < history.pages.len() => {
                history.cursor = Some(i + 1);
                Ok(())
            }
            _ => Err(VerifyError::Session("no next history entry".into())),
        }
    }

    async fn reload(&self) -> Result<(), VerifyError> {
        let (_, url, _) = self.current()?;
        let mut fetched = self.fetch(&url).await?;
        fetched.url = keep_fragment(&url, &fetched.url);
        self.history()?.replace_current(fetched);
        Ok(())
    }

    async fn close(self) {}
}

/// Hands out independent [`HttpSession`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpSessionFactory {
    client: Client,
    timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new() -> Result<Self, VerifyError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| VerifyError::Session(format!("HTTP client error: {e}")))?;
        Ok(Self { client, timeout })
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, VerifyError> {
        Ok(HttpSession::new(self.client.clone(), self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const INTRO: &str = r#"<html data-theme="dark">
<head><title>Introduction | CodeGPT</title><meta name="description" content="docs"></head>
<body style="background-color: rgb(27, 27, 29)">
  <nav class="navbar"><a href="/docs/intro">Tutorial</a></nav>
  <ul class="menu">
    <li><a href="/docs/intro">Intro</a></li>
    <li><a href="/docs/next">Next</a></li>
    <li style="display: none"><a href="/docs/secret">Secret</a></li>
  </ul>
  <article>
    <h1>Welcome</h1>
    <p>CodeGPT   brings
       chat to your editor.</p>
  </article>
</body></html>"#;

    const NEXT: &str = "<html><body><article><h1>Next</h1></article></body></html>";
    const ROOT: &str =
        r#"<html><head><meta http-equiv="refresh" content="0; url=/docs/intro"></head></html>"#;

    /// Minimal HTTP/1.1 server answering from a fixed route table.
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = routes
                        .iter()
                        .find(|(p, ..)| *p == path)
                        .map(|(_, s, b)| (*s, *b))
                        .unwrap_or((404, "<html><body><h1>Page Not Found</h1></body></html>"));
                    let response = format!(
                        "HTTP/1.1 {status} Status\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}")
    }

    async fn docs_server() -> String {
        serve(vec![
            ("/", 200, ROOT),
            ("/docs/intro", 200, INTRO),
            ("/docs/next", 200, NEXT),
        ])
        .await
    }

    async fn session() -> HttpSession {
        HttpSessionFactory::with_timeout(Duration::from_secs(5))
            .unwrap()
            .open()
            .await
            .unwrap()
    }

    #[test]
    fn test_inline_style_lookup() {
        let style = "color: red; Display : none !important;";
        assert_eq!(inline_style(style, "display").as_deref(), Some("none"));
        assert_eq!(inline_style(style, "color").as_deref(), Some("red"));
        assert!(inline_style(style, "background-color").is_none());
    }

    #[test]
    fn test_refresh_target() {
        assert_eq!(refresh_target(ROOT).as_deref(), Some("/docs/intro"));
        let delayed = r#"<meta http-equiv="refresh" content="5; url=/later">"#;
        assert!(refresh_target(delayed).is_none());
        assert!(refresh_target(INTRO).is_none());
    }

    #[tokio::test]
    async fn navigate_follows_meta_refresh() {
        let base = docs_server().await;
        let session = session().await;

        let response = session.navigate(&format!("{base}/")).await.unwrap();

        assert_eq!(response.status, Some(200));
        assert!(response.url.ends_with("/docs/intro"));
        assert_eq!(session.current_url().await.unwrap(), response.url);
    }

    #[tokio::test]
    async fn missing_page_reports_404() {
        let base = docs_server().await;
        let session = session().await;

        let response = session
            .navigate(&format!("{base}/docs/nonexistent-page-12345"))
            .await
            .unwrap();

        assert_eq!(response.status, Some(404));
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn extracts_text_attributes_and_visibility() {
        let base = docs_server().await;
        let session = session().await;
        session.navigate(&format!("{base}/docs/intro")).await.unwrap();

        let links = session.locate(".menu a").await.unwrap();
        assert_eq!(links.len(), 3);
        assert!(session.is_visible(&links[0]).await.unwrap());
        assert!(!session.is_visible(&links[2]).await.unwrap());
        assert_eq!(
            session.attribute(&links[1], "href").await.unwrap().as_deref(),
            Some("/docs/next")
        );

        let paragraph = &session.locate("article p").await.unwrap()[0];
        assert_eq!(
            session.text(paragraph).await.unwrap(),
            "CodeGPT brings chat to your editor."
        );

        let root = &session.locate("html").await.unwrap()[0];
        assert_eq!(
            session.attribute(root, "data-theme").await.unwrap().as_deref(),
            Some("dark")
        );

        let title = &session.locate("title").await.unwrap()[0];
        assert!(!session.is_visible(title).await.unwrap());

        let body = &session.locate("body").await.unwrap()[0];
        assert_eq!(
            session.computed_style(body, "background-color").await.unwrap(),
            "rgb(27, 27, 29)"
        );
        assert_eq!(session.computed_style(body, "color").await.unwrap(), "");
    }

    #[tokio::test]
    async fn queries_parse_each_selector_once_per_document() {
        let base = docs_server().await;
        let session = session().await;
        session.navigate(&format!("{base}/docs/intro")).await.unwrap();

        let first = session.locate(".menu a").await.unwrap();
        let again = session.locate(".menu a").await.unwrap();
        assert_eq!(first, again);
        session.text(&first[0]).await.unwrap();
        session.attribute(&first[1], "href").await.unwrap();
        session.locate("article").await.unwrap();

        let cached = |session: &HttpSession| {
            let history = session.history().unwrap();
            let mut keys: Vec<String> = history.current().unwrap().queries.keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(cached(&session), [".menu a", "article"]);

        session.reload().await.unwrap();
        assert!(cached(&session).is_empty());
        assert!(session.text(&first[0]).await.is_err());
    }

    #[tokio::test]
    async fn navigation_keeps_the_fragment() {
        let base = docs_server().await;
        let session = session().await;

        let response = session
            .navigate(&format!("{base}/docs/intro#getting-started"))
            .await
            .unwrap();

        assert_eq!(response.status, Some(200));
        assert!(response.url.ends_with("/docs/intro#getting-started"), "{}", response.url);
        assert_eq!(session.current_url().await.unwrap(), response.url);
        assert!(!session.locate("article").await.unwrap().is_empty());
    }

    #[test]
    fn test_keep_fragment() {
        assert_eq!(
            keep_fragment("http://docs.test/docs/intro#setup", "http://docs.test/docs/intro"),
            "http://docs.test/docs/intro#setup"
        );
        assert_eq!(
            keep_fragment("http://docs.test/", "http://docs.test/docs/intro#top"),
            "http://docs.test/docs/intro#top"
        );
        assert_eq!(
            keep_fragment("http://docs.test/", "http://docs.test/docs/intro"),
            "http://docs.test/docs/intro"
        );
    }

    #[tokio::test]
    async fn invalid_selector_is_an_error() {
        let base = docs_server().await;
        let session = session().await;
        session.navigate(&format!("{base}/docs/intro")).await.unwrap();

        let err = session.locate("a[href=").await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn history_moves_between_documents() {
        let base = docs_server().await;
        let session = session().await;
        session.navigate(&format!("{base}/docs/intro")).await.unwrap();
        let stale = session.locate("article").await.unwrap().remove(0);
        session.navigate(&format!("{base}/docs/next")).await.unwrap();

        assert!(session.text(&stale).await.is_err());
        assert!(session.go_forward().await.is_err());

        session.go_back().await.unwrap();
        assert!(session.current_url().await.unwrap().ends_with("/docs/intro"));

        session.go_forward().await.unwrap();
        assert!(session.current_url().await.unwrap().ends_with("/docs/next"));

        session.reload().await.unwrap();
        assert_eq!(
            session.wait_for("article h1", Duration::from_secs(1)).await.unwrap(),
            Readiness::Ready
        );
        assert_eq!(
            session.wait_for(".menu", Duration::from_secs(1)).await.unwrap(),
            Readiness::TimedOut
        );
    }

    #[tokio::test]
    async fn connection_refused_is_a_navigation_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let session = session().await;

        let err = session.navigate(&format!("http://{addr}/")).await.unwrap_err();

        assert!(err.is_navigation());
    }

    #[tokio::test]
    async fn queries_need_a_document() {
        let session = session().await;
        assert!(session.locate("article").await.is_err());
        assert!(session.go_back().await.is_err());
    }
}
