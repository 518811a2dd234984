use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use vigil_core::error::VerifyError;
use vigil_core::models::{NavigationResponse, Readiness};
use vigil_core::traits::{Session, SessionFactory};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Headless Chromium driven over the Chrome DevTools Protocol.
///
/// One Chromium process is shared by every clone of the factory; each
/// [`SessionFactory::open`] call opens a fresh tab, so isolated sessions
/// share no history or document state.
///
/// # Example
///
/// ```rust,no_run
/// use vigil_client::BrowserSessionFactory;
/// use vigil_core::traits::{Session, SessionFactory};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let factory = BrowserSessionFactory::launch().await?;
/// let session = factory.open().await?;
/// let response = session.navigate("http://localhost:3000/docs/intro").await?;
/// println!("{} -> {:?}", response.url, response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserSessionFactory {
    browser: Arc<Browser>,
    timeout: Duration,
}

/// Install locations tried when no executable is configured. The snap
/// entry is the real binary behind the wrapper that rejects headless flags.
const KNOWN_INSTALLS: &[&str] = &[
    "/snap/chromium/current/usr/lib/chromium-browser/chrome",
    "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Launch settings for [`BrowserSessionFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Chrome/Chromium executable; discovered when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Window size in CSS pixels. The built-in suite targets a desktop layout.
    pub window: (u32, u32),
    pub navigation_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            window: (1280, 720),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserOptions {
    /// Read launch settings from environment variables.
    ///
    /// - `VIGIL_CHROME_PATH` (falls back to `CHROME_BIN`)
    /// - `VIGIL_BROWSER_HEADFUL` (`true` or `1` shows the window)
    /// - `VIGIL_BROWSER_WINDOW` (`WIDTHxHEIGHT`, defaults to `1280x720`)
    pub fn from_env() -> Result<Self, VerifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, VerifyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        options.executable = lookup("VIGIL_CHROME_PATH")
            .or_else(|| lookup("CHROME_BIN"))
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if let Some(raw) = lookup("VIGIL_BROWSER_HEADFUL") {
            options.headless = !matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(raw) = lookup("VIGIL_BROWSER_WINDOW") {
            options.window = parse_window(&raw).ok_or_else(|| {
                VerifyError::Config(format!(
                    "Invalid VIGIL_BROWSER_WINDOW '{raw}': must be WIDTHxHEIGHT"
                ))
            })?;
        }
        Ok(options)
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// The configured executable, which must exist, else the first known
    /// install that does. `None` lets `chromiumoxide` search on its own.
    fn resolve_executable(
        &self,
        exists: impl Fn(&Path) -> bool,
    ) -> Result<Option<PathBuf>, VerifyError> {
        if let Some(path) = &self.executable {
            if !exists(path) {
                return Err(VerifyError::Config(format!(
                    "Invalid VIGIL_CHROME_PATH '{}': no such file",
                    path.display()
                )));
            }
            return Ok(Some(path.clone()));
        }
        Ok(KNOWN_INSTALLS
            .iter()
            .map(Path::new)
            .find(|p| exists(p))
            .map(Path::to_path_buf))
    }

    fn browser_config(&self) -> Result<BrowserConfig, VerifyError> {
        let (width, height) = self.window;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .window_size(width, height)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run");
        builder = if self.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(bin) = self.resolve_executable(|p| p.exists())? {
            tracing::info!(executable = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }
        builder
            .build()
            .map_err(|e| VerifyError::Session(format!("Browser config error: {e}")))
    }
}

fn parse_window(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let size = (w.trim().parse().ok()?, h.trim().parse().ok()?);
    (size.0 > 0 && size.1 > 0).then_some(size)
}

impl BrowserSessionFactory {
    /// Launches Chromium with options read from the environment.
    pub async fn launch() -> Result<Self, VerifyError> {
        Self::launch_with(BrowserOptions::from_env()?).await
    }

    pub async fn launch_with(options: BrowserOptions) -> Result<Self, VerifyError> {
        let config = options.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| VerifyError::Session(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout: options.navigation_timeout,
        })
    }
}

impl SessionFactory for BrowserSessionFactory {
    type Session = BrowserSession;

    async fn open(&self) -> Result<BrowserSession, VerifyError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| VerifyError::Session(format!("Failed to open tab: {e}")))?;
        Ok(BrowserSession {
            page,
            timeout: self.timeout,
        })
    }
}

/// Element handle: the n-th match of a selector in the live document.
///
/// Re-resolved on every read, so it tracks re-renders of the same node
/// position rather than a fixed DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserElement {
    selector: String,
    index: usize,
}

/// Reply envelope of every element query script.
#[derive(Debug, Deserialize)]
struct Reply<T> {
    value: Option<T>,
    error: Option<String>,
    #[serde(default)]
    stale: bool,
}

/// One browser tab.
pub struct BrowserSession {
    page: Page,
    timeout: Duration,
}

impl BrowserSession {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, VerifyError> {
        let value: serde_json::Value = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| VerifyError::Session(format!("Script evaluation failed: {e}")))?
            .into_value()
            .map_err(|e| VerifyError::Session(format!("Script returned no value: {e}")))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Evaluate `body` against the element, with `el` bound to it.
    async fn query<T: DeserializeOwned>(
        &self,
        element: &BrowserElement,
        body: &str,
    ) -> Result<Option<T>, VerifyError> {
        let script = format!(
            "(() => {{ let el; try {{ el = document.querySelectorAll({sel})[{idx}]; }} \
             catch (e) {{ return {{ error: String(e) }}; }} \
             if (!el) return {{ stale: true }}; \
             return {{ value: {body} }}; }})()",
            sel = js_string(&element.selector)?,
            idx = element.index,
        );
        let reply: Reply<T> = self.eval(script).await?;
        if let Some(message) = reply.error {
            return Err(VerifyError::InvalidSelector {
                selector: element.selector.clone(),
                message,
            });
        }
        if reply.stale {
            return Err(VerifyError::Session(format!("stale element {element:?}")));
        }
        Ok(reply.value)
    }

    async fn count(&self, selector: &str) -> Result<usize, VerifyError> {
        let script = format!(
            "(() => {{ try {{ return {{ value: document.querySelectorAll({}).length }}; }} \
             catch (e) {{ return {{ error: String(e) }}; }} }})()",
            js_string(selector)?
        );
        let reply: Reply<usize> = self.eval(script).await?;
        match reply.error {
            Some(message) => Err(VerifyError::InvalidSelector {
                selector: selector.to_string(),
                message,
            }),
            None => Ok(reply.value.unwrap_or(0)),
        }
    }

    /// HTTP status of the document's main response, if the browser exposes it.
    async fn response_status(&self) -> Option<u16> {
        let script = "(() => { const nav = performance.getEntriesByType('navigation')[0]; \
                      return { value: nav && nav.responseStatus ? nav.responseStatus : null }; })()";
        match self.eval::<Reply<u16>>(script.to_string()).await {
            Ok(reply) => reply.value,
            Err(e) => {
                tracing::debug!(error = %e, "Response status unavailable");
                None
            }
        }
    }

    /// Run a history navigation and wait for the URL to change.
    async fn traverse(&self, script: &str, what: &str) -> Result<(), VerifyError> {
        let before = self.current_url().await?;
        self.eval::<serde_json::Value>(format!("(() => {{ {script}; return {{}}; }})()"))
            .await?;

        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if self.current_url().await? != before {
                return self.settle().await;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(VerifyError::Session(format!("no {what} history entry")));
            }
        }
    }

    /// Wait for `document.readyState` to reach `complete`.
    async fn settle(&self) -> Result<(), VerifyError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            let reply: Reply<String> = self
                .eval("(() => ({ value: document.readyState }))()".to_string())
                .await?;
            if reply.value.as_deref() == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(VerifyError::Timeout {
                    what: "navigation settle".into(),
                    millis: millis(self.timeout),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn js_string(raw: &str) -> Result<String, VerifyError> {
    Ok(serde_json::to_string(raw)?)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Session for BrowserSession {
    type Element = BrowserElement;

    async fn navigate(&self, url: &str) -> Result<NavigationResponse, VerifyError> {
        let load = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| VerifyError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.settle().await
        };
        match tokio::time::timeout(self.timeout, load).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(VerifyError::Timeout {
                    what: format!("navigation to {url}"),
                    millis: millis(self.timeout),
                });
            }
        }

        let final_url = self.current_url().await?;
        let status = self.response_status().await;
        Ok(NavigationResponse::new(final_url, status))
    }

    async fn locate(&self, selector: &str) -> Result<Vec<BrowserElement>, VerifyError> {
        let count = self.count(selector).await?;
        Ok((0..count)
            .map(|index| BrowserElement {
                selector: selector.to_string(),
                index,
            })
            .collect())
    }

    async fn is_visible(&self, element: &BrowserElement) -> Result<bool, VerifyError> {
        let body = "(() => { const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
                    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; })()";
        Ok(self.query(element, body).await?.unwrap_or(false))
    }

    async fn text(&self, element: &BrowserElement) -> Result<String, VerifyError> {
        Ok(self
            .query(element, "el.textContent || ''")
            .await?
            .unwrap_or_default())
    }

    async fn computed_style(
        &self,
        element: &BrowserElement,
        property: &str,
    ) -> Result<String, VerifyError> {
        let body = format!("getComputedStyle(el).getPropertyValue({})", js_string(property)?);
        Ok(self.query(element, &body).await?.unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &BrowserElement,
        name: &str,
    ) -> Result<Option<String>, VerifyError> {
        let body = format!("el.getAttribute({})", js_string(name)?);
        self.query(element, &body).await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<Readiness, VerifyError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count(selector).await? > 0 {
                return Ok(Readiness::Ready);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(Readiness::TimedOut);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn current_url(&self) -> Result<String, VerifyError> {
        self.page
            .url()
            .await
            .map_err(|e| VerifyError::Session(format!("Failed to read URL: {e}")))?
            .ok_or_else(|| VerifyError::Session("no document loaded".into()))
    }

    async fn go_back(&self) -> Result<(), VerifyError> {
        self.traverse("history.back()", "previous").await
    }

    async fn go_forward(&self) -> Result<(), VerifyError> {
        self.traverse("history.forward()", "next").await
    }

    async fn reload(&self) -> Result<(), VerifyError> {
        self.page
            .reload()
            .await
            .map_err(|e| VerifyError::Session(format!("Reload failed: {e}")))?;
        self.settle().await
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "Failed to close tab");
        }
    }
}
