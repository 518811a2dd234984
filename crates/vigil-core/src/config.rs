use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use url::Url;

use crate::error::VerifyError;
use crate::wait::WaitPolicy;

/// How scenarios map onto sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// One fresh session per scenario; scenarios may run in parallel.
    #[default]
    Isolated,
    /// One session reused by every scenario, strictly one scenario at a time.
    Shared,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Isolated => "isolated",
            SessionMode::Shared => "shared",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "isolated" => Ok(SessionMode::Isolated),
            "shared" => Ok(SessionMode::Shared),
            _ => Err(format!("Unknown session mode: {}", s)),
        }
    }
}

/// Settings for one verification run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Site root every scenario path is resolved against.
    pub base_url: Url,
    /// Budget for element probes.
    pub wait: WaitPolicy,
    /// Budget for each navigation or history action.
    pub navigation_timeout: Duration,
    /// Scenarios in flight at once (isolated mode only).
    pub concurrency: usize,
    pub session_mode: SessionMode,
    /// Overall budget; when it expires the run is cancelled.
    pub run_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            wait: WaitPolicy::default(),
            navigation_timeout: Duration::from_secs(30),
            concurrency: 4,
            session_mode: SessionMode::Isolated,
            run_timeout: None,
        }
    }
}

static DEFAULT_BASE_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost:3000/").expect("default base URL is valid"));

fn default_base_url() -> Url {
    DEFAULT_BASE_URL.clone()
}

/// Upper bounds on the configurable budgets.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const MAX_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const MAX_RUN_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

impl RunConfig {
    /// Read configuration from environment variables.
    ///
    /// - `VIGIL_BASE_URL` (falls back to `BASE_URL`, then `http://localhost:3000`)
    /// - `VIGIL_PROBE_TIMEOUT_MS` (defaults to 5000)
    /// - `VIGIL_NAVIGATION_TIMEOUT_SECS` (defaults to 30)
    /// - `VIGIL_CONCURRENCY` (defaults to 4, must be at least 1)
    /// - `VIGIL_RUN_TIMEOUT_SECS` (optional, no overall timeout when unset)
    /// - `VIGIL_SESSION_MODE` (`isolated` or `shared`)
    pub fn from_env() -> Result<Self, VerifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RunConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VerifyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("VIGIL_BASE_URL").or_else(|| lookup("BASE_URL")) {
            config = config.with_base_url(&raw)?;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "VIGIL_PROBE_TIMEOUT_MS")? {
            let timeout = Duration::from_millis(ms);
            check_budget("VIGIL_PROBE_TIMEOUT_MS", &ms, timeout, Duration::ZERO, MAX_PROBE_TIMEOUT)?;
            config.wait = WaitPolicy::new(timeout).with_poll_interval(config.wait.poll_interval);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "VIGIL_NAVIGATION_TIMEOUT_SECS")? {
            let timeout = Duration::from_secs(secs);
            check_budget(
                "VIGIL_NAVIGATION_TIMEOUT_SECS",
                &secs,
                timeout,
                Duration::from_secs(1),
                MAX_NAVIGATION_TIMEOUT,
            )?;
            config.navigation_timeout = timeout;
        }
        if let Some(n) = parse_var::<usize>(&lookup, "VIGIL_CONCURRENCY")? {
            config = config.with_concurrency(n)?;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "VIGIL_RUN_TIMEOUT_SECS")? {
            let timeout = Duration::from_secs(secs);
            check_budget("VIGIL_RUN_TIMEOUT_SECS", &secs, timeout, Duration::from_secs(1), MAX_RUN_TIMEOUT)?;
            config.run_timeout = Some(timeout);
        }
        if let Some(raw) = lookup("VIGIL_SESSION_MODE") {
            config.session_mode = raw.parse().map_err(VerifyError::Config)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self, VerifyError> {
        let mut url = Url::parse(raw)
            .map_err(|e| VerifyError::Config(format!("Invalid base URL '{raw}': {e}")))?;
        if url.cannot_be_a_base() {
            return Err(VerifyError::Config(format!(
                "Base URL '{raw}' cannot have paths joined to it"
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, VerifyError> {
        if concurrency == 0 {
            return Err(VerifyError::Config("concurrency must be at least 1".into()));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Check budgets set through the builder methods against the same bounds
    /// [`RunConfig::from_env`] enforces.
    pub fn validate(&self) -> Result<(), VerifyError> {
        check_budget(
            "probe timeout",
            &format_args!("{:?}", self.wait.timeout),
            self.wait.timeout,
            Duration::ZERO,
            MAX_PROBE_TIMEOUT,
        )?;
        check_budget(
            "navigation timeout",
            &format_args!("{:?}", self.navigation_timeout),
            self.navigation_timeout,
            Duration::from_millis(1),
            MAX_NAVIGATION_TIMEOUT,
        )?;
        if let Some(limit) = self.run_timeout {
            check_budget(
                "run timeout",
                &format_args!("{limit:?}"),
                limit,
                Duration::from_millis(1),
                MAX_RUN_TIMEOUT,
            )?;
        }
        Ok(())
    }

    /// Resolve a site-relative path (or an absolute URL) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<String, VerifyError> {
        let relative = path.strip_prefix('/').unwrap_or(path);
        self.base_url
            .join(relative)
            .map(String::from)
            .map_err(|e| VerifyError::Config(format!("Cannot resolve '{path}': {e}")))
    }
}

fn check_budget(
    name: &str,
    raw: &dyn fmt::Display,
    value: Duration,
    min: Duration,
    max: Duration,
) -> Result<(), VerifyError> {
    if value < min || value > max {
        return Err(VerifyError::Config(format!(
            "Invalid {name} '{raw}': must be between {min:?} and {max:?}"
        )));
    }
    Ok(())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, VerifyError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            VerifyError::Config(format!(
                "Invalid {name} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.wait.timeout, Duration::from_secs(5));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.session_mode, SessionMode::Isolated);
        assert!(config.run_timeout.is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = RunConfig::from_lookup(lookup(&[
            ("VIGIL_BASE_URL", "https://docs.example.com/codegpt"),
            ("VIGIL_PROBE_TIMEOUT_MS", "250"),
            ("VIGIL_NAVIGATION_TIMEOUT_SECS", "10"),
            ("VIGIL_CONCURRENCY", "8"),
            ("VIGIL_RUN_TIMEOUT_SECS", "120"),
            ("VIGIL_SESSION_MODE", "Shared"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://docs.example.com/codegpt/");
        assert_eq!(config.wait.timeout, Duration::from_millis(250));
        assert_eq!(config.navigation_timeout, Duration::from_secs(10));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.run_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.session_mode, SessionMode::Shared);
    }

    #[test]
    fn test_base_url_fallback() {
        let config = RunConfig::from_lookup(lookup(&[("BASE_URL", "http://127.0.0.1:4000")])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:4000/");
    }

    #[test]
    fn test_rejects_invalid_values() {
        for vars in [
            [("VIGIL_CONCURRENCY", "0")],
            [("VIGIL_CONCURRENCY", "many")],
            [("VIGIL_PROBE_TIMEOUT_MS", "-5")],
            [("VIGIL_SESSION_MODE", "pooled")],
            [("VIGIL_BASE_URL", "not a url")],
        ] {
            let err = RunConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, VerifyError::Config(_)), "{vars:?}");
        }
    }

    #[test]
    fn test_rejects_out_of_range_budgets() {
        for vars in [
            [("VIGIL_NAVIGATION_TIMEOUT_SECS", "0")],
            [("VIGIL_NAVIGATION_TIMEOUT_SECS", "18446744073709551615")],
            [("VIGIL_PROBE_TIMEOUT_MS", "18446744073709551615")],
            [("VIGIL_RUN_TIMEOUT_SECS", "0")],
            [("VIGIL_RUN_TIMEOUT_SECS", "18446744073709551615")],
        ] {
            let err = RunConfig::from_lookup(lookup(&vars)).unwrap_err();
            let VerifyError::Config(message) = err else {
                panic!("expected config error for {vars:?}");
            };
            assert!(message.starts_with(&format!("Invalid {} '", vars[0].0)), "{message}");
            assert!(message.contains("must be between"), "{message}");
        }

        let at_limit = RunConfig::from_lookup(lookup(&[("VIGIL_NAVIGATION_TIMEOUT_SECS", "3600")]))
            .unwrap();
        assert_eq!(at_limit.navigation_timeout, MAX_NAVIGATION_TIMEOUT);
    }

    #[test]
    fn test_validate_checks_builder_budgets() {
        assert!(RunConfig::default().validate().is_ok());
        let huge = RunConfig::default().with_navigation_timeout(Duration::from_secs(u64::MAX));
        assert!(matches!(huge.validate(), Err(VerifyError::Config(_))));
        let zero_run = RunConfig::default().with_run_timeout(Duration::ZERO);
        assert!(zero_run.validate().is_err());
    }

    #[test]
    fn test_resolve_keeps_base_path() {
        let config = RunConfig::default()
            .with_base_url("https://docs.example.com/codegpt")
            .unwrap();
        assert_eq!(
            config.resolve("/es/docs/intro").unwrap(),
            "https://docs.example.com/codegpt/es/docs/intro"
        );
        assert_eq!(
            config.resolve("/docs/intro#setup").unwrap(),
            "https://docs.example.com/codegpt/docs/intro#setup"
        );
        assert_eq!(
            config.resolve("https://other.test/x").unwrap(),
            "https://other.test/x"
        );
    }
}
