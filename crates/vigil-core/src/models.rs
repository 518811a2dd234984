use std::fmt;

use serde::{Deserialize, Serialize};

/// What a [`Target`] is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetKind {
    /// A plain documentation page.
    Page,
    /// A page rendered for one locale.
    Locale { code: String },
    /// A provider guide page.
    Provider { name: String },
}

/// One (locale/provider/page, path) combination to verify.
///
/// Targets are defined before a run starts and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    /// Site-relative path, e.g. `/es/docs/intro`.
    pub path: String,
    /// Literal fragments the page content is expected to contain.
    #[serde(default)]
    pub expected: Vec<String>,
    /// The site may legitimately not ship this page (unreleased locale, ...).
    #[serde(default)]
    pub optional: bool,
}

impl Target {
    pub fn page(path: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Page,
            path: path.into(),
            expected: Vec::new(),
            optional: false,
        }
    }

    pub fn locale(code: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Locale { code: code.into() },
            path: path.into(),
            expected: Vec::new(),
            optional: false,
        }
    }

    pub fn provider(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Provider { name: name.into() },
            path: path.into(),
            expected: Vec::new(),
            optional: false,
        }
    }

    /// Add a literal fragment the page is expected to contain.
    pub fn expecting(mut self, fragment: impl Into<String>) -> Self {
        self.expected.push(fragment.into());
        self
    }

    /// Mark the target as optional: an unavailable page is skipped, not failed.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Short human-readable label used in reports.
    pub fn label(&self) -> String {
        match &self.kind {
            TargetKind::Page => self.path.clone(),
            TargetKind::Locale { code } => format!("[{code}] {}", self.path),
            TargetKind::Provider { name } => format!("[{name}] {}", self.path),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Result of a navigation as reported by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationResponse {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status, when the session can observe it.
    pub status: Option<u16>,
}

impl NavigationResponse {
    pub fn new(url: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            url: url.into(),
            status,
        }
    }

    /// True for 2xx responses. An unknown status counts as ok.
    pub fn is_ok(&self) -> bool {
        self.status.is_none_or(|s| (200..300).contains(&s))
    }

    /// Status rendered for diagnostics.
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("HTTP {code}"),
            None => "unknown status".to_string(),
        }
    }
}

/// Outcome of a session-side `wait_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_labels() {
        assert_eq!(Target::page("/docs/intro").label(), "/docs/intro");
        assert_eq!(
            Target::locale("es", "/es/docs/intro").label(),
            "[es] /es/docs/intro"
        );
        assert_eq!(
            Target::provider("OpenAI", "/docs/tutorial-ai-providers/openai").to_string(),
            "[OpenAI] /docs/tutorial-ai-providers/openai"
        );
    }

    #[test]
    fn test_target_builders() {
        let target = Target::provider("Google Studio", "/p/google")
            .expecting("google")
            .optional();
        assert_eq!(target.expected, vec!["google".to_string()]);
        assert!(target.optional);
    }

    #[test]
    fn test_navigation_response_ok() {
        assert!(NavigationResponse::new("/", Some(200)).is_ok());
        assert!(NavigationResponse::new("/", Some(204)).is_ok());
        assert!(NavigationResponse::new("/", None).is_ok());
        assert!(!NavigationResponse::new("/", Some(404)).is_ok());
        assert!(!NavigationResponse::new("/", Some(301)).is_ok());
        assert_eq!(
            NavigationResponse::new("/", Some(404)).status_text(),
            "HTTP 404"
        );
    }

    #[test]
    fn test_target_kind_serializes_tagged() {
        let json = serde_json::to_value(Target::locale("pt", "/pt/docs/intro")).unwrap();
        assert_eq!(json["kind"]["kind"], "locale");
        assert_eq!(json["kind"]["code"], "pt");
    }
}
