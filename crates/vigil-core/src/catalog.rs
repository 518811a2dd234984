//! Static configuration table of the documentation site under test.
//!
//! Defaults describe the CodeGPT documentation site. Every field can be
//! overridden from a JSON file; missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub code: String,
    pub label: String,
    /// The site may not ship this locale.
    #[serde(default)]
    pub optional: bool,
}

impl Locale {
    pub fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Display name, e.g. `Google Studio`.
    pub name: String,
    /// Last path segment of the guide, e.g. `google_studio`.
    pub slug: String,
    #[serde(default)]
    pub optional: bool,
}

impl Provider {
    pub fn new(name: &str, slug: &str) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// First word of the name, case-folded; what the guide must mention.
    pub fn keyword(&self) -> String {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or(&self.name)
            .to_lowercase()
    }
}

/// Expected dark-theme rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Root attribute carrying the active theme.
    pub attribute: String,
    pub expected: String,
    /// Body and footer backgrounds average below this.
    pub page_background_max: f64,
    /// Navbar, sidebar and code block backgrounds average below this.
    pub chrome_background_max: f64,
    /// Article text averages above this.
    pub text_min: f64,
    /// Article links average above this.
    pub link_min: f64,
    /// Minimum averaged-channel gap between article text and background.
    pub contrast_threshold: f64,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            attribute: "data-theme".into(),
            expected: "dark".into(),
            page_background_max: 100.0,
            chrome_background_max: 150.0,
            text_min: 150.0,
            link_min: 50.0,
            contrast_threshold: 100.0,
        }
    }
}

/// Everything the built-in suite enumerates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub site_title: String,
    /// Page the site root redirects to.
    pub entry_path: String,
    /// Locale served without a path prefix.
    pub default_locale: String,
    pub locales: Vec<Locale>,
    /// Path prefix of the provider guides.
    pub provider_base: String,
    pub providers: Vec<Provider>,
    pub tutorial_pages: Vec<String>,
    /// Pages whose theme is checked beyond the entry page.
    pub themed_pages: Vec<String>,
    /// A page known to carry code blocks.
    pub code_page: String,
    pub navbar_links: Vec<String>,
    /// A path the site does not serve.
    pub missing_path: String,
    /// Heading id on the entry page used for the deep-link check; empty skips it.
    pub section_anchor: String,
    pub min_sidebar_links: usize,
    pub min_article_chars: usize,
    pub theme: ThemeConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            site_title: "CodeGPT".into(),
            entry_path: "/docs/intro".into(),
            default_locale: "en".into(),
            locales: vec![
                Locale::new("en", "English"),
                Locale::new("es", "Español"),
                Locale::new("pt", "Português"),
                Locale::new("zh-Hans", "中文"),
                Locale::new("fr", "French").optional(),
                Locale::new("ko", "Korean").optional(),
            ],
            provider_base: "/docs/tutorial-ai-providers".into(),
            providers: vec![
                Provider::new("OpenAI", "openai"),
                Provider::new("Anthropic", "anthropic"),
                Provider::new("Google Studio", "google_studio"),
                Provider::new("Azure", "microsoft-azure"),
                Provider::new("Mistral", "mistral"),
                Provider::new("Ollama", "ollama"),
                Provider::new("Cohere", "cohere"),
                Provider::new("Bedrock", "bedrock"),
                Provider::new("Docker", "docker").optional(),
                Provider::new("LM Studio", "lmstudio").optional(),
                Provider::new("Custom", "custom").optional(),
            ],
            tutorial_pages: vec![
                "/docs/tutorial-basics/installation".into(),
                "/docs/tutorial-basics/configuration".into(),
                "/docs/tutorial-basics/troubleshooting".into(),
                "/docs/tutorial-features/chat_code_gpt".into(),
                "/docs/tutorial-features/code_autocompletion".into(),
                "/docs/tutorial-features/code_documentation".into(),
            ],
            themed_pages: vec![
                "/docs/tutorial-basics/installation".into(),
                "/docs/tutorial-ai-providers/openai".into(),
                "/docs/tutorial-features/chat_code_gpt".into(),
            ],
            code_page: "/docs/tutorial-features/code_autocompletion".into(),
            navbar_links: vec![
                "Tutorial".into(),
                "Extension".into(),
                "Discord".into(),
                "Login".into(),
            ],
            missing_path: "/docs/nonexistent-page-12345".into(),
            section_anchor: "getting-started".into(),
            min_sidebar_links: 6,
            min_article_chars: 100,
            theme: ThemeConfig::default(),
        }
    }
}

impl SuiteConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, VerifyError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VerifyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String, VerifyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), VerifyError> {
        let paths = [
            ("entry_path", &self.entry_path),
            ("missing_path", &self.missing_path),
            ("code_page", &self.code_page),
        ];
        for (field, path) in paths {
            if !path.starts_with('/') {
                return Err(VerifyError::Config(format!(
                    "{field} '{path}' must start with '/'"
                )));
            }
        }
        if let Some(p) = self
            .tutorial_pages
            .iter()
            .chain(&self.themed_pages)
            .find(|p| !p.starts_with('/'))
        {
            return Err(VerifyError::Config(format!("page '{p}' must start with '/'")));
        }
        if self.section_anchor.starts_with('#') || self.section_anchor.contains(char::is_whitespace) {
            return Err(VerifyError::Config(format!(
                "section_anchor '{}' must be a bare heading id",
                self.section_anchor
            )));
        }
        if let Some(p) = self.providers.iter().find(|p| p.slug.trim().is_empty()) {
            return Err(VerifyError::Config(format!(
                "provider '{}' has an empty slug",
                p.name
            )));
        }
        Ok(())
    }
}
