//! Built-in scenario suite for a Docusaurus-style documentation site.

mod homepage;
mod i18n;
mod navigation;
mod providers;
mod theme;

use std::fmt;
use std::str::FromStr;

use crate::catalog::SuiteConfig;
use crate::error::VerifyError;
use crate::locator::{Locator, LocatorChain};
use crate::scenario::Scenario;

/// Selectors shared across groups.
pub(crate) mod selectors {
    pub const ARTICLE: &str = "article";
    pub const ARTICLE_PARAGRAPHS: &str = "article p";
    pub const ARTICLE_LINKS: &str = "article a";
    pub const HEADING: &str = "article h1, article h2";
    pub const NAVBAR: &str = "nav.navbar";
    pub const NAVBAR_LINKS: &str = "nav.navbar a";
    pub const SIDEBAR: &str = ".menu";
    pub const SIDEBAR_LINKS: &str = ".menu a";
    pub const FOOTER: &str = "footer";
    pub const ROOT: &str = "html";
    pub const BODY: &str = "body";
    pub const TITLE: &str = "title";
}

/// Navbar anchor whose text contains `label`.
pub(crate) fn navbar_link(label: &str) -> LocatorChain {
    Locator::css(selectors::NAVBAR_LINKS).with_text(label).into()
}

/// A named group of scenarios, selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteGroup {
    Homepage,
    Localization,
    Providers,
    Theme,
    Navigation,
}

impl SuiteGroup {
    pub const ALL: [SuiteGroup; 5] = [
        SuiteGroup::Homepage,
        SuiteGroup::Localization,
        SuiteGroup::Providers,
        SuiteGroup::Theme,
        SuiteGroup::Navigation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteGroup::Homepage => "homepage",
            SuiteGroup::Localization => "localization",
            SuiteGroup::Providers => "providers",
            SuiteGroup::Theme => "theme",
            SuiteGroup::Navigation => "navigation",
        }
    }

    pub fn scenarios(&self, config: &SuiteConfig) -> Result<Vec<Scenario>, VerifyError> {
        match self {
            SuiteGroup::Homepage => Ok(homepage::scenarios(config)),
            SuiteGroup::Localization => i18n::scenarios(config),
            SuiteGroup::Providers => providers::scenarios(config),
            SuiteGroup::Theme => Ok(theme::scenarios(config)),
            SuiteGroup::Navigation => Ok(navigation::scenarios(config)),
        }
    }
}

impl fmt::Display for SuiteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SuiteGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "homepage" => Ok(SuiteGroup::Homepage),
            "localization" | "i18n" => Ok(SuiteGroup::Localization),
            "providers" => Ok(SuiteGroup::Providers),
            "theme" => Ok(SuiteGroup::Theme),
            "navigation" => Ok(SuiteGroup::Navigation),
            _ => Err(format!("Unknown suite group: {}", s)),
        }
    }
}

/// Scenarios of the selected groups, in group order. No groups selects all.
pub fn build_suite(
    config: &SuiteConfig,
    groups: &[SuiteGroup],
) -> Result<Vec<Scenario>, VerifyError> {
    let groups = if groups.is_empty() {
        &SuiteGroup::ALL[..]
    } else {
        groups
    };

    let mut scenarios = Vec::new();
    for group in SuiteGroup::ALL.iter().filter(|g| groups.contains(g)) {
        scenarios.extend(group.scenarios(config)?);
    }
    Ok(scenarios)
}
