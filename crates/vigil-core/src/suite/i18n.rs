use super::{SuiteGroup, selectors as sel};
use crate::catalog::{Locale, SuiteConfig};
use crate::enumerate::{locale_path, locale_targets};
use crate::error::VerifyError;
use crate::invariant::{ElementInvariant, LocationInvariant, Pattern};
use crate::locator::{Locator, LocatorChain};
use crate::models::{Target, TargetKind};
use crate::scenario::Scenario;

const GROUP: SuiteGroup = SuiteGroup::Localization;
const HREFLANG_ALTERNATES: &str = "link[rel=\"alternate\"][hreflang]";

/// Matches any non-default locale prefix; `None` when there are none.
fn foreign_prefixes(config: &SuiteConfig) -> Result<Option<Pattern>, VerifyError> {
    let codes: Vec<String> = config
        .locales
        .iter()
        .filter(|l| l.code != config.default_locale)
        .map(|l| regex::escape(&l.code))
        .collect();
    if codes.is_empty() {
        return Ok(None);
    }
    Pattern::regex(&format!("/({})/", codes.join("|"))).map(Some)
}

fn location_check(
    scenario: Scenario,
    config: &SuiteConfig,
    code: &str,
    foreign: Option<&Pattern>,
) -> Scenario {
    if code == config.default_locale {
        match foreign {
            Some(pattern) => scenario.expect_location(
                "no locale prefix",
                LocationInvariant::Excludes(pattern.clone()),
            ),
            None => scenario,
        }
    } else {
        scenario.expect_location(
            format!("url carries /{code}/"),
            LocationInvariant::Matches(Pattern::contains(format!("/{code}/"))),
        )
    }
}

pub(super) fn scenarios(config: &SuiteConfig) -> Result<Vec<Scenario>, VerifyError> {
    let entry = config.entry_path.as_str();
    let foreign = foreign_prefixes(config)?;
    let mut scenarios = Vec::new();

    for target in locale_targets(config, entry) {
        let TargetKind::Locale { code } = target.kind.clone() else {
            continue;
        };
        let scenario = Scenario::new(GROUP.as_str(), "localized entry page", target).visit();
        let scenario = location_check(scenario, config, &code, foreign.as_ref())
            .expect(
                "title names the site",
                sel::TITLE,
                ElementInvariant::contains(&config.site_title),
            )
            .expect("article visible", sel::ARTICLE, ElementInvariant::Visible)
            .expect(
                "navbar has links",
                sel::NAVBAR_LINKS,
                ElementInvariant::CountAtLeast(1),
            )
            .probe(
                "hreflang alternates",
                HREFLANG_ALTERNATES,
                ElementInvariant::AttributeNonEmpty("href".into()),
            )
            .await_selector(sel::SIDEBAR)
            .expect(
                "sidebar links",
                sel::SIDEBAR_LINKS,
                ElementInvariant::CountAtLeast(config.min_sidebar_links),
            );
        scenarios.push(scenario);
    }

    scenarios.push(
        Scenario::new(GROUP.as_str(), "language dropdown", Target::page(entry))
            .visit()
            .await_selector(sel::NAVBAR)
            .probe(
                "locale selector visible",
                Locator::css(".navbar__item.dropdown")
                    .matching(r"(?i)\ben\b|english")
                    .map(LocatorChain::new)?
                    .or_css("a[href*=\"/es/\"], a[href*=\"/pt/\"]"),
                ElementInvariant::Visible,
            ),
    );

    let required: Vec<&Locale> = config
        .locales
        .iter()
        .filter(|l| !l.optional && l.code != config.default_locale)
        .collect();

    if let Some(first) = required.first() {
        let path = locale_path(config, first, entry);
        let scenario = Scenario::new(
            GROUP.as_str(),
            "locale preserved across pages",
            Target::locale(&first.code, &path),
        )
        .visit()
        .follow(LocatorChain::css("article a[href*=\"installation\"]").or_css(".menu a[href*=\"installation\"]"));
        scenarios.push(location_check(scenario, config, &first.code, foreign.as_ref()));
    }

    if !required.is_empty() {
        let mut switching = Scenario::new(GROUP.as_str(), "direct url switching", Target::page(entry))
            .visit();
        switching = location_check(switching, config, &config.default_locale, foreign.as_ref());
        for locale in required.iter().take(2) {
            switching = switching.navigate(locale_path(config, locale, entry));
            switching = location_check(switching, config, &locale.code, foreign.as_ref());
        }
        switching = switching.navigate(entry);
        switching = location_check(switching, config, &config.default_locale, foreign.as_ref());
        scenarios.push(switching);
    }

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_prefix_pattern() {
        let pattern = foreign_prefixes(&SuiteConfig::default()).unwrap().unwrap();
        assert!(pattern.is_match("http://localhost:3000/zh-Hans/docs/intro"));
        assert!(pattern.is_match("http://localhost:3000/es/docs/intro"));
        assert!(!pattern.is_match("http://localhost:3000/docs/intro"));
    }

    #[test]
    fn test_one_entry_scenario_per_locale() {
        let suite = scenarios(&SuiteConfig::default()).unwrap();
        let entries: Vec<_> = suite
            .iter()
            .filter(|s| s.name == "localized entry page")
            .map(|s| s.target.path.as_str())
            .collect();
        assert_eq!(entries.len(), 6);
        assert!(entries.contains(&"/es/docs/intro"));
    }

    #[test]
    fn test_locale_pages_probe_hreflang_alternates() {
        let suite = scenarios(&SuiteConfig::default()).unwrap();
        for entry in suite.iter().filter(|s| s.name == "localized entry page") {
            let alternates = entry
                .checks()
                .find(|c| c.label == "hreflang alternates")
                .unwrap();
            assert!(matches!(
                alternates.spec,
                crate::scenario::CheckSpec::Element {
                    presence: crate::scenario::Presence::Optional,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_default_locale_only_has_no_switching() {
        let config = SuiteConfig {
            locales: vec![Locale::new("en", "English")],
            ..SuiteConfig::default()
        };
        let suite = scenarios(&config).unwrap();
        assert!(suite.iter().all(|s| s.name != "direct url switching"));
        let entry = suite
            .iter()
            .find(|s| s.name == "localized entry page")
            .unwrap();
        assert!(entry.checks().all(|c| c.label != "no locale prefix"));
    }
}
