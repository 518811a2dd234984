use super::{SuiteGroup, selectors as sel};
use crate::catalog::SuiteConfig;
use crate::enumerate::provider_targets;
use crate::error::VerifyError;
use crate::invariant::{ElementInvariant, LocationInvariant, MatchMode, Pattern};
use crate::locator::{Locator, LocatorChain};
use crate::models::Target;
use crate::scenario::Scenario;

const GROUP: SuiteGroup = SuiteGroup::Providers;
const HEADINGS: &str = "article h1, article h2, article h3";

pub(super) fn scenarios(config: &SuiteConfig) -> Result<Vec<Scenario>, VerifyError> {
    let targets = provider_targets(config);
    let mut scenarios = Vec::with_capacity(targets.len() + 4);

    for target in &targets {
        let slug = target
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&target.path)
            .to_string();
        let expected = target.expected.clone();
        let scenario = Scenario::new(GROUP.as_str(), "provider guide", target.clone())
            .visit()
            .expect_location(
                "url names the guide",
                LocationInvariant::Matches(Pattern::contains(slug)),
            )
            .expect("article visible", sel::ARTICLE, ElementInvariant::Visible)
            .expect(
                "guide has substance",
                sel::ARTICLE,
                ElementInvariant::TextLongerThan(config.min_article_chars),
            )
            .expect(
                "guide mentions provider",
                sel::ARTICLE,
                ElementInvariant::TextContains {
                    needles: expected,
                    mode: MatchMode::All,
                },
            )
            .expect("heading visible", HEADINGS, ElementInvariant::Visible)
            .probe(
                "guide has paragraphs",
                sel::ARTICLE_PARAGRAPHS,
                ElementInvariant::CountAtLeast(1),
            );
        scenarios.push(scenario);
    }

    let required: Vec<&Target> = targets.iter().filter(|t| !t.optional).collect();

    if let Some(first) = required.first() {
        scenarios.push(
            Scenario::new(GROUP.as_str(), "api key instructions", (*first).clone())
                .visit()
                .expect(
                    "mentions credentials",
                    sel::ARTICLE,
                    ElementInvariant::contains_any(["api", "key", "token", "config"]),
                ),
        );
        scenarios.push(
            Scenario::new(GROUP.as_str(), "guide references", (*first).clone())
                .visit()
                .probe("screenshots visible", "article img", ElementInvariant::Visible)
                .probe(
                    "links to provider docs",
                    "article a[href^=\"http\"]",
                    ElementInvariant::CountAtLeast(1),
                ),
        );
    }

    let mut section = Locator::css(sel::SIDEBAR_LINKS)
        .matching(r"(?i)ai.*provider")
        .map(LocatorChain::new)?;
    for provider in config.providers.iter().filter(|p| !p.optional).take(2) {
        section = section.or_css(format!("a[href*=\"{}\"]", provider.slug));
    }
    scenarios.push(
        Scenario::new(GROUP.as_str(), "providers in sidebar", Target::page(&config.entry_path))
            .visit()
            .await_selector(sel::SIDEBAR)
            .expect("providers section", section, ElementInvariant::Visible),
    );

    if let [from, to, ..] = required.as_slice() {
        let to_slug = to.path.rsplit('/').next().unwrap_or(&to.path);
        scenarios.push(
            Scenario::new(GROUP.as_str(), "sidebar between guides", (*from).clone())
                .visit()
                .await_selector(sel::SIDEBAR)
                .follow(format!(".menu a[href*=\"{to_slug}\"]").as_str())
                .expect_location(
                    "arrived at next guide",
                    LocationInvariant::Matches(Pattern::contains(to_slug)),
                )
                .expect("article visible", sel::ARTICLE, ElementInvariant::Visible),
        );
    }

    Ok(scenarios)
}
