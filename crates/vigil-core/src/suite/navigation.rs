use super::{SuiteGroup, navbar_link, selectors as sel};
use crate::catalog::SuiteConfig;
use crate::enumerate::page_targets;
use crate::invariant::{ElementInvariant, LocationInvariant, Pattern, ResponseInvariant};
use crate::locator::LocatorChain;
use crate::models::Target;
use crate::scenario::{NavigationPolicy, Scenario};

const GROUP: SuiteGroup = SuiteGroup::Navigation;

/// Statuses a missing page may answer with: the 404 page, or the SPA shell.
const MISSING_PAGE_STATUSES: [u16; 2] = [200, 404];

fn scenario(name: &str, target: Target) -> Scenario {
    Scenario::new(GROUP.as_str(), name, target)
}

fn at(path: &str) -> Target {
    Target::page(path)
}

pub(super) fn scenarios(config: &SuiteConfig) -> Vec<Scenario> {
    let entry = config.entry_path.as_str();
    let mut scenarios: Vec<Scenario> = page_targets(&config.tutorial_pages)
        .into_iter()
        .map(|target| {
            scenario("tutorial page", target.optional())
                .visit()
                .expect("article visible", sel::ARTICLE, ElementInvariant::Visible)
                .expect(
                    "article not empty",
                    sel::ARTICLE,
                    ElementInvariant::TextLongerThan(50),
                )
        })
        .collect();

    scenarios.push(
        scenario("search control", at(entry))
            .visit()
            .await_selector(sel::NAVBAR)
            .probe(
                "search visible",
                LocatorChain::css("button.DocSearch")
                    .or_css("button[aria-label*=\"search\" i]")
                    .or_css(".navbar__search")
                    .or_css("input[type=\"search\"]")
                    .or_css("input[placeholder*=\"search\" i]"),
                ElementInvariant::Visible,
            ),
    );

    scenarios.push(
        scenario("missing page", at(&config.missing_path))
            .navigate_with(&config.missing_path, NavigationPolicy::AcceptAnyStatus)
            .expect_response(
                "answers 200 or 404",
                ResponseInvariant::StatusIn(MISSING_PAGE_STATUSES.to_vec()),
            ),
    );

    scenarios.push(
        scenario("history", at(entry))
            .visit()
            .await_selector(sel::SIDEBAR)
            .follow(".menu a[href^=\"/\"]")
            .expect("linked page loads", sel::ARTICLE, ElementInvariant::Visible)
            .go_back()
            .expect_location(
                "back on entry page",
                LocationInvariant::Matches(Pattern::contains(entry)),
            )
            .go_forward()
            .expect(
                "forward page loads",
                sel::ARTICLE,
                ElementInvariant::Visible,
            )
            .reload()
            .expect(
                "reloaded page loads",
                sel::ARTICLE,
                ElementInvariant::Visible,
            ),
    );

    if let Some(deep) = config.tutorial_pages.first() {
        scenarios.push(
            scenario("deep link", at(deep))
                .visit()
                .expect_location(
                    "url kept",
                    LocationInvariant::Matches(Pattern::contains(deep.as_str())),
                )
                .expect("sidebar rendered", sel::SIDEBAR, ElementInvariant::Visible)
                .probe(
                    "breadcrumbs visible",
                    LocatorChain::css(".breadcrumbs").or_css("nav[aria-label=\"breadcrumbs\"]"),
                    ElementInvariant::Visible,
                ),
        );
    }

    scenarios.push(
        scenario("pagination", at(entry))
            .visit()
            .probe(
                "pagination visible",
                LocatorChain::css(".pagination-nav").or_css("nav.pagination"),
                ElementInvariant::Visible,
            )
            .follow(LocatorChain::css(".pagination-nav a").or_css("nav.pagination a"))
            .expect("next page loads", sel::ARTICLE, ElementInvariant::Visible),
    );

    scenarios.push(
        scenario("table of contents", at(entry))
            .visit()
            .probe(
                "toc has links",
                LocatorChain::css(".table-of-contents a")
                    .or_css(".toc a")
                    .or_css("aside.tocCollapsible a"),
                ElementInvariant::CountAtLeast(1),
            )
            .probe(
                "toc visible",
                LocatorChain::css(".table-of-contents")
                    .or_css(".toc")
                    .or_css("aside.tocCollapsible"),
                ElementInvariant::Visible,
            )
            .follow(
                LocatorChain::css(".table-of-contents a[href^=\"#\"]")
                    .or_css(".toc a[href^=\"#\"]")
                    .or_css("aside.tocCollapsible a[href^=\"#\"]"),
            )
            .expect_location(
                "toc anchor in url",
                LocationInvariant::Matches(Pattern::contains("#")),
            ),
    );

    if !config.section_anchor.is_empty() {
        let fragment = format!("#{}", config.section_anchor);
        scenarios.push(
            scenario("section deep link", at(&format!("{entry}{fragment}")))
                .visit()
                .expect_location(
                    "stays on entry page",
                    LocationInvariant::Matches(Pattern::contains(entry)),
                )
                .expect_location(
                    "keeps the fragment",
                    LocationInvariant::Matches(Pattern::contains(fragment)),
                ),
        );
    }

    scenarios.push(
        scenario("active sidebar item", at(entry))
            .visit()
            .await_selector(sel::SIDEBAR)
            .probe(
                "active item visible",
                LocatorChain::css(".menu__link--active").or_css(".menu__list-item--active"),
                ElementInvariant::Visible,
            ),
    );

    let community = LocatorChain::css("a[href*=\"discord\"]").or_css("a[href*=\"github.com\"]");
    scenarios.push(
        scenario("external links", at(entry))
            .visit()
            .probe(
                "opens in new tab",
                community.clone(),
                ElementInvariant::attribute_equals("target", "_blank"),
            )
            .probe(
                "rel has noopener",
                community,
                ElementInvariant::AttributeMatches {
                    name: "rel".into(),
                    pattern: Pattern::contains("noopener"),
                },
            ),
    );

    scenarios.push(
        scenario("footer link", at(entry))
            .visit()
            .follow(LocatorChain::css("footer a[href^=\"/\"]"))
            .expect_response(
                "footer link resolves",
                ResponseInvariant::StatusIn(vec![200]),
            )
            .expect("footer on linked page", sel::FOOTER, ElementInvariant::Visible),
    );

    if let Some(first) = config.navbar_links.first() {
        scenarios.push(
            scenario("navbar link", at(entry))
                .visit()
                .follow(navbar_link(first))
                .expect_location(
                    "lands in docs",
                    LocationInvariant::Matches(Pattern::contains("/docs/")),
                )
                .expect("article visible", sel::ARTICLE, ElementInvariant::Visible),
        );
    }

    scenarios
}
