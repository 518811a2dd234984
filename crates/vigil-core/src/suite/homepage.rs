use super::{SuiteGroup, navbar_link, selectors as sel};
use crate::catalog::SuiteConfig;
use crate::invariant::{ElementInvariant, LocationInvariant, MatchMode, Pattern};
use crate::locator::LocatorChain;
use crate::models::Target;
use crate::scenario::Scenario;

fn scenario(name: &str, path: &str) -> Scenario {
    Scenario::new(SuiteGroup::Homepage.as_str(), name, Target::page(path)).visit()
}

pub(super) fn scenarios(config: &SuiteConfig) -> Vec<Scenario> {
    let entry = config.entry_path.as_str();

    let redirect = scenario("root redirects to entry page", "/")
        .expect_location(
            "lands on entry page",
            LocationInvariant::Matches(Pattern::contains(entry)),
        )
        .expect(
            "title names the site",
            sel::TITLE,
            ElementInvariant::contains(&config.site_title),
        );

    let mut navbar = scenario("main navigation", entry).expect(
        "navbar visible",
        sel::NAVBAR,
        ElementInvariant::Visible,
    );
    for label in &config.navbar_links {
        navbar = navbar.expect(
            format!("navbar link {label}"),
            navbar_link(label),
            ElementInvariant::Visible,
        );
    }

    let content = scenario("intro content", entry)
        .await_selector(sel::ARTICLE)
        .expect("article visible", sel::ARTICLE, ElementInvariant::Visible)
        .expect("heading visible", sel::HEADING, ElementInvariant::Visible)
        .expect(
            "article has substance",
            sel::ARTICLE,
            ElementInvariant::TextLongerThan(config.min_article_chars),
        )
        .expect(
            "article has paragraphs",
            sel::ARTICLE_PARAGRAPHS,
            ElementInvariant::CountAtLeast(1),
        );

    let sidebar = scenario("sidebar navigation", entry)
        .await_selector(sel::SIDEBAR)
        .expect("sidebar visible", sel::SIDEBAR, ElementInvariant::Visible)
        .expect(
            "sidebar links",
            sel::SIDEBAR_LINKS,
            ElementInvariant::CountAtLeast(config.min_sidebar_links),
        );

    let footer = scenario("footer", entry)
        .expect("footer visible", sel::FOOTER, ElementInvariant::Visible)
        .expect(
            "footer sections",
            sel::FOOTER,
            ElementInvariant::TextContains {
                needles: vec!["docs".into(), "community".into(), "copyright".into()],
                mode: MatchMode::All,
            },
        );

    let logo_image = LocatorChain::css("a.navbar__brand img").or_css(".navbar__logo img");
    let logo = scenario("logo", entry)
        .expect("logo link visible", "a.navbar__brand", ElementInvariant::Visible)
        .expect("logo image visible", logo_image.clone(), ElementInvariant::Visible)
        .expect(
            "logo alt text",
            logo_image,
            ElementInvariant::attribute_equals("alt", &config.site_title),
        );

    let meta = scenario("meta tags", entry)
        .expect(
            "meta description present",
            "meta[name=\"description\"]",
            ElementInvariant::CountAtLeast(1),
        )
        .expect(
            "single meta description",
            "meta[name=\"description\"]",
            ElementInvariant::CountAtMost(1),
        )
        .probe(
            "og:title has content",
            "meta[property=\"og:title\"]",
            ElementInvariant::AttributeNonEmpty("content".into()),
        );

    let mobile = scenario("mobile navigation toggle", entry).expect(
        "navbar toggle present",
        LocatorChain::css(".navbar__toggle").or_css("button[aria-label*=\"navigation bar\" i]"),
        ElementInvariant::CountAtLeast(1),
    );

    vec![redirect, navbar, content, sidebar, footer, logo, meta, mobile]
}
