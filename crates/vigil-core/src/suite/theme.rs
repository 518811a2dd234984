use super::{SuiteGroup, selectors as sel};
use crate::catalog::{SuiteConfig, ThemeConfig};
use crate::enumerate::{locale_targets, page_targets};
use crate::invariant::ElementInvariant;
use crate::locator::LocatorChain;
use crate::models::Target;
use crate::scenario::Scenario;

const GROUP: SuiteGroup = SuiteGroup::Theme;

fn theme_attribute(theme: &ThemeConfig) -> ElementInvariant {
    ElementInvariant::attribute_equals(&theme.attribute, &theme.expected)
}

fn code_blocks() -> LocatorChain {
    LocatorChain::css("pre code").or_css(".prism-code")
}

/// Theme attribute plus dark page background, for one target.
fn dark_page(target: Target, theme: &ThemeConfig) -> Scenario {
    Scenario::new(GROUP.as_str(), "dark by default", target)
        .visit()
        .expect("theme attribute", sel::ROOT, theme_attribute(theme))
        .expect(
            "body background is dark",
            sel::BODY,
            ElementInvariant::background_below(theme.page_background_max),
        )
}

pub(super) fn scenarios(config: &SuiteConfig) -> Vec<Scenario> {
    let theme = &config.theme;
    let entry = config.entry_path.as_str();

    let mut scenarios: Vec<Scenario> = locale_targets(config, entry)
        .into_iter()
        .chain(page_targets(&config.themed_pages))
        .map(|target| dark_page(target, theme))
        .collect();
    if config.locales.is_empty() {
        scenarios.insert(0, dark_page(Target::page(entry), theme));
    }

    scenarios.push(
        Scenario::new(GROUP.as_str(), "entry page colors", Target::page(entry))
            .visit()
            .await_selector(sel::ARTICLE)
            .expect(
                "article text is light",
                sel::ARTICLE,
                ElementInvariant::color_above(theme.text_min),
            )
            .expect(
                "article text contrasts with background",
                sel::ARTICLE,
                ElementInvariant::contrast(theme.contrast_threshold),
            )
            .expect(
                "navbar background is dark",
                sel::NAVBAR,
                ElementInvariant::background_below(theme.chrome_background_max),
            )
            .expect(
                "sidebar background is dark",
                sel::SIDEBAR,
                ElementInvariant::background_below(theme.chrome_background_max),
            )
            .expect(
                "footer background is dark",
                sel::FOOTER,
                ElementInvariant::background_below(theme.page_background_max),
            )
            .probe(
                "links are readable",
                sel::ARTICLE_LINKS,
                ElementInvariant::color_above(theme.link_min),
            ),
    );

    scenarios.push(
        Scenario::new(GROUP.as_str(), "code block styling", Target::page(&config.code_page))
            .visit()
            .probe(
                "code background is dark",
                code_blocks(),
                ElementInvariant::background_below(theme.chrome_background_max),
            )
            .probe(
                "code is highlighted",
                code_blocks(),
                ElementInvariant::AttributeNonEmpty("class".into()),
            ),
    );

    scenarios.push(
        Scenario::new(GROUP.as_str(), "no color mode switch", Target::page(entry))
            .visit()
            .expect(
                "switch absent",
                LocatorChain::css("button[class*=\"colorMode\"]")
                    .or_css("button[aria-label*=\"theme\" i]")
                    .or_css(".toggle_node_modules"),
                ElementInvariant::CountAtMost(0),
            ),
    );

    if let Some(next) = config.tutorial_pages.first() {
        scenarios.push(
            Scenario::new(GROUP.as_str(), "theme survives navigation", Target::page(entry))
                .visit()
                .expect("theme on entry page", sel::ROOT, theme_attribute(theme))
                .navigate(next)
                .expect("theme after navigation", sel::ROOT, theme_attribute(theme)),
        );
    }

    scenarios
}
