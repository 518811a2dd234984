use vigil_core::testutil::{FakeElement, FakePage};
use vigil_core::{
    LocationInvariant, OutcomeStatus, Pattern, Scenario, SuiteGroup, Target, TargetKind,
};

use crate::common::{INTRO, docs_page, docs_page_with_sidebar, docs_site, run, scenarios_named};

#[tokio::test]
async fn intro_sidebar_has_more_than_five_links() {
    let scenarios = scenarios_named(SuiteGroup::Homepage, "sidebar navigation");
    assert_eq!(scenarios.len(), 1);

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    let links = report
        .outcomes
        .iter()
        .find(|o| o.check == "sidebar links")
        .unwrap();
    assert_eq!(links.status, OutcomeStatus::Passed);
}

#[tokio::test]
async fn intro_sidebar_with_five_links_fails() {
    let site = docs_site().page("/docs/intro", docs_page_with_sidebar("dark", INTRO, 5));
    let scenarios = scenarios_named(SuiteGroup::Homepage, "sidebar navigation");

    let report = run(site, &scenarios).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].check, "sidebar links");
    assert!(failures[0].message.contains('5'));
}

#[tokio::test]
async fn spanish_entry_page_is_dark() {
    let scenarios: Vec<_> = scenarios_named(SuiteGroup::Theme, "dark by default")
        .into_iter()
        .filter(|s| s.target.path == "/es/docs/intro")
        .collect();
    assert_eq!(scenarios.len(), 1);

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    let theme = report
        .outcomes_for("[es] /es/docs/intro")
        .find(|o| o.check == "theme attribute")
        .unwrap();
    assert_eq!(theme.status, OutcomeStatus::Passed);
}

#[tokio::test]
async fn theme_holds_for_every_available_locale() {
    let scenarios: Vec<_> = scenarios_named(SuiteGroup::Theme, "dark by default")
        .into_iter()
        .filter(|s| matches!(s.target.kind, TargetKind::Locale { .. }))
        .collect();
    assert_eq!(scenarios.len(), 6);

    let report = run(docs_site(), &scenarios).await;

    assert_eq!(report.summary().failed, 0, "{:?}", report.outcomes);
    for target in ["[en] /docs/intro", "[pt] /pt/docs/intro", "[zh-Hans] /zh-Hans/docs/intro"] {
        assert!(
            report
                .outcomes_for(target)
                .all(|o| o.status == OutcomeStatus::Passed),
            "{target}"
        );
    }
    // fr and ko are optional and not served: skipped, not failed
    let french: Vec<_> = report.outcomes_for("[fr] /fr/docs/intro").collect();
    assert!(!french.is_empty());
    assert!(french.iter().all(|o| o.status == OutcomeStatus::Skipped));
}

#[tokio::test]
async fn light_translation_fails_only_its_target() {
    let site = docs_site().page("/pt/docs/intro", docs_page("light", INTRO));
    let scenarios: Vec<_> = scenarios_named(SuiteGroup::Theme, "dark by default")
        .into_iter()
        .filter(|s| matches!(s.target.kind, TargetKind::Locale { .. }))
        .collect();

    let report = run(site, &scenarios).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].target, "[pt] /pt/docs/intro");
    assert!(failures[0].message.contains("light"));
}

#[tokio::test]
async fn openai_guide_mentions_provider() {
    let scenarios: Vec<_> = scenarios_named(SuiteGroup::Providers, "provider guide")
        .into_iter()
        .filter(|s| s.target.path == "/docs/tutorial-ai-providers/openai")
        .collect();
    assert_eq!(scenarios.len(), 1);

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert!(
        report
            .outcomes
            .iter()
            .any(|o| o.check == "guide mentions provider" && o.status == OutcomeStatus::Passed)
    );
}

#[tokio::test]
async fn guide_without_provider_name_fails() {
    let site = docs_site().page(
        "/docs/tutorial-ai-providers/openai",
        docs_page(
            "dark",
            "This guide was moved. Follow the link in the sidebar to read the new \
             version of the setup instructions for your preferred model vendor.",
        ),
    );
    let scenarios: Vec<_> = scenarios_named(SuiteGroup::Providers, "provider guide")
        .into_iter()
        .filter(|s| s.target.path.ends_with("/openai"))
        .collect();

    let report = run(site, &scenarios).await;

    let failed: Vec<_> = report.failures().map(|o| o.check.as_str()).collect();
    assert_eq!(failed, ["guide mentions provider"]);
}

#[tokio::test]
async fn missing_page_answering_404_passes() {
    let scenarios = scenarios_named(SuiteGroup::Navigation, "missing page");

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 1);
}

#[tokio::test]
async fn missing_page_served_by_app_shell_passes() {
    let site = docs_site().page("/docs/nonexistent-page-12345", FakePage::ok());
    let scenarios = scenarios_named(SuiteGroup::Navigation, "missing page");

    let report = run(site, &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
}

#[tokio::test]
async fn missing_page_server_error_fails() {
    let site = docs_site().page("/docs/nonexistent-page-12345", FakePage::with_status(500));
    let scenarios = scenarios_named(SuiteGroup::Navigation, "missing page");

    let report = run(site, &scenarios).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].check, "answers 200 or 404");
}

#[tokio::test]
async fn root_redirects_to_intro() {
    let scenarios = scenarios_named(SuiteGroup::Homepage, "root redirects to entry page");

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 2);
}

#[tokio::test]
async fn spanish_location_matches_path_prefix() {
    let scenario = Scenario::new("localization", "spanish prefix", Target::locale("es", "/es/docs/intro"))
        .visit()
        .expect_location(
            "under /es/",
            LocationInvariant::Matches(Pattern::prefix("/es/")),
        )
        .expect_location(
            "not under /pt/",
            LocationInvariant::Excludes(Pattern::prefix("/pt/")),
        );

    let report = run(docs_site(), &[scenario]).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 2);
}

#[tokio::test]
async fn hidden_logo_image_fails() {
    let page = docs_page("dark", INTRO)
        .with(FakeElement::new(&["a.navbar__brand"]))
        .with(FakeElement::new(&["a.navbar__brand img"]).attr("alt", "CodeGPT").hidden());
    let site = docs_site().page("/docs/intro", page);
    let scenarios = scenarios_named(SuiteGroup::Homepage, "logo");

    let report = run(site, &scenarios).await;

    let failed: Vec<_> = report.failures().map(|o| o.check.as_str()).collect();
    assert_eq!(failed, ["logo image visible"]);
}

#[tokio::test]
async fn logo_image_found_by_fallback_selector() {
    let page = docs_page("dark", INTRO)
        .with(FakeElement::new(&["a.navbar__brand"]))
        .with(FakeElement::new(&[".navbar__logo img"]).attr("alt", "CodeGPT"));
    let site = docs_site().page("/docs/intro", page);
    let scenarios = scenarios_named(SuiteGroup::Homepage, "logo");

    let report = run(site, &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 3);
}

fn community_link(rel: &str) -> FakeElement {
    FakeElement::new(&["a[href*=\"discord\"]"])
        .text("Discord")
        .attr("href", "https://discord.gg/codegpt")
        .attr("target", "_blank")
        .attr("rel", rel)
}

#[tokio::test]
async fn external_links_open_in_new_tab_with_noopener() {
    let site = docs_site().page(
        "/docs/intro",
        docs_page("dark", INTRO).with(community_link("noopener noreferrer")),
    );
    let scenarios = scenarios_named(SuiteGroup::Navigation, "external links");

    let report = run(site, &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 2);
}

#[tokio::test]
async fn external_link_without_noopener_fails() {
    let site = docs_site().page(
        "/docs/intro",
        docs_page("dark", INTRO).with(community_link("noreferrer")),
    );
    let scenarios = scenarios_named(SuiteGroup::Navigation, "external links");

    let report = run(site, &scenarios).await;

    let failed: Vec<_> = report.failures().map(|o| o.check.as_str()).collect();
    assert_eq!(failed, ["rel has noopener"]);
}

#[tokio::test]
async fn external_links_absent_are_skipped() {
    let scenarios = scenarios_named(SuiteGroup::Navigation, "external links");

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().skipped, 2);
}

#[tokio::test]
async fn section_deep_link_keeps_fragment() {
    let scenarios = scenarios_named(SuiteGroup::Navigation, "section deep link");
    assert_eq!(scenarios.len(), 1);

    let report = run(docs_site(), &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 2);
}

#[tokio::test]
async fn active_sidebar_item_is_visible() {
    let site = docs_site().page(
        "/docs/intro",
        docs_page("dark", INTRO).with(FakeElement::new(&[".menu__link--active"]).text("Intro")),
    );
    let scenarios = scenarios_named(SuiteGroup::Navigation, "active sidebar item");

    let report = run(site, &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 1);
}

fn site_with_footer_link(href: &str) -> vigil_core::testutil::FakeSite {
    let footer_link = FakeElement::new(&["footer a[href^=\"/\"]"])
        .text("Installation")
        .attr("href", href);
    docs_site()
        .page("/docs/intro", docs_page("dark", INTRO).with(footer_link))
        .page(
            "/docs/tutorial-basics/installation",
            docs_page("dark", INTRO).with(FakeElement::new(&["footer"])),
        )
}

#[tokio::test]
async fn footer_link_resolves() {
    let site = site_with_footer_link("/docs/tutorial-basics/installation");
    let scenarios = scenarios_named(SuiteGroup::Navigation, "footer link");

    let report = run(site, &scenarios).await;

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.summary().passed, 2);
}

#[tokio::test]
async fn broken_footer_link_fails() {
    let site = site_with_footer_link("/docs/removed-page");
    let scenarios = scenarios_named(SuiteGroup::Navigation, "footer link");

    let report = run(site, &scenarios).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].check.starts_with("follow footer"), "{}", failures[0].check);
    assert!(failures[0].message.contains("404"), "{}", failures[0].message);
    assert_eq!(report.summary().skipped, 2);
}

#[tokio::test]
async fn provider_guide_references() {
    let guide = "/docs/tutorial-ai-providers/openai";
    let scenarios = scenarios_named(SuiteGroup::Providers, "guide references");
    assert_eq!(scenarios.len(), 1);

    let bare = run(docs_site(), &scenarios).await;
    assert!(bare.is_success(), "{:?}", bare.outcomes);
    assert_eq!(bare.summary().skipped, 2);

    let page = docs_page("dark", INTRO)
        .with(FakeElement::new(&["article img"]).attr("alt", "API key screen"))
        .with(
            FakeElement::new(&["article a[href^=\"http\"]"])
                .attr("href", "https://platform.openai.com/docs"),
        );
    let illustrated = run(docs_site().page(guide, page), &scenarios).await;
    assert!(illustrated.is_success(), "{:?}", illustrated.outcomes);
    assert_eq!(illustrated.summary().passed, 2);
}
