use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vigil_core::testutil::{FakeElement, FakePage, FakeSite, MockSessionFactory};
use vigil_core::{
    RunConfig, RunReport, Runner, Scenario, SuiteConfig, SuiteGroup, TracingRunReporter,
    WaitPolicy, build_suite,
};

pub const BASE_URL: &str = "http://docs.test";

pub const INTRO: &str = "CodeGPT is an extension for your editor that brings chat, code \
    completion and documentation helpers to your daily work. Pick a provider, paste \
    your API key and start asking questions about your code.";

/// Run configuration with waits short enough for tests.
pub fn run_config() -> RunConfig {
    RunConfig::default()
        .with_base_url(BASE_URL)
        .unwrap()
        .with_wait(
            WaitPolicy::new(Duration::from_millis(40))
                .with_poll_interval(Duration::from_millis(5)),
        )
        .with_navigation_timeout(Duration::from_secs(2))
}

/// A documentation page with navbar, an eight-link sidebar, and an article.
pub fn docs_page(theme: &str, article: &str) -> FakePage {
    docs_page_with_sidebar(theme, article, 8)
}

pub fn docs_page_with_sidebar(theme: &str, article: &str, links: usize) -> FakePage {
    FakePage::ok()
        .with(FakeElement::new(&["html"]).attr("data-theme", theme))
        .with(FakeElement::new(&["body"]).style("background-color", "rgb(27, 27, 29)"))
        .with(FakeElement::new(&["title"]).text("Introduction | CodeGPT"))
        .with(FakeElement::new(&["nav.navbar"]))
        .with(FakeElement::new(&["nav.navbar a"]).text("Tutorial"))
        .with(FakeElement::new(&[".menu"]))
        .with_all((0..links).map(|i| {
            FakeElement::new(&[".menu a"])
                .text(&format!("Chapter {i}"))
                .attr("href", &format!("/docs/chapter-{i}"))
        }))
        .with(
            FakeElement::new(&["article"])
                .text(article)
                .style("color", "rgb(227, 227, 227)")
                .style("background-color", "rgb(27, 27, 29)"),
        )
        .with(
            FakeElement::new(&["article h1, article h2", "article h1, article h2, article h3"])
                .text("Welcome"),
        )
        .with(FakeElement::new(&["article p"]).text(article))
}

/// The documentation site in its expected shape: English entry page,
/// three required translations, and the OpenAI provider guide.
pub fn docs_site() -> FakeSite {
    FakeSite::new()
        .page("/", FakePage::redirect_to("/docs/intro"))
        .page("/docs/intro", docs_page("dark", INTRO))
        .page("/es/docs/intro", docs_page("dark", INTRO))
        .page("/pt/docs/intro", docs_page("dark", INTRO))
        .page("/zh-Hans/docs/intro", docs_page("dark", INTRO))
        .page(
            "/docs/tutorial-ai-providers/openai",
            docs_page(
                "dark",
                "OpenAI models are available once you connect your account. Open the \
                 provider selector, choose OpenAI, and paste the key generated in the \
                 platform dashboard.",
            ),
        )
}

/// Scenarios of `group` whose name is `name`.
pub fn scenarios_named(group: SuiteGroup, name: &str) -> Vec<Scenario> {
    build_suite(&SuiteConfig::default(), &[group])
        .unwrap()
        .into_iter()
        .filter(|s| s.name == name)
        .collect()
}

/// Run `scenarios` against `site` with isolated sessions.
pub async fn run(site: FakeSite, scenarios: &[Scenario]) -> RunReport {
    Runner::new(MockSessionFactory::new(site), run_config())
        .run(scenarios, CancellationToken::new(), &TracingRunReporter)
        .await
}
