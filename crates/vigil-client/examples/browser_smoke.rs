/// Smoke-test for `BrowserSessionFactory`.
///
/// Launches headless Chromium, opens the docs entry page, and probes the
/// theme attribute and sidebar the way the verifier would.
///
/// Run with:
///   cargo run --example browser_smoke --features browser [-- <url>]
use vigil_client::BrowserSessionFactory;
use vigil_core::traits::{Session, SessionFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:3000/docs/intro".to_string());

    println!("Launching headless browser…");
    let factory = BrowserSessionFactory::launch().await?;
    let session = factory.open().await?;

    println!("Opening {url} …");
    let response = session.navigate(&url).await?;
    println!("Landed on {} ({})", response.url, response.status_text());

    let root = session
        .locate("html")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("document has no <html> element"))?;
    let theme = session.attribute(&root, "data-theme").await?;
    println!("data-theme = {theme:?}");

    let links = session.locate(".menu a").await?;
    println!("{} sidebar links", links.len());

    if let Some(body) = session.locate("body").await?.first() {
        let background = session.computed_style(body, "background-color").await?;
        println!("body background-color = {background}");
    }

    session.close().await;
    Ok(())
}
