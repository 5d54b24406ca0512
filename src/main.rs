//! folio - markdown page renderer

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use folio::{Fetcher, FileFetcher, HttpFetcher, Site, SiteConfig};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Render a markdown page through its template chain", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio /docs/intro --root ./site            Render from a local directory
    folio / --base-url https://example.com     Render from a live site
    folio /about --root ./site -o about.html   Write output to a file")]
struct Cli {
    /// Page path (e.g. /docs/intro; a trailing slash maps to index.md)
    #[arg(value_name = "PATH")]
    path: String,

    /// Serve content and templates from a local directory
    #[arg(long, value_name = "DIR", conflicts_with = "base_url")]
    root: Option<String>,

    /// Serve content and templates from a base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Site configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> folio::Result<()> {
    let config = match &cli.config {
        Some(path) => SiteConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SiteConfig::default(),
    };

    let fetcher: Arc<dyn Fetcher> = match (&cli.root, &cli.base_url) {
        (Some(root), _) => Arc::new(FileFetcher::new(root)),
        (None, Some(base)) => Arc::new(HttpFetcher::new(base)),
        (None, None) => Arc::new(FileFetcher::new(".")),
    };

    let site = Site::new(config, fetcher);
    let page = site.render(&cli.path).await?;
    let html = page.document.to_html();

    match &cli.output {
        Some(path) => std::fs::write(path, html)?,
        None => println!("{html}"),
    }
    Ok(())
}
