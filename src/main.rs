//! Fake News Analyzer binary entrypoint
//! Reads text from argv (or stdin), runs the pipeline, prints pretty JSON to stdout.
//!
//! Usage: `fake-news-analyzer [--quick] [--no-explain] [--metrics] [TEXT...]`

use anyhow::Context;
use fake_news_analyzer::analyze::load_analyzer;
use fake_news_analyzer::config::ai::DEFAULT_AI_CONFIG_PATH;
use fake_news_analyzer::metrics::Metrics;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Default)]
struct CliArgs {
    quick: bool,
    explain: bool,
    metrics: bool,
    text: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs {
        explain: true,
        ..CliArgs::default()
    };
    for arg in args {
        match arg.as_str() {
            "--quick" => out.quick = true,
            "--no-explain" => out.explain = false,
            "--metrics" => out.metrics = true,
            flag if flag.starts_with("--") => anyhow::bail!("unknown flag: {flag}"),
            _ => out.text.push(arg),
        }
    }
    Ok(out)
}

/// Logs go to stderr; stdout carries only the JSON result.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fake_news_analyzer=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn read_input(args: &[String]) -> anyhow::Result<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("reading text from stdin")?;
    Ok(buf)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = parse_args(std::env::args().skip(1))?;
    let metrics = if args.metrics { Some(Metrics::init()?) } else { None };

    let analyzer = load_analyzer(None, Path::new(DEFAULT_AI_CONFIG_PATH))?;
    let text = read_input(&args.text).await?;

    let output = if args.quick {
        let label = analyzer.quick_classify(&text).await;
        serde_json::to_string_pretty(&serde_json::json!({ "label": label }))?
    } else {
        let record = analyzer.analyze(&text, args.explain).await;
        serde_json::to_string_pretty(&record)?
    };
    println!("{output}");

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
