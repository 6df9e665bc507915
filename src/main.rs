use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use brand_monitor::config::MonitorConfig;
use brand_monitor::pipeline::fetch::GraphQlSource;
use brand_monitor::pipeline::ingest::{self, FileSource};
use brand_monitor::pipeline::snapshot::write_snapshot;
use brand_monitor::pipeline::types::SentimentLabel;
use brand_monitor::pipeline::view::MonthView;
use brand_monitor::pipeline::{AnalyzedReviews, ReviewPipeline};
use brand_monitor::sentiment::{Classifier, create_backend};

#[derive(Parser, Debug)]
#[command(name = "brand-monitor")]
#[command(version, about = "Sentiment reports over customer reviews")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Download reviews and save them as the local snapshot
    Fetch,
    /// Classify the snapshot and summarize a month
    Report {
        /// Month name, e.g. "January". Defaults to every month present.
        month: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = MonitorConfig::from_env()?;

    eprintln!("Brand Monitor v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Fetch => fetch(&config).await,
        Command::Report { month } => report(&config, month.as_deref()).await,
    }
}

/// Pull reviews from the remote endpoint and write them as the local snapshot.
async fn fetch(config: &MonitorConfig) -> anyhow::Result<()> {
    let source = GraphQlSource::new(&config.endpoint).with_page_size(config.page_size);
    let reviews = ingest::load_with_timeout(&source, config.source_timeout).await?;

    write_snapshot(&config.source_path, &reviews)
        .await
        .with_context(|| format!("writing {}", config.source_path.display()))?;

    eprintln!(
        "   Saved {} reviews to {}",
        reviews.len(),
        config.source_path.display()
    );
    Ok(())
}

/// Classify the snapshot and print one month (or every month present).
async fn report(config: &MonitorConfig, month: Option<&str>) -> anyhow::Result<()> {
    eprintln!("   Source: {}", config.source_path.display());
    eprintln!("   Backend: {}\n", config.backend);

    let backend = create_backend(config.backend, &config.model);
    let pipeline = ReviewPipeline::new(
        Arc::new(FileSource::new(&config.source_path)),
        Classifier::new(backend),
    )
    .with_timeout(config.source_timeout);

    let analyzed = match pipeline.run().await {
        Ok(analyzed) => analyzed,
        Err(e) => {
            error!(error = %e, "Report failed");
            return Err(e.into());
        }
    };

    let months = match month {
        Some(m) => vec![m.to_string()],
        None => analyzed.months(),
    };
    info!(count = analyzed.len(), months = months.len(), "Rendering report");

    if months.is_empty() {
        println!("No reviews found.");
    }
    for month in &months {
        print_month(&analyzed, month);
    }
    Ok(())
}

fn print_month(analyzed: &AnalyzedReviews, month: &str) {
    let view: MonthView = analyzed.view(month);

    println!("== {} ==", view.month);
    if view.is_empty() {
        println!("No reviews found for this month.\n");
        return;
    }

    println!("{:<12} {:>6}  {:<10} {:>10}  TEXT", "ID", "RATING", "SENTIMENT", "CONFIDENCE");
    for row in &view.rows {
        println!(
            "{:<12} {:>6.1}  {:<10} {:>10.4}  {}",
            row.review.id,
            row.review.rating,
            row.label(),
            row.confidence(),
            truncate(&row.review.text, 60)
        );
    }

    println!();
    for label in SentimentLabel::ALL {
        println!(
            "{:<10} {}",
            label,
            view.label_counts.get(&label).copied().unwrap_or(0)
        );
    }
    println!("Average confidence: {}", view.mean_confidence);
    println!(
        "Word cloud text: {} words\n",
        view.word_cloud_text.split_whitespace().count()
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
