use anyhow::{bail, Context};

use post_tldr::cli::{self, Command, USAGE};
use post_tldr::models::{estimate_cost, StoredSummary, SummaryResult, SummaryStatus};
use post_tldr::{App, Config};

const WIDTH: usize = 80;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("Error: {}\n\n{}", message, USAGE);
            std::process::exit(2);
        }
    };

    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("failed to load configuration")?;
    let app = App::new(config).await?;

    match command {
        Command::Summarize {
            post_id,
            file,
            overrides,
        } => {
            let result = app
                .summarize_file(post_id, &file, &overrides)
                .await
                .with_context(|| format!("could not summarize post {}", post_id))?;
            print_result(post_id, &result);
        }

        Command::Batch { dir, overrides } => {
            let report = app.summarize_batch(&dir, &overrides).await?;
            for (post_id, result) in &report.succeeded {
                println!(
                    "post {:>6}: ok via {} ({} tokens{})",
                    post_id,
                    result.provider,
                    result.tokens_used,
                    if result.cached { ", cached" } else { "" }
                );
            }
            for (post_id, error) in &report.failed {
                println!("post {:>6}: FAILED {}", post_id, error);
            }
            println!(
                "{} of {} posts summarized",
                report.succeeded.len(),
                report.total()
            );
            if report.succeeded.is_empty() && !report.failed.is_empty() {
                bail!("every post in the batch failed");
            }
        }

        Command::Show(post_id) => match app.show_summary(post_id).await? {
            Some(summary) => print_stored(&summary),
            None => bail!("no summary stored for post {}", post_id),
        },

        Command::Delete(post_id) => {
            if !app.delete_summary(post_id).await? {
                bail!("no summary stored for post {}", post_id);
            }
            println!("Deleted summary for post {}", post_id);
        }

        Command::Disable(post_id) => set_status(&app, post_id, SummaryStatus::Disabled).await?,

        Command::Enable(post_id) => set_status(&app, post_id, SummaryStatus::Active).await?,

        Command::Test(provider) => {
            let reports = app.test_connection(provider).await;
            for report in &reports {
                println!("{}", report);
            }
            if reports.iter().any(|r| !r.passed()) {
                bail!("connection test failed");
            }
        }

        Command::Providers => {
            for p in app.providers_overview() {
                println!(
                    "{} {:<9} {:<17} model={} key={} timeout={}s rate={}/min",
                    if p.active { "*" } else { " " },
                    p.id,
                    p.display_name,
                    p.model,
                    if p.has_api_key { "yes" } else { "no" },
                    p.timeout.as_secs(),
                    p.rate_limit_per_minute
                );
            }
        }

        Command::Stats => {
            let stats = app.stats().await?;
            println!("Summaries:       {} ({} active)", stats.total, stats.active);
            println!("Tokens used:     {}", stats.tokens_used);
            println!("Avg. generation: {:.2}s", stats.average_generation_time);
            for (provider, count) in &stats.by_provider {
                println!("  {:<10} {}", provider, count);
            }
        }

        Command::Help => unreachable!("handled before loading configuration"),
    }

    Ok(())
}

async fn set_status(app: &App, post_id: i64, status: SummaryStatus) -> anyhow::Result<()> {
    if !app.set_summary_status(post_id, status).await? {
        bail!("no summary stored for post {}", post_id);
    }
    println!("Summary for post {} is now {}", post_id, status);
    Ok(())
}

fn print_result(post_id: i64, result: &SummaryResult) {
    println!("{}", render_for_terminal(&result.summary));
    let cost = estimate_cost(result)
        .map(|c| format!(", ~${:.5}", c))
        .unwrap_or_default();
    println!(
        "-- post {} | {} / {} | {} tokens ({} in, {} out, {} cached){} | {:.2}s{}",
        post_id,
        result.provider,
        result.model,
        result.tokens_used,
        result.input_tokens,
        result.output_tokens,
        result.cached_tokens,
        cost,
        result.generation_time,
        if result.cached { " | from cache" } else { "" }
    );
}

fn print_stored(summary: &StoredSummary) {
    println!("{}", render_for_terminal(&summary.summary_text));
    println!(
        "-- post {} | {} / {} | {} | v{} | {} | updated {}",
        summary.post_id,
        summary.api_provider,
        summary.model,
        summary.language,
        summary.version,
        summary.status,
        summary.updated_at.format("%Y-%m-%d %H:%M")
    );
}

/// Stored summaries may be rendered HTML; show them as wrapped plain text.
fn render_for_terminal(summary: &str) -> String {
    if summary.trim_start().starts_with('<') {
        if let Ok(text) = html2text::from_read(summary.as_bytes(), WIDTH) {
            return text.trim_end().to_string();
        }
    }
    textwrap::fill(summary, WIDTH)
}
