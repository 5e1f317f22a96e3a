mod parser;
mod report;
mod scraper;
mod segmenter;
mod table;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::error;

use segmenter::{MatchOrder, Segmenter};
use table::{AnnotatedTable, RawTable};

const RAW_CSV: &str = "police_beat_data_all_pages.csv";
const CLEANED_CSV: &str = "Cleaned_police_beat_data.csv";
const SAMPLE_ROWS: usize = 3;
const TOP_TYPES: usize = 10;

#[derive(Parser)]
#[command(name = "police_beat", about = "Police beat scraper and incident-type cleaner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScrapeArgs {
    /// First page index to fetch
    #[arg(long, default_value_t = scraper::FIRST_PAGE)]
    start: u32,
    /// Last page index to fetch (inclusive)
    #[arg(long, default_value_t = scraper::LAST_PAGE)]
    end: u32,
    /// Pause between page requests
    #[arg(long, default_value_t = scraper::PAGE_DELAY_MS)]
    delay_ms: u64,
    /// Per-request timeout
    #[arg(long, default_value_t = scraper::REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Listing URL; the page index is appended to it
    #[arg(long, default_value = scraper::BASE_URL)]
    base_url: String,
    /// Where to write the raw date/description table
    #[arg(short, long, default_value = RAW_CSV)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listing pages and save raw incidents
    Scrape(ScrapeArgs),
    /// Split incident types off descriptions in a raw CSV
    Clean {
        #[arg(short, long, default_value = RAW_CSV)]
        input: PathBuf,
        #[arg(short, long, default_value = CLEANED_CSV)]
        output: PathBuf,
        /// Which vocabulary entry wins when one label is a prefix of another
        #[arg(long, value_enum, default_value_t = MatchOrder::Longest)]
        match_order: MatchOrder,
    },
    /// Scrape + clean in one pipeline
    Run {
        #[command(flatten)]
        scrape: ScrapeArgs,
        /// Where to write the cleaned table
        #[arg(long, default_value = CLEANED_CSV)]
        cleaned: PathBuf,
        #[arg(long, value_enum, default_value_t = MatchOrder::Longest)]
        match_order: MatchOrder,
    },
    /// Incident type counts from a cleaned CSV
    Stats {
        #[arg(short, long, default_value = CLEANED_CSV)]
        input: PathBuf,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        /// Print counts as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape(args) => {
            let records = scrape(&args).await?;
            table::save_raw(&args.output, &records)
                .with_context(|| format!("Failed to save {}", args.output.display()))?;
            println!("Saved {} incidents to {}", records.len(), args.output.display());
            Ok(())
        }
        Commands::Clean {
            input,
            output,
            match_order,
        } => {
            let segmenter = Segmenter::new(match_order);
            let cleaned = table::process_file(&input, &output, &segmenter)
                .with_context(|| format!("Failed to process {}", input.display()))?;
            print_summary(&cleaned, TOP_TYPES);
            Ok(())
        }
        Commands::Run {
            scrape: args,
            cleaned,
            match_order,
        } => {
            // Phase 1: Scrape
            let t_scrape = Instant::now();
            let records = scrape(&args).await?;
            println!(
                "Scraped {} incidents in {:.1}s",
                records.len(),
                t_scrape.elapsed().as_secs_f64()
            );

            // Phase 2: Persist, reload and clean
            let raw = match table::save_raw(&args.output, &records) {
                Ok(()) => {
                    println!("Saved raw incidents to {}", args.output.display());
                    table::load_raw(&args.output)
                        .with_context(|| format!("Failed to reload {}", args.output.display()))?
                }
                Err(e) => {
                    error!("Error saving {}: {}", args.output.display(), e);
                    RawTable::from_records(records)
                }
            };
            let segmenter = Segmenter::new(match_order);
            let annotated = table::clean_table(raw, &cleaned, &segmenter);
            print_summary(&annotated, TOP_TYPES);
            Ok(())
        }
        Commands::Stats { input, limit, json } => stats(&input, limit, json),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape(args: &ScrapeArgs) -> anyhow::Result<Vec<table::RawRecord>> {
    if args.start > args.end {
        bail!("--start ({}) must not be after --end ({})", args.start, args.end);
    }
    let timeout = Duration::from_secs(args.timeout_secs);
    let fetcher = scraper::HttpFetcher::new(&args.base_url, timeout)?;

    println!("Scraping pages {}..={}...", args.start, args.end);
    let outcome = scraper::scrape_pages(
        &fetcher,
        args.start..=args.end,
        Duration::from_millis(args.delay_ms),
    )
    .await?;
    let s = &outcome.stats;
    println!(
        "Done: {} pages ({} ok, {} empty, {} errors).",
        s.total, s.ok, s.empty, s.errors
    );
    Ok(outcome.records)
}

fn stats(input: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let records = table::load_annotated(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    if records.is_empty() {
        println!("No incidents found.");
        return Ok(());
    }
    let counts = report::count_types(&records);
    if json {
        println!("{}", report::to_json(&counts)?);
        return Ok(());
    }
    print_counts(&counts, limit);
    println!("\n{} incidents | {} unique incident types", records.len(), counts.len());
    Ok(())
}

fn print_summary(table: &AnnotatedTable, top: usize) {
    println!("\nSample of processed data:");
    println!("{:>3} | {:<28} | {:<60}", "#", "Incident type", "Description");
    println!("{}", "-".repeat(97));
    for (i, r) in table.records().take(SAMPLE_ROWS).enumerate() {
        println!(
            "{:>3} | {:<28} | {:<60}",
            i + 1,
            truncate(&r.incident_type, 28),
            truncate(r.clean_description.as_deref().unwrap_or("-"), 60)
        );
    }

    let counts = report::count_types(table.records());
    println!("\nFound {} unique incident types.", counts.len());
    println!("Top {} incident types:", top);
    print_counts(&counts, top);
}

fn print_counts(counts: &[report::TypeCount], limit: usize) {
    println!("{:>3} | {:<32} | {:>6}", "#", "Incident type", "Count");
    println!("{}", "-".repeat(47));
    for (i, c) in counts.iter().take(limit).enumerate() {
        println!(
            "{:>3} | {:<32} | {:>6}",
            i + 1,
            truncate(&c.incident_type, 32),
            c.count
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
