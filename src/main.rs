mod assemble;
mod catalog;
mod error;
mod fetch;
mod filter;
mod listing;
mod model;
mod parser;
mod settings;
mod store;

use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::error::InputError;
use crate::fetch::HttpFetcher;
use crate::filter::DateRange;
use crate::listing::ListingPager;
use crate::model::{AdvisoryRecord, AdvisorySummary};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "advisory_scraper", about = "Scrape security advisories into structured JSON records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// First publication date to keep (YYYY-MM-DD); prompted for when omitted
    #[arg(short, long)]
    start: Option<String>,
    /// Last publication date to keep (YYYY-MM-DD); prompted for when omitted
    #[arg(short, long)]
    end: Option<String>,
    /// Stop after this many listing pages (default: until the listing runs out)
    #[arg(long)]
    max_pages: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Paginate, filter, fetch details and write one JSON record per advisory
    Run {
        #[command(flatten)]
        range: RangeArgs,
        /// Output root directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Concurrent detail fetches (overrides config)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,
    },
    /// Show the advisories in a date range without fetching details
    List {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Fetch one detail page and print its sections as JSON
    Page {
        /// Absolute URL of the detail page
        url: String,
    },
    /// Show catalog statistics for the output root
    Stats {
        /// Output root directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run { range, output, concurrency } => {
            if let Some(dir) = output {
                settings.output_root = dir;
            }
            if let Some(n) = concurrency {
                settings.concurrency = n;
            }
            settings.validate()?;
            let dates = resolve_range(&range)?;
            run(&settings, dates, range.max_pages).await
        }
        Commands::List { range } => {
            let dates = resolve_range(&range)?;
            let fetcher = HttpFetcher::new(&settings)?;
            let all = ListingPager::new(&fetcher, &settings, settings.base()?)
                .with_max_pages(range.max_pages)
                .collect_all()
                .await;
            let total = all.len();
            let matching = dates.filter(all);
            if matching.is_empty() {
                println!("No advisories between {} and {}.", dates.start(), dates.end());
            } else {
                print_summaries(&matching);
            }
            println!("\n{} of {} advisories in range", matching.len(), total);
            Ok(())
        }
        Commands::Page { url } => {
            let fetcher = HttpFetcher::new(&settings)?;
            let sections = assemble::fetch_sections(&fetcher, &url, &settings.base()?).await?;
            println!("{}", serde_json::to_string_pretty(&sections)?);
            Ok(())
        }
        Commands::Stats { output } => {
            if let Some(dir) = output {
                settings.output_root = dir;
            }
            let path = settings.catalog_path();
            if !path.exists() {
                println!("No catalog at {:?}. Run 'run' first.", path);
                return Ok(());
            }
            let conn = catalog::connect(&path)?;
            catalog::init_schema(&conn)?;
            let s = catalog::get_stats(&conn)?;
            println!("Records:  {}", s.records);
            println!("Dates:    {}", s.dates);
            println!("Earliest: {}", s.earliest.as_deref().unwrap_or("-"));
            println!("Latest:   {}", s.latest.as_deref().unwrap_or("-"));
            println!("Blocks:   {}", s.blocks);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(settings: &Settings, dates: DateRange, max_pages: Option<usize>) -> Result<()> {
    let root = &settings.output_root;
    store::ensure_output_root(root)?;
    let base = settings.base()?;
    let fetcher = Arc::new(HttpFetcher::new(settings)?);

    // Phase 1: listing
    let all = ListingPager::new(fetcher.as_ref(), settings, base.clone())
        .with_max_pages(max_pages)
        .collect_all()
        .await;
    let total = all.len();
    let summaries = dates.filter(all);
    println!("Scraped {} advisories, {} between {} and {}", total, summaries.len(), dates.start(), dates.end());
    if summaries.is_empty() {
        return Ok(());
    }
    let manifest = store::write_manifest(root, &summaries)?;
    info!("Summary manifest written to {:?}", manifest);

    // Phase 2: detail pages
    let t_fetch = Instant::now();
    println!("Fetching {} detail pages...", summaries.len());
    let assembled =
        assemble::assemble_records(fetcher, summaries, &base, settings.concurrency).await?;
    println!(
        "Fetched {} pages ({} ok, {} errors) in {:.1}s",
        assembled.stats.total,
        assembled.stats.ok,
        assembled.stats.errors,
        t_fetch.elapsed().as_secs_f64()
    );

    // Phase 3: persist
    let written = store::write_records(root, &assembled.records);
    if let Err(e) = index_records(settings, &assembled.records, &written.written) {
        warn!("Catalog update failed: {:#}", e);
    }
    println!(
        "Saved {} records to {:?} ({} skipped, {} failed to write).",
        written.written.len(),
        root,
        assembled.stats.errors,
        written.failed
    );
    Ok(())
}

fn index_records(settings: &Settings, records: &[AdvisoryRecord], written: &[PathBuf]) -> Result<()> {
    let root = &settings.output_root;
    let written: HashSet<&PathBuf> = written.iter().collect();
    let rows: Vec<(PathBuf, &AdvisoryRecord)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (store::record_path(root, r, i), r))
        .filter(|(path, _)| written.contains(path))
        .map(|(path, r)| {
            let rel = path.strip_prefix(root).map(PathBuf::from).unwrap_or(path);
            (rel, r)
        })
        .collect();

    let conn = catalog::connect(&settings.catalog_path())?;
    catalog::init_schema(&conn)?;
    let n = catalog::save_records(&conn, &rows)?;
    info!("Catalog: indexed {} records", n);
    Ok(())
}

fn resolve_range(args: &RangeArgs) -> Result<DateRange> {
    let start = resolve_date(args.start.as_deref(), "Start date (YYYY-MM-DD): ")?;
    let end = resolve_date(args.end.as_deref(), "End date (YYYY-MM-DD): ")?;
    Ok(DateRange::new(start, end)?)
}

/// Use the flag value if given, otherwise prompt until a valid date is entered.
fn resolve_date(flag: Option<&str>, prompt: &str) -> Result<NaiveDate> {
    if let Some(value) = flag {
        return Ok(filter::parse_input_date(value)?);
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}", prompt);
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line).context("Failed to read date")? == 0 {
            bail!("No date entered");
        }
        match filter::parse_input_date(&line) {
            Ok(date) => return Ok(date),
            Err(InputError::InvalidDateInput(v)) => println!("Invalid date {:?}, try again.", v),
            Err(e) => return Err(e.into()),
        }
    }
}

fn print_summaries(rows: &[AdvisorySummary]) {
    println!(
        "{:>3} | {:<10} | {:<16} | {:<50}",
        "#", "Date", "Code", "Title"
    );
    println!("{}", "-".repeat(88));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>3} | {:<10} | {:<16} | {:<50}",
            i + 1,
            r.publication_date,
            truncate(&r.alert_code, 16),
            truncate(&r.title, 50)
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

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn durations() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn flag_dates_are_validated() {
        assert!(resolve_date(Some("2023-01-31"), "").is_ok());
        let err = resolve_date(Some("31/01/2023"), "").unwrap_err();
        assert!(err.to_string().contains("expected YYYY-MM-DD"));
    }

    #[test]
    fn inverted_flag_range_fails_fast() {
        let args = RangeArgs {
            start: Some("2023-02-01".into()),
            end: Some("2023-01-01".into()),
            max_pages: None,
        };
        let err = resolve_range(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidRange { .. })
        ));
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "advisory_scraper", "run", "--start", "2023-01-01", "--end", "2023-01-31", "-c", "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { range, concurrency, output } => {
                assert_eq!(range.start.as_deref(), Some("2023-01-01"));
                assert_eq!(concurrency, Some(4));
                assert!(output.is_none());
            }
            _ => panic!("expected run"),
        }
    }
}
