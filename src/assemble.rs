use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use reqwest::Url;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::model::{AdvisoryRecord, AdvisorySummary, Section};
use crate::parser;

/// Assembly stats returned after completion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssembleStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct Assembled {
    pub records: Vec<AdvisoryRecord>,
    pub stats: AssembleStats,
}

struct FetchedPage {
    index: usize,
    summary: AdvisorySummary,
    body: Result<String, FetchError>,
}

/// Fetch every detail page on a bounded pool and build one record per success.
///
/// A failed fetch skips that advisory only. Records come back in the order of
/// `summaries`, whatever order the fetches finished in.
pub async fn assemble_records<F>(
    fetcher: Arc<F>,
    summaries: Vec<AdvisorySummary>,
    base: &Url,
    concurrency: usize,
) -> Result<Assembled>
where
    F: PageFetcher + Send + Sync + 'static,
{
    let total = summaries.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send fetched pages, the loop below collects them
    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchedPage>(concurrency.max(1) * 2);

    let mut handles = Vec::with_capacity(total);
    for (index, summary) in summaries.into_iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let body = fetcher.fetch(&summary.detail_url).await;
            let _ = tx.send(FetchedPage { index, summary, body }).await;
        }));
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut pages = Vec::with_capacity(total);
    let mut errors = 0usize;
    while let Some(page) = rx.recv().await {
        match page.body {
            Ok(html) => pages.push((page.index, page.summary, html)),
            Err(e) => {
                warn!("Skipping {} ({}): {}", page.summary.alert_code, page.summary.title, e);
                errors += 1;
            }
        }
        pb.inc(1);
    }

    // A task that died before sending never reached the channel
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Fetch task failed: {}", e);
            errors += 1;
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    pages.sort_by_key(|(index, _, _)| *index);
    let records: Vec<AdvisoryRecord> = pages
        .into_par_iter()
        .map(|(_, summary, html)| {
            let sections = parser::process_page(&html, base);
            AdvisoryRecord::new(summary, sections)
        })
        .collect();

    let stats = AssembleStats {
        total,
        ok: records.len(),
        errors,
    };
    info!("Assembled {} advisories ({} ok, {} errors)", total, stats.ok, stats.errors);
    Ok(Assembled { records, stats })
}

/// Fetch and build a single detail page.
pub async fn fetch_sections<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    base: &Url,
) -> Result<Vec<Section>> {
    let html = fetcher.fetch(url).await?;
    Ok(parser::process_page(&html, base))
}

// ── Tests ──
