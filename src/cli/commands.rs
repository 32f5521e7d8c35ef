use serde_json::{Map, Value};

use crate::app::{AppContext, ColetorError, Result};
use crate::batch::{enumerate_pending, MAX_BATCH_SIZE};
use crate::domain::FailureRecord;
use crate::store::append_record;

pub async fn scrape_url(ctx: &AppContext, url: &str) -> Result<()> {
    let mut record = ctx.scraper.scrape(url).await?;
    record.stamp(&ctx.config.scraper.scraped_by);

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn enqueue_urls(ctx: &AppContext, urls: &[String]) -> Result<()> {
    let collection = &ctx.config.store.collections.failures;

    for url in urls {
        let record = FailureRecord::queued(url, &ctx.config.scraper.scraped_by);
        append_record(ctx.store.as_ref(), collection, &record)?;
        println!("Queued: {}", url);
    }

    println!("Queued {} URLs in '{}'", urls.len(), collection);
    Ok(())
}

pub async fn run_batch(ctx: &AppContext) -> Result<()> {
    if let Err(e) = ctx.store.ping() {
        let mut details = Map::new();
        details.insert("error".into(), Value::String(e.to_string()));
        ctx.error_log
            .record("Failed to start the scraping process.", Some(details));
        return Err(e);
    }

    let collection = &ctx.config.store.collections.failures;
    let urls = enumerate_pending(ctx.store.as_ref(), collection, MAX_BATCH_SIZE)?;

    if urls.is_empty() {
        println!("No URLs found in '{}' to process.", collection);
        return Ok(());
    }

    println!("Scraping {} URLs...", urls.len());
    let report = ctx.classifier.run(&urls).await;
    if report.aborted {
        return Err(ColetorError::StoreUnavailable(
            "document store became unavailable before the batch started".to_string(),
        ));
    }

    println!(
        "Done: {} succeeded, {} failed ({} timeouts, {} extraction, {} store, {} unknown)",
        report.succeeded,
        report.failed,
        report.timeouts,
        report.extraction_failures,
        report.store_failures,
        report.unknown_failures
    );
    Ok(())
}
