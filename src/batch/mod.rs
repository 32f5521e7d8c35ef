//! Retry batches: enumerate failed URLs, scrape them one by one and route
//! each outcome to the articles or failures collection.

mod classifier;
mod dispatcher;
mod jobs;

pub use classifier::{BatchClassifier, BatchReport};
pub use dispatcher::{spawn_batch_dispatcher, BatchDispatcher, BatchDispatcherHandle};
pub use jobs::{JobRegistry, JobStatus};

use crate::app::Result;
use crate::store::DocumentStore;

/// Upper bound on URLs handed to a single batch
pub const MAX_BATCH_SIZE: usize = 100;

/// Read up to `limit` (capped at [`MAX_BATCH_SIZE`]) pending URLs, oldest
/// first. Documents without a usable `url` field are skipped.
pub fn enumerate_pending(
    store: &dyn DocumentStore,
    collection: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let docs = store.list(collection, limit.min(MAX_BATCH_SIZE))?;

    Ok(docs
        .into_iter()
        .filter_map(|doc| {
            doc.body
                .get("url")
                .and_then(|u| u.as_str())
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
        })
        .collect())
}
