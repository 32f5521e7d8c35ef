use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::{ColetorError, Result};
use crate::batch::{BatchClassifier, JobRegistry, JobStatus};

/// Message type for the batch dispatcher
#[derive(Debug)]
pub enum BatchMessage {
    /// Run a batch of URLs
    Run { job_id: Uuid, urls: Vec<String> },
    /// Shutdown the dispatcher
    Shutdown,
}

/// Handle to submit batches to the dispatcher
#[derive(Clone)]
pub struct BatchDispatcherHandle {
    tx: mpsc::Sender<BatchMessage>,
    jobs: JobRegistry,
}

impl BatchDispatcherHandle {
    /// Queue a batch and return its job id. The batch runs after this returns.
    pub async fn submit(&self, urls: Vec<String>) -> Result<Uuid> {
        let job_id = Uuid::new_v4();
        self.jobs.set(
            job_id,
            JobStatus::Queued {
                urls: urls.len(),
                queued_at: Utc::now(),
            },
        );

        if let Err(e) = self.tx.send(BatchMessage::Run { job_id, urls }).await {
            self.jobs.remove(&job_id);
            return Err(ColetorError::Other(format!(
                "Batch dispatcher is not running: {}",
                e
            )));
        }

        Ok(job_id)
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Shutdown the dispatcher. Batches already running finish on their own.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(BatchMessage::Shutdown).await;
    }
}

/// Receives batches and runs each one as an independent background task
pub struct BatchDispatcher {
    classifier: Arc<BatchClassifier>,
    jobs: JobRegistry,
    rx: mpsc::Receiver<BatchMessage>,
}

impl BatchDispatcher {
    /// Create a new dispatcher and return a handle to communicate with it
    pub fn new(classifier: Arc<BatchClassifier>) -> (Self, BatchDispatcherHandle) {
        let (tx, rx) = mpsc::channel(100);
        let jobs = JobRegistry::new();
        let handle = BatchDispatcherHandle {
            tx,
            jobs: jobs.clone(),
        };
        let dispatcher = Self {
            classifier,
            jobs,
            rx,
        };
        (dispatcher, handle)
    }

    /// Run the dispatcher loop
    pub async fn run(mut self) {
        info!("Batch dispatcher started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                BatchMessage::Run { job_id, urls } => {
                    let classifier = self.classifier.clone();
                    let jobs = self.jobs.clone();

                    tokio::spawn(async move {
                        jobs.set(
                            job_id,
                            JobStatus::Running {
                                urls: urls.len(),
                                started_at: Utc::now(),
                            },
                        );
                        info!(%job_id, "Running scraping batch of {} URLs", urls.len());

                        let report = classifier.run(&urls).await;

                        if report.aborted {
                            error!(%job_id, "Batch aborted before scraping");
                        } else if report.failed > 0 {
                            error!(%job_id, failed = report.failed, "Batch finished with failures");
                        }
                        jobs.set(
                            job_id,
                            JobStatus::Completed {
                                report,
                                finished_at: Utc::now(),
                            },
                        );
                    });
                }
                BatchMessage::Shutdown => {
                    info!("Batch dispatcher shutting down");
                    break;
                }
            }
        }
    }
}

/// Spawn the batch dispatcher as a tokio task
pub fn spawn_batch_dispatcher(classifier: Arc<BatchClassifier>) -> BatchDispatcherHandle {
    let (dispatcher, handle) = BatchDispatcher::new(classifier);

    tokio::spawn(async move {
        dispatcher.run().await;
    });

    handle
}
