//! Write-behind persistence for the job table.
//!
//! The scheduler queues every change here instead of touching SQLite itself.
//! A dedicated thread drains the queue in order, so a busy database never
//! stalls a runtime worker or holds up the job table lock.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::{db::JobStore, types::Job};

enum Write {
    Upsert(Box<Job>),
    Delete(String),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub(crate) struct JobWriter {
    tx: mpsc::UnboundedSender<Write>,
}

impl JobWriter {
    /// Start the writer thread. It exits once every `JobWriter` clone is
    /// dropped and the queue is drained.
    pub(crate) fn spawn(store: JobStore) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            while let Some(write) = rx.blocking_recv() {
                match write {
                    Write::Upsert(job) => {
                        if let Err(e) = store.upsert(&job) {
                            error!(job_id = %job.id, "failed to persist job state: {e}");
                        }
                    }
                    Write::Delete(id) => {
                        if let Err(e) = store.delete(&id) {
                            error!(job_id = %id, "failed to delete persisted job: {e}");
                        }
                    }
                    Write::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("job writer stopped");
        });
        Self { tx }
    }

    pub(crate) fn upsert(&self, job: &Job) {
        self.send(Write::Upsert(Box::new(job.clone())));
    }

    pub(crate) fn delete(&self, id: &str) {
        self.send(Write::Delete(id.to_string()));
    }

    /// Resolves once every write queued before the call has been applied.
    pub(crate) async fn flush(&self) {
        let (done, applied) = oneshot::channel();
        self.send(Write::Flush(done));
        let _ = applied.await;
    }

    fn send(&self, write: Write) {
        if self.tx.send(write).is_err() {
            warn!("job writer is gone, dropping write");
        }
    }
}
