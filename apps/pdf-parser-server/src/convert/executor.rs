//! Conversion Executor
//!
//! Runs the extractor under admission control and a per-request deadline.
//!
//! # Admission
//!
//! ```text
//!   request ─► admit() ──full──► ConversionFailed("service busy")
//!                 │
//!                 ▼
//!        [queued: FIFO semaphore wait]  ──deadline──► Timeout
//!                 │
//!                 ▼
//!        [running: ≤ max_concurrent]    ──deadline──► Timeout (work detached)
//!                 │
//!                 ▼
//!          ConversionResult
//! ```
//!
//! At most `max_concurrent + queue_depth` requests are admitted at once.
//! The admission slot and the semaphore permit both travel with the spawned
//! extraction task, so a timed-out conversion keeps counting against the
//! worker cap and the queue bound until the extractor actually returns,
//! unless the extractor reports itself cancellable.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Duration, Instant};

use super::options::ConversionOptions;
use super::types::ConversionResult;
use crate::config::ConversionConfig;
use crate::error::ServiceError;
use crate::extractor::Extractor;

/// Bounded, deadline-enforcing front end to an [`Extractor`]
pub struct ConversionExecutor {
    extractor: Arc<dyn Extractor>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    queue_depth: usize,
    timeout: Duration,
    /// Requests admitted (queued + running, including detached timeouts)
    admitted: Arc<AtomicUsize>,
    /// Extraction tasks currently holding a permit
    active: Arc<AtomicUsize>,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time executor statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorStats {
    pub max_concurrent: usize,
    pub queue_depth: usize,
    pub admitted: usize,
    pub active: usize,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub rejected: u64,
}

/// Releases an admission slot on drop, including when the request future is dropped
struct AdmissionGuard {
    admitted: Arc<AtomicUsize>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.admitted.fetch_sub(1, Ordering::AcqRel);
    }
}

struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self { active }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ConversionExecutor {
    pub fn new(extractor: Arc<dyn Extractor>, config: &ConversionConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);

        Self {
            extractor,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            queue_depth: config.queue_depth,
            timeout: Duration::from_secs(config.timeout_secs),
            admitted: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute deadline for a request admitted now
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Convert `pdf` with `options`, failing with `Timeout` once `deadline` passes.
    pub async fn execute(
        &self,
        pdf: Vec<u8>,
        options: ConversionOptions,
        deadline: Instant,
    ) -> Result<ConversionResult, ServiceError> {
        let admission = self.admit()?;

        let permit = match timeout_at(deadline, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(ServiceError::ConversionFailed(
                    "service is shutting down".to_string(),
                ))
            }
            Err(_) => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                return Err(ServiceError::Timeout(format!(
                    "conversion timed out after {:?} waiting for a free worker",
                    self.timeout
                )));
            }
        };

        let extractor = self.extractor.clone();
        let active = self.active.clone();
        let pdf_len = pdf.len();
        let started = Instant::now();

        let mut task = tokio::spawn(async move {
            let _admission = admission;
            let _permit = permit;
            let _active = ActiveGuard::new(active);
            extractor.convert(pdf, &options).await
        });

        let outcome = match timeout_at(deadline, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                if self.extractor.cancellable() {
                    task.abort();
                } else {
                    tracing::warn!(
                        extractor = self.extractor.name(),
                        "Extraction not cancellable; it keeps its worker slot until it finishes"
                    );
                }
                return Err(ServiceError::Timeout(format!(
                    "conversion timed out after {:?}",
                    self.timeout
                )));
            }
        };

        match outcome {
            Ok(Ok(result)) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    extractor = self.extractor.name(),
                    pdf_bytes = pdf_len,
                    images = result.images.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Conversion finished"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    extractor = self.extractor.name(),
                    pdf_bytes = pdf_len,
                    "Extraction failed: {}",
                    e
                );
                Err(ServiceError::ConversionFailed(e.public_message().to_string()))
            }
            Err(join_error) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(ServiceError::InternalError(format!(
                    "extraction task failed: {}",
                    join_error
                )))
            }
        }
    }

    /// Reserve a queue slot or fail fast when saturated
    fn admit(&self) -> Result<AdmissionGuard, ServiceError> {
        let capacity = self.max_concurrent + self.queue_depth;

        let admitted = self
            .admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            });

        match admitted {
            Ok(_) => Ok(AdmissionGuard {
                admitted: self.admitted.clone(),
            }),
            Err(current) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    admitted = current,
                    capacity,
                    "Rejecting conversion: queue is full"
                );
                Err(ServiceError::ConversionFailed(
                    "service busy, try again later".to_string(),
                ))
            }
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            max_concurrent: self.max_concurrent,
            queue_depth: self.queue_depth,
            admitted: self.admitted.load(Ordering::Acquire),
            active: self.active.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Stop admitting work; queued requests fail with `ConversionFailed`
    pub fn shutdown(&self) {
        self.permits.close();
    }
}
