//! Bounded pool for blocking background jobs
//!
//! Each submitted job runs on tokio's blocking thread pool once it holds one of
//! `workers` semaphore permits. The permit moves into the blocking closure, so
//! a job's slot is only released when the work itself returns, even after its
//! caller stopped waiting (timeout or dropped handle).

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use tunehub_common::config::AnalysisConfig;

/// How a submitted job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    Completed(T),
    /// The job panicked or could not be scheduled
    Failed(String),
    /// The job outlived the pool's timeout; its result is discarded
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Option<Duration>,
}

impl WorkerPool {
    pub fn new(workers: usize, timeout: Option<Duration>) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.workers, config.timeout())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue `job`; the returned handle resolves once it finishes or times out
    ///
    /// Dropping the handle does not cancel the job.
    pub fn submit<T, F>(&self, label: impl Into<String>, job: F) -> JoinHandle<JobOutcome<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let timeout = self.timeout;
        let label = label.into();

        tokio::spawn(async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return JobOutcome::Failed("worker pool closed".to_string()),
            };

            tracing::debug!(job = %label, "Worker job started");

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job()
            });

            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(
                            job = %label,
                            timeout_secs = limit.as_secs_f64(),
                            "Worker job timed out, result will be discarded"
                        );
                        return JobOutcome::TimedOut;
                    }
                },
                None => handle.await,
            };

            match joined {
                Ok(value) => JobOutcome::Completed(value),
                Err(e) if e.is_panic() => {
                    let message = panic_message(e.into_panic());
                    tracing::error!(job = %label, panic = %message, "Worker job panicked");
                    JobOutcome::Failed(format!("job panicked: {}", message))
                }
                Err(e) => JobOutcome::Failed(e.to_string()),
            }
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_completed_job() {
        let pool = WorkerPool::new(2, None);
        let outcome = pool.submit("add", || 2 + 2).await.unwrap();
        assert_eq!(outcome, JobOutcome::Completed(4));
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let pool = WorkerPool::new(1, None);
        let outcome: JobOutcome<()> = pool.submit("boom", || panic!("bad input")).await.unwrap();
        match outcome {
            JobOutcome::Failed(msg) => assert!(msg.contains("bad input"), "{}", msg),
            other => panic!("unexpected outcome {:?}", other),
        }

        // the slot is released after a panic
        assert_eq!(
            pool.submit("after", || 1).await.unwrap(),
            JobOutcome::Completed(1)
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let pool = WorkerPool::new(1, Some(Duration::from_millis(50)));
        let outcome = pool
            .submit("slow", || std::thread::sleep(Duration::from_millis(400)))
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::TimedOut);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2, None);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(format!("job-{}", i), move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), JobOutcome::Completed(()));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_zero_workers_clamped() {
        assert_eq!(WorkerPool::new(0, None).workers(), 1);
    }
}
