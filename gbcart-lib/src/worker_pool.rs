//! Worker pool that feeds cartridge requests to a shared session.
//!
//! Spawns N persistent tokio tasks that pull jobs from a bounded
//! async-channel and run each one on a blocking thread. Results are sent
//! to an unbounded channel for consumption by the caller.
//!
//! The session itself serializes access to the link, so N > 1 only means
//! more requests can wait in `Acquiring` instead of in the channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::error::CartError;
use crate::session::{Outcome, Request, RequestControl, Session};

/// Default hard limit per job. A full erase plus program of the largest
/// cartridges stays well below it.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// A request tagged with a caller-chosen id.
#[derive(Debug)]
pub struct Job {
    pub id: u64,
    pub request: Request,
    pub control: RequestControl,
}

impl Job {
    pub fn new(id: u64, request: Request) -> Self {
        Self {
            id,
            request,
            control: RequestControl::default(),
        }
    }

    pub fn with_control(mut self, control: RequestControl) -> Self {
        self.control = control;
        self
    }
}

/// The outcome of one job.
#[derive(Debug)]
pub struct JobResult {
    pub id: u64,
    pub result: Result<Outcome, CartError>,
}

/// A pool of worker tasks running jobs against one session.
///
/// # Example
///
/// ```ignore
/// let mut pool = RequestPool::start(1, session);
/// pool.submit(Job::new(1, Request::ReadHeader)).await?;
/// pool.close();
/// while let Some(done) = pool.recv().await {
///     handle(done);
/// }
/// ```
pub struct RequestPool {
    work_tx: async_channel::Sender<Job>,
    result_rx: mpsc::UnboundedReceiver<JobResult>,
    _handles: Vec<JoinHandle<()>>,
}

impl RequestPool {
    /// Spawn `n` workers with the default per-job timeout.
    pub fn start(n: usize, session: Arc<Session>) -> Self {
        Self::start_with_timeout(n, session, DEFAULT_JOB_TIMEOUT)
    }

    /// Spawn `n` workers. Jobs are submitted via a bounded channel
    /// (capacity `n`) providing natural backpressure.
    ///
    /// When a job outlives `job_timeout` its cancellation token is fired
    /// and the worker waits for the engine to notice. The job still
    /// reports a result, normally `Cancelled`.
    pub fn start_with_timeout(n: usize, session: Arc<Session>, job_timeout: Duration) -> Self {
        let n = n.max(1);
        let (work_tx, work_rx) = async_channel::bounded::<Job>(n);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<JobResult>();

        // Each worker gets a cloned Receiver (no Mutex needed)
        let handles: Vec<JoinHandle<()>> = (0..n)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    while let Ok(job) = work_rx.recv().await {
                        let result = run_job(&session, job, job_timeout).await;
                        if result_tx.send(result).is_err() {
                            break; // Receiver dropped
                        }
                    }
                })
            })
            .collect();

        // Drop our copy of result_tx so the channel closes when all workers finish
        drop(result_tx);

        Self {
            work_tx,
            result_rx,
            _handles: handles,
        }
    }

    /// Queue a job, waiting while all workers are busy and the channel is full.
    pub async fn submit(&self, job: Job) -> Result<(), CartError> {
        self.work_tx
            .send(job)
            .await
            .map_err(|_| CartError::Worker("request pool is closed".into()))
    }

    /// Stop accepting jobs. Queued jobs still run.
    pub fn close(&self) {
        self.work_tx.close();
    }

    /// Receive the next result. Returns `None` once the pool is closed and
    /// every worker has shut down.
    pub async fn recv(&mut self) -> Option<JobResult> {
        self.result_rx.recv().await
    }
}

async fn run_job(session: &Arc<Session>, job: Job, job_timeout: Duration) -> JobResult {
    let Job {
        id,
        request,
        control,
    } = job;
    let cancel = control.cancel.clone();
    let session = Arc::clone(session);
    let mut task = tokio::task::spawn_blocking(move || session.execute(request, &control));

    let joined = match tokio::time::timeout(job_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            log::warn!(
                "request {} still running after {}s, cancelling it",
                id,
                job_timeout.as_secs()
            );
            cancel.cancel();
            task.await
        }
    };
    let result = joined.unwrap_or_else(|e| Err(CartError::Worker(e.to_string())));
    JobResult { id, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;
    use crate::session::SessionConfig;
    use crate::sim::{SimulatedCartridge, synthetic_rom};

    fn session() -> Arc<Session> {
        let sim = SimulatedCartridge::new(synthetic_rom("POOL", 0x19, 0x01, 0x00));
        Arc::new(Session::new(Link::new(sim), SessionConfig::default()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_every_job() {
        let mut pool = RequestPool::start(2, session());
        for id in 0..4 {
            pool.submit(Job::new(id, Request::ReadHeader)).await.unwrap();
        }
        pool.close();

        let mut ids = Vec::new();
        while let Some(done) = pool.recv().await {
            assert!(matches!(done.result, Ok(Outcome::Header(_))));
            ids.push(done.id);
        }
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_after_close_fails() {
        let pool = RequestPool::start(1, session());
        pool.close();
        let err = pool.submit(Job::new(1, Request::ReadHeader)).await.unwrap_err();
        assert!(matches!(err, CartError::Worker(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overdue_job_is_cancelled() {
        let sim = SimulatedCartridge::new(synthetic_rom("SLOW", 0x19, 0x01, 0x00));
        sim.set_mute(true);
        let config = SessionConfig {
            timing: crate::wire::Timing {
                response: Duration::from_secs(30),
                ..Default::default()
            },
            ..Default::default()
        };
        let session = Arc::new(Session::new(Link::new(sim), config));
        let mut pool = RequestPool::start_with_timeout(1, session, Duration::from_millis(100));
        pool.submit(Job::new(7, Request::ReadHeader)).await.unwrap();
        pool.close();

        let done = pool.recv().await.unwrap();
        assert_eq!(done.id, 7);
        assert!(matches!(done.result, Err(CartError::Cancelled)));
    }
}
