use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ApiError, InputError};

/// Fixed wait between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Poll ceiling; bounds worst-case "analyzing" exposure to ~60 s.
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// Upper bound on any single network call made by the job loop. A hung
/// request must surface as a transport error, never keep the loop alive.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(15);

/// Score report fields delivered when an analysis completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    pub verdict: Option<String>,
    pub confidence: Option<f64>,
    pub review_count: Option<u32>,
}

/// One status poll's view of the server-side job.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    pub status: String,
    pub report: AnalysisReport,
    pub error_message: Option<String>,
}

impl AnalysisSnapshot {
    pub fn pending(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            report: AnalysisReport::default(),
            error_message: None,
        }
    }
}

/// Backend analysis endpoints behind a trait seam. `create_analysis`
/// returns the server-assigned job id; non-acceptance comes back as
/// [`ApiError::Rejected`].
#[async_trait]
pub trait AnalysisTransport: Send + Sync + 'static {
    async fn create_analysis(&self, review_url: &str) -> Result<String, ApiError>;
    async fn fetch_analysis(&self, analysis_id: &str) -> Result<AnalysisSnapshot, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// Backend accepted the submission and assigned an id.
    Accepted { analysis_id: String },
    /// A poll came back non-terminal; `attempt` is the count so far.
    Polling { attempt: u32 },
    /// Exactly one of these ends every accepted job's update stream.
    Terminal(JobOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { report: AnalysisReport, attempts: u32 },
    Failed { message: String },
    Rejected { reason: String },
    TransportError { message: String },
    TimedOut { attempts: u32 },
}

impl JobOutcome {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Completed { .. } => "analysis complete".to_string(),
            Self::Failed { message } => message.clone(),
            Self::Rejected { reason } => reason.clone(),
            Self::TransportError { .. } => {
                "the analysis server could not be reached".to_string()
            }
            Self::TimedOut { .. } => {
                "the analysis is taking longer than expected; try again later".to_string()
            }
        }
    }
}

/// Handle to one submitted job: a finite update stream ending in exactly
/// one [`JobUpdate::Terminal`], plus cancellation.
#[derive(Debug)]
pub struct JobWatch {
    generation: Arc<AtomicU64>,
    job_generation: u64,
    updates: mpsc::Receiver<JobUpdate>,
}

impl JobWatch {
    /// Next update in poll order; `None` once the stream is exhausted
    /// (terminal already delivered, or the job was superseded).
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        self.updates.recv().await
    }

    /// Drains the stream to its terminal outcome. `None` means the job
    /// was cancelled or superseded before finishing.
    pub async fn wait(mut self) -> Option<JobOutcome> {
        while let Some(update) = self.updates.recv().await {
            if let JobUpdate::Terminal(outcome) = update {
                return Some(outcome);
            }
        }
        None
    }

    /// Invalidates this job's loop if it is still the live one. The
    /// loop stops at its next suspension point without emitting.
    pub fn cancel(&self) {
        let _ = self.generation.compare_exchange(
            self.job_generation,
            self.job_generation.wrapping_add(1),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// Drives submission and bounded polling of analysis jobs. At most one
/// job is live per tracker: each `submit` bumps the generation counter,
/// and a loop whose generation is stale can no longer emit — a response
/// to an older poll is discarded rather than applied.
pub struct AnalysisTracker<T> {
    transport: Arc<T>,
    poll_interval: Duration,
    max_attempts: u32,
    request_deadline: Duration,
    generation: Arc<AtomicU64>,
}

impl<T: AnalysisTransport> AnalysisTracker<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
            request_deadline: REQUEST_DEADLINE,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, ceiling: u32) -> Self {
        self.max_attempts = ceiling;
        self
    }

    /// Submits a URL for analysis. Fails synchronously with
    /// [`InputError::EmptyInput`] on trimmed-empty input, with no
    /// network call. Otherwise spawns the job loop and returns its
    /// update stream.
    pub fn submit(&self, raw_url: &str) -> Result<JobWatch, InputError> {
        let review_url = raw_url.trim().to_string();
        if review_url.is_empty() {
            return Err(InputError::EmptyInput);
        }

        let job_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel(32);
        let job = JobLoop {
            transport: Arc::clone(&self.transport),
            generation: Arc::clone(&self.generation),
            job_generation,
            poll_interval: self.poll_interval,
            max_attempts: self.max_attempts,
            request_deadline: self.request_deadline,
            updates: tx,
        };
        tokio::spawn(job.run(review_url));

        Ok(JobWatch {
            generation: Arc::clone(&self.generation),
            job_generation,
            updates: rx,
        })
    }
}

struct JobLoop<T> {
    transport: Arc<T>,
    generation: Arc<AtomicU64>,
    job_generation: u64,
    poll_interval: Duration,
    max_attempts: u32,
    request_deadline: Duration,
    updates: mpsc::Sender<JobUpdate>,
}

impl<T: AnalysisTransport> JobLoop<T> {
    async fn run(self, review_url: String) {
        let analysis_id = match self
            .bounded(self.transport.create_analysis(&review_url))
            .await
        {
            Ok(analysis_id) => analysis_id,
            Err(ApiError::Rejected { reason }) => {
                tracing::info!(reason = %reason, "analysis submission rejected");
                self.emit(JobUpdate::Terminal(JobOutcome::Rejected { reason }))
                    .await;
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "analysis submission failed");
                self.emit(JobUpdate::Terminal(JobOutcome::TransportError {
                    message: err.to_string(),
                }))
                .await;
                return;
            }
        };

        tracing::debug!(analysis_id = %analysis_id, "analysis accepted; polling");
        if !self
            .emit(JobUpdate::Accepted {
                analysis_id: analysis_id.clone(),
            })
            .await
        {
            return;
        }

        let mut attempts: u32 = 0;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if self.stale() {
                tracing::debug!(analysis_id = %analysis_id, "job superseded; stopping poll loop");
                return;
            }

            let snapshot = match self
                .bounded(self.transport.fetch_analysis(&analysis_id))
                .await
            {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(analysis_id = %analysis_id, error = %err, "poll failed");
                    self.emit(JobUpdate::Terminal(JobOutcome::TransportError {
                        message: err.to_string(),
                    }))
                    .await;
                    return;
                }
            };

            match snapshot.status.as_str() {
                "completed" => {
                    self.emit(JobUpdate::Terminal(JobOutcome::Completed {
                        report: snapshot.report,
                        attempts,
                    }))
                    .await;
                    return;
                }
                "failed" => {
                    let message = snapshot
                        .error_message
                        .unwrap_or_else(|| "analysis failed".to_string());
                    self.emit(JobUpdate::Terminal(JobOutcome::Failed { message }))
                        .await;
                    return;
                }
                _ => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        tracing::info!(analysis_id = %analysis_id, attempts, "poll ceiling reached");
                        self.emit(JobUpdate::Terminal(JobOutcome::TimedOut { attempts }))
                            .await;
                        return;
                    }
                    if !self.emit(JobUpdate::Polling { attempt: attempts }).await {
                        return;
                    }
                }
            }
        }
    }

    async fn bounded<F, R>(&self, call: F) -> Result<R, ApiError>
    where
        F: Future<Output = Result<R, ApiError>>,
    {
        match tokio::time::timeout(self.request_deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Transport {
                message: "request deadline elapsed".to_string(),
            }),
        }
    }

    fn stale(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.job_generation
    }

    /// Applies an update unless this loop has been superseded or the
    /// watcher is gone. Returns false when the loop must stop.
    async fn emit(&self, update: JobUpdate) -> bool {
        if self.stale() {
            return false;
        }
        self.updates.send(update).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::Notify;
    use tokio::time::Instant;

    use super::*;

    struct ScriptedTransport {
        create_result: Result<String, ApiError>,
        polls: Mutex<Vec<Result<AnalysisSnapshot, ApiError>>>,
        create_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        fn accepting(analysis_id: &str, polls: Vec<Result<AnalysisSnapshot, ApiError>>) -> Self {
            Self {
                create_result: Ok(analysis_id.to_string()),
                polls: Mutex::new(polls),
                create_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn completed_snapshot(verdict: &str, confidence: f64) -> AnalysisSnapshot {
            AnalysisSnapshot {
                status: "completed".to_string(),
                report: AnalysisReport {
                    verdict: Some(verdict.to_string()),
                    confidence: Some(confidence),
                    review_count: Some(120),
                },
                error_message: None,
            }
        }
    }

    #[async_trait]
    impl AnalysisTransport for Arc<ScriptedTransport> {
        async fn create_analysis(&self, _review_url: &str) -> Result<String, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.create_result.clone()
        }

        async fn fetch_analysis(&self, _analysis_id: &str) -> Result<AnalysisSnapshot, ApiError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut polls = self.polls.lock().expect("polls lock");
            if polls.is_empty() {
                Ok(AnalysisSnapshot::pending("running"))
            } else {
                polls.remove(0)
            }
        }
    }

    async fn drain(mut watch: JobWatch) -> Vec<JobUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = watch.next_update().await {
            let terminal = matches!(update, JobUpdate::Terminal(_));
            updates.push(update);
            if terminal {
                break;
            }
        }
        updates
    }

    #[tokio::test]
    async fn whitespace_input_fails_synchronously_without_network() {
        let transport = Arc::new(ScriptedTransport::accepting("abc123", Vec::new()));
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let err = tracker.submit("   ").expect_err("empty input");
        assert_eq!(err, InputError::EmptyInput);
        assert_eq!(transport.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn two_running_polls_then_completion_emits_one_terminal() {
        let transport = Arc::new(ScriptedTransport::accepting(
            "abc123",
            vec![
                Ok(AnalysisSnapshot::pending("running")),
                Ok(AnalysisSnapshot::pending("running")),
                Ok(ScriptedTransport::completed_snapshot("trustworthy", 82.0)),
            ],
        ));
        let tracker = AnalysisTracker::new(Arc::clone(&transport));
        let started = Instant::now();

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let updates = drain(watch).await;

        assert_eq!(
            updates,
            vec![
                JobUpdate::Accepted {
                    analysis_id: "abc123".to_string()
                },
                JobUpdate::Polling { attempt: 1 },
                JobUpdate::Polling { attempt: 2 },
                JobUpdate::Terminal(JobOutcome::Completed {
                    report: AnalysisReport {
                        verdict: Some("trustworthy".to_string()),
                        confidence: Some(82.0),
                        review_count: Some(120),
                    },
                    attempts: 2,
                }),
            ]
        );
        assert_eq!(started.elapsed(), Duration::from_millis(6000));
        assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn always_running_backend_times_out_after_exactly_thirty_polls() {
        let transport = Arc::new(ScriptedTransport::accepting("abc123", Vec::new()));
        let tracker = AnalysisTracker::new(Arc::clone(&transport));
        let started = Instant::now();

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let outcome = watch.wait().await;

        assert_eq!(outcome, Some(JobOutcome::TimedOut { attempts: 30 }));
        assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 30);
        assert_eq!(started.elapsed(), Duration::from_millis(30 * 2000));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_rejection_skips_polling() {
        let transport = Arc::new(ScriptedTransport {
            create_result: Err(ApiError::Rejected {
                reason: "not a supported product url".to_string(),
            }),
            polls: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            gate: None,
        });
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let outcome = watch.wait().await;

        assert_eq!(
            outcome,
            Some(JobOutcome::Rejected {
                reason: "not a supported product url".to_string()
            })
        );
        assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_transport_failure_is_terminal_immediately() {
        let transport = Arc::new(ScriptedTransport {
            create_result: Err(ApiError::Transport {
                message: "connect error".to_string(),
            }),
            polls: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            gate: None,
        });
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let outcome = watch.wait().await;

        assert!(matches!(outcome, Some(JobOutcome::TransportError { .. })));
        assert_eq!(transport.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_poll_failure_terminates_the_loop() {
        let transport = Arc::new(ScriptedTransport::accepting(
            "abc123",
            vec![
                Ok(AnalysisSnapshot::pending("running")),
                Err(ApiError::Transport {
                    message: "connection reset".to_string(),
                }),
            ],
        ));
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let outcome = watch.wait().await;

        assert!(matches!(outcome, Some(JobOutcome::TransportError { .. })));
        assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_status_surfaces_backend_message() {
        let transport = Arc::new(ScriptedTransport::accepting(
            "abc123",
            vec![Ok(AnalysisSnapshot {
                status: "failed".to_string(),
                report: AnalysisReport::default(),
                error_message: Some("could not crawl reviews".to_string()),
            })],
        ));
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let outcome = watch.wait().await;

        assert_eq!(
            outcome,
            Some(JobOutcome::Failed {
                message: "could not crawl reviews".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_poll_call_hits_the_request_deadline() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport {
            create_result: Ok("abc123".to_string()),
            polls: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            gate: Some(Arc::clone(&gate)),
        });
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let watch = tracker.submit("http://shop.example/item/1").expect("submit");
        let outcome = watch.wait().await;

        assert_eq!(
            outcome,
            Some(JobOutcome::TransportError {
                message: "transport failed: request deadline elapsed".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_poll_response_cannot_reach_a_newer_job() {
        let gate = Arc::new(Notify::new());
        let slow = Arc::new(ScriptedTransport {
            create_result: Ok("job-a".to_string()),
            polls: Mutex::new(vec![Ok(ScriptedTransport::completed_snapshot(
                "suspicious",
                12.0,
            ))]),
            create_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            gate: Some(Arc::clone(&gate)),
        });
        let tracker = AnalysisTracker::new(Arc::clone(&slow));

        let mut watch_a = tracker.submit("http://shop.example/item/1").expect("submit a");
        assert_eq!(
            watch_a.next_update().await,
            Some(JobUpdate::Accepted {
                analysis_id: "job-a".to_string()
            })
        );

        // Let A pass its post-sleep staleness check and park inside the
        // first poll request.
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Submitting B makes A's generation stale before A's response
        // arrives; releasing the gate delivers A's completed snapshot,
        // which must be discarded rather than applied.
        let watch_b = tracker.submit("http://shop.example/item/2").expect("submit b");
        gate.notify_waiters();

        assert_eq!(watch_a.next_update().await, None);
        drop(watch_b);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_loop_without_a_terminal_update() {
        let transport = Arc::new(ScriptedTransport::accepting("abc123", Vec::new()));
        let tracker = AnalysisTracker::new(Arc::clone(&transport));

        let mut watch = tracker.submit("http://shop.example/item/1").expect("submit");
        assert_eq!(
            watch.next_update().await,
            Some(JobUpdate::Accepted {
                analysis_id: "abc123".to_string()
            })
        );

        watch.cancel();
        let mut saw_terminal = false;
        while let Some(update) = watch.next_update().await {
            saw_terminal |= matches!(update, JobUpdate::Terminal(_));
        }
        assert!(!saw_terminal);
    }
}
