//! Bounded worker pool driving case jobs.
//!
//! The dispatcher runs on the calling thread and hands jobs, in row order, to
//! a fixed pool of scoped worker threads over a rendezvous channel, so a job
//! leaves the queue only when a worker is idle. Workers record each outcome in
//! the shared [`BatchReport`] and report back over an event channel; the
//! dispatcher applies the stop policy to those events before handing out the
//! next job.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Select, Sender, TryRecvError, TrySendError};
use tracing::{Span, debug, error, info, info_span, warn};

use casegen_model::{
    BatchStages, ExistingOutputPolicy, InFlightPolicy, JobOutcome, JobState, JobStatus,
    StopPolicy,
};
use casegen_render::{CaseJob, PreparedJob};

use crate::builder::{BuildRequest, CancelToken, CaseBuilder};
use crate::error::{BuildError, SchedulerError};
use crate::report::BatchReport;

/// Skip reason for jobs left undispatched after an abort.
pub const ABORTED_REASON: &str = "aborted";
/// Failure reason for jobs stopped through the cancel token.
pub const CANCELLED_REASON: &str = "cancelled";
pub const EXISTING_OUTPUTS_REASON: &str = "existing outputs";
pub const PREREQUISITES_REASON: &str = "prerequisite stage not completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Upper bound on concurrently running jobs.
    pub max_concurrency: usize,
    /// Internal parallelism passed to each builder invocation.
    pub parallelism_hint: usize,
    pub stop_policy: StopPolicy,
    pub in_flight: InFlightPolicy,
    pub existing_outputs: ExistingOutputPolicy,
    pub build_timeout: Option<Duration>,
    pub stages: BatchStages,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            parallelism_hint: 1,
            stop_policy: StopPolicy::default(),
            in_flight: InFlightPolicy::default(),
            existing_outputs: ExistingOutputPolicy::default(),
            build_timeout: None,
            stages: BatchStages::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    options: SchedulerOptions,
}

enum Fatal {
    WorkerSpawn { index: usize, source: std::io::Error },
    ChannelClosed { pending: usize },
}

impl BatchScheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Run every job and return the report.
    ///
    /// # Errors
    ///
    /// Returns a [`SchedulerError`] when the pool cannot be started or a
    /// worker disappears; the error carries the outcomes recorded so far.
    pub fn run<B>(&self, jobs: Vec<PreparedJob>, builder: &B) -> Result<BatchReport, SchedulerError>
    where
        B: CaseBuilder + ?Sized,
    {
        self.run_with_observer(jobs, builder, |_| {})
    }

    /// Like [`run`](Self::run), calling `observer` on the dispatcher thread
    /// once for every recorded outcome.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_observer<B, F>(
        &self,
        jobs: Vec<PreparedJob>,
        builder: &B,
        mut observer: F,
    ) -> Result<BatchReport, SchedulerError>
    where
        B: CaseBuilder + ?Sized,
        F: FnMut(&JobOutcome),
    {
        let report = BatchReport::new();
        let cancel = CancelToken::new();
        let total = jobs.len();
        let ready = jobs
            .iter()
            .filter(|job| matches!(job, PreparedJob::Ready(_)))
            .count();
        let workers = self.options.max_concurrency.max(1).min(ready);

        let span = info_span!("batch", total, workers, builder = builder.name());
        let _guard = span.enter();
        info!(
            max_concurrency = self.options.max_concurrency,
            parallelism_hint = self.options.parallelism_hint,
            rejected = total - ready,
            "batch started"
        );

        let worker = Worker {
            options: &self.options,
            builder,
            report: &report,
            cancel: &cancel,
            span: span.clone(),
        };
        let fatal = thread::scope(|scope| {
            let (job_tx, job_rx) = crossbeam_channel::bounded::<Box<CaseJob>>(0);
            let (event_tx, event_rx) = crossbeam_channel::unbounded::<JobOutcome>();
            let worker = &worker;
            for index in 0..workers {
                let jobs = job_rx.clone();
                let events = event_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("casegen-worker-{index}"))
                    .spawn_scoped(scope, move || worker.run(jobs, events));
                if let Err(source) = spawned {
                    error!(index, %source, "failed to spawn worker");
                    return Some(Fatal::WorkerSpawn { index, source });
                }
            }
            drop(job_rx);
            drop(event_tx);

            let mut dispatcher = Dispatcher {
                options: &self.options,
                report: &report,
                cancel: &cancel,
                in_flight: 0,
                aborted: false,
            };
            dispatcher
                .run(jobs, job_tx, &event_rx, &mut observer)
                .err()
        });
        drop(worker);

        report.finish();
        let summary = report.summary();
        match fatal {
            None => {
                info!(
                    status = %report.status(),
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "batch finished"
                );
                Ok(report)
            }
            Some(Fatal::WorkerSpawn { index, source }) => Err(SchedulerError::WorkerSpawn {
                index,
                source,
                report: Box::new(report),
            }),
            Some(Fatal::ChannelClosed { pending }) => {
                error!(pending, "worker channel closed");
                Err(SchedulerError::ChannelClosed {
                    pending,
                    report: Box::new(report),
                })
            }
        }
    }
}

struct Dispatcher<'a> {
    options: &'a SchedulerOptions,
    report: &'a BatchReport,
    cancel: &'a CancelToken,
    in_flight: usize,
    aborted: bool,
}

impl Dispatcher<'_> {
    fn run<F: FnMut(&JobOutcome)>(
        &mut self,
        jobs: Vec<PreparedJob>,
        job_tx: Sender<Box<CaseJob>>,
        events: &Receiver<JobOutcome>,
        observer: &mut F,
    ) -> Result<(), Fatal> {
        let mut queue: VecDeque<PreparedJob> = jobs.into();

        while !queue.is_empty() {
            self.drain(events, observer);
            self.settle_head(&mut queue, observer);
            if queue.is_empty() {
                break;
            }

            let mut select = Select::new();
            let send_index = select.send(&job_tx);
            select.recv(events);
            if select.ready() != send_index || !events.is_empty() {
                // Completions go first so the stop policy sees them before the next dispatch.
                match events.try_recv() {
                    Ok(outcome) => self.complete(&outcome, observer),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        return Err(Fatal::ChannelClosed {
                            pending: self.in_flight + queue.len(),
                        });
                    }
                }
                continue;
            }

            let Some(PreparedJob::Ready(job)) = queue.pop_front() else {
                continue;
            };
            let case = job.case.clone();
            match job_tx.try_send(job) {
                Ok(()) => {
                    self.in_flight += 1;
                    debug!(case = %case, state = %JobState::Dispatched, in_flight = self.in_flight, "job dispatched");
                }
                Err(TrySendError::Full(job)) => queue.push_front(PreparedJob::Ready(job)),
                Err(TrySendError::Disconnected(job)) => {
                    queue.push_front(PreparedJob::Ready(job));
                    return Err(Fatal::ChannelClosed {
                        pending: self.in_flight + queue.len(),
                    });
                }
            }
        }

        drop(job_tx);
        while self.in_flight > 0 {
            match events.recv() {
                Ok(outcome) => self.complete(&outcome, observer),
                Err(_) => {
                    return Err(Fatal::ChannelClosed {
                        pending: self.in_flight,
                    });
                }
            }
        }
        Ok(())
    }

    fn drain<F: FnMut(&JobOutcome)>(&mut self, events: &Receiver<JobOutcome>, observer: &mut F) {
        while let Ok(outcome) = events.try_recv() {
            self.complete(&outcome, observer);
        }
    }

    /// Record rejected jobs at the head of the queue, or every remaining job
    /// once the batch is aborted.
    fn settle_head<F: FnMut(&JobOutcome)>(
        &mut self,
        queue: &mut VecDeque<PreparedJob>,
        observer: &mut F,
    ) {
        loop {
            if self.aborted {
                if !queue.is_empty() {
                    self.report.mark_aborted();
                }
                for job in queue.drain(..) {
                    let outcome = JobOutcome::skipped(job.case().clone(), ABORTED_REASON);
                    self.record(outcome, observer);
                }
                return;
            }
            if !matches!(queue.front(), Some(PreparedJob::Rejected { .. })) {
                return;
            }
            if let Some(PreparedJob::Rejected { case, reason }) = queue.pop_front() {
                warn!(case = %case, state = %JobState::Failed, %reason, "job rejected before dispatch");
                self.record(JobOutcome::failed(case, reason), observer);
            }
        }
    }

    fn record<F: FnMut(&JobOutcome)>(&mut self, outcome: JobOutcome, observer: &mut F) {
        if self.report.record(outcome.clone()) {
            self.observe(&outcome, observer);
        }
    }

    fn complete<F: FnMut(&JobOutcome)>(&mut self, outcome: &JobOutcome, observer: &mut F) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.observe(outcome, observer);
    }

    fn observe<F: FnMut(&JobOutcome)>(&mut self, outcome: &JobOutcome, observer: &mut F) {
        observer(outcome);
        if outcome.status.is_failed()
            && !self.aborted
            && self.options.stop_policy == StopPolicy::AbortOnFirstError
        {
            self.abort(outcome);
        }
    }

    /// Stop dispatching. The batch only counts as aborted once a pending job
    /// is skipped or a running one is cancelled; a failure on the last job
    /// leaves it partially failed.
    fn abort(&mut self, cause: &JobOutcome) {
        self.aborted = true;
        warn!(case = %cause.case, in_flight = self.in_flight, "stopping dispatch after failure");
        if self.options.in_flight == InFlightPolicy::Cancel {
            self.cancel.cancel();
            if self.in_flight > 0 {
                self.report.mark_aborted();
                warn!(in_flight = self.in_flight, "cancelling running jobs");
            }
        }
    }
}

struct Worker<'a, B: ?Sized> {
    options: &'a SchedulerOptions,
    builder: &'a B,
    report: &'a BatchReport,
    cancel: &'a CancelToken,
    span: Span,
}

struct JobFailure {
    reason: String,
    diagnostic: Option<String>,
}

impl JobFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            diagnostic: None,
        }
    }
}

impl From<BuildError> for JobFailure {
    fn from(error: BuildError) -> Self {
        Self {
            diagnostic: error.diagnostic().map(str::to_string),
            reason: error.to_string(),
        }
    }
}

impl<B: CaseBuilder + ?Sized> Worker<'_, B> {
    fn run(&self, jobs: Receiver<Box<CaseJob>>, events: Sender<JobOutcome>) {
        let _guard = self.span.enter();
        for job in jobs {
            let outcome = self.execute(&job);
            self.report.record(outcome.clone());
            if events.send(outcome).is_err() {
                break;
            }
        }
    }

    fn execute(&self, job: &CaseJob) -> JobOutcome {
        let span = info_span!("case", case = %job.case);
        let _guard = span.enter();
        debug!(state = %JobState::Running, "job started");

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process(job)));
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let case = job.case.clone();
        let outcome = match result {
            Ok(Ok(None)) => JobOutcome::succeeded(case),
            Ok(Ok(Some(reason))) => JobOutcome::skipped(case, reason),
            Ok(Err(failure)) => {
                let outcome = JobOutcome::failed(case, failure.reason);
                match failure.diagnostic {
                    Some(diagnostic) => outcome.with_diagnostic(diagnostic),
                    None => outcome,
                }
            }
            Err(payload) => {
                JobOutcome::failed(case, format!("panicked: {}", panic_message(&*payload)))
            }
        }
        .with_elapsed_ms(duration_ms);

        match &outcome.status {
            JobStatus::Succeeded => {
                info!(status = "succeeded", state = %JobState::Completed, duration_ms, "case finished");
            }
            JobStatus::Skipped(reason) => {
                info!(status = "skipped", state = %JobState::Completed, %reason, duration_ms, "case finished");
            }
            JobStatus::Failed(reason) => {
                warn!(status = "failed", state = %JobState::Failed, %reason, duration_ms, "case finished");
            }
        }
        outcome
    }

    /// Returns a skip reason, or `None` when the job completed.
    fn process(&self, job: &CaseJob) -> Result<Option<&'static str>, JobFailure> {
        if self.cancel.is_cancelled() {
            return Err(JobFailure::new(CANCELLED_REASON));
        }
        let stages = self.options.stages;
        if self.options.existing_outputs == ExistingOutputPolicy::Skip
            && job.has_existing_outputs()
        {
            return Ok(Some(EXISTING_OUTPUTS_REASON));
        }
        if stages.renders_anything() {
            let written = job
                .write_files()
                .map_err(|error| JobFailure::new(error.to_string()))?;
            debug!(files = written.len(), "case files written");
        }
        if !stages.invoke_builder {
            return Ok(None);
        }
        if !stages.prerequisites_ready {
            return Ok(Some(PREREQUISITES_REASON));
        }

        let inputs = job.build_inputs.as_ref().ok_or_else(|| BuildError::MissingInputs {
            path: job.case_dir.clone(),
        })?;
        for path in [&inputs.sim_file, &inputs.macro_file] {
            if !path.is_file() {
                return Err(BuildError::MissingInputs { path: path.clone() }.into());
            }
        }

        let log_path = job.log_path();
        let request = BuildRequest {
            case: &job.case,
            inputs,
            case_dir: &job.case_dir,
            log_path: &log_path,
            parallelism_hint: self.options.parallelism_hint,
            timeout: self.options.build_timeout,
            cancel: self.cancel,
        };
        let output = self.builder.build(&request)?;
        debug!(exit_code = ?output.exit_code, "builder finished");
        Ok(None)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_common_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
