//! Pipeline driver
//!
//! Streams a batch source through extract → \[resolve\] → submit.
//!
//! Items are dispatched in source order onto a bounded set of tasks. The
//! run tally, the de-duplication set and completion tracking are owned by
//! the dispatch loop alone, so workers never share mutable state.
//!
//! On interrupt the loop stops dispatching. Lookups still in flight are
//! abandoned; submissions already sent are awaited, so a record is either
//! submitted or not, never half-way. The report then carries the lowest
//! offset that did not complete, which is where a later run resumes.

use crate::api::{Resolver, Submitter};
use crate::config::IngestConfig;
use crate::extract::Extractor;
use crate::model::{
    CandidateIdentifier, ExtractedRecord, ExtractionSource, LookupResult, SubmissionRecord,
    SubmitOutcome,
};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Whether records must be confirmed by the lookup authority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Submit extracted records as they are
    Direct,
    /// Resolve first; only `Found` identifiers are submitted
    Resolve,
}

/// Driver knobs, usually derived from [`IngestConfig`]
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub mode: Mode,
    /// Extract and resolve, but never call the submitter
    pub dry_run: bool,
    pub default_user: String,
    pub concurrency: usize,
    pub min_interval: Option<Duration>,
    pub max_retries: u32,
    pub retry_base: Duration,
}

impl DriverOptions {
    pub fn from_config(config: &IngestConfig, mode: Mode) -> Self {
        Self {
            mode,
            dry_run: false,
            default_user: config.default_user.clone(),
            concurrency: config.concurrency.max(1),
            min_interval: config.min_interval(),
            max_retries: config.max_retries,
            retry_base: config.retry_base(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    /// Items that finished (not counting ones abandoned on interrupt)
    pub processed: u64,
    /// Identifiers the lookup authority confirmed
    pub found: u64,
    pub not_found: u64,
    /// Invalid sources and in-run duplicates
    pub skipped: u64,
    /// Lookups still failing after all retries
    pub unresolved: u64,
    pub submitted: u64,
    pub failed: u64,
    pub found_ids: Vec<String>,
    pub unresolved_ids: Vec<String>,
    pub failed_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Completed,
    Interrupted,
}

/// What a finished pass hands back to its caller
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    pub tally: RunTally,
    /// Lowest source offset that did not complete
    pub resume_offset: u64,
    /// Records a dry run would have submitted, in completion order
    pub planned: Vec<SubmissionRecord>,
}

/// Lowest offset not yet completed, tolerant of out-of-order completion
#[derive(Debug)]
struct Watermark {
    next: u64,
    done: BTreeSet<u64>,
}

impl Watermark {
    fn new(start: u64) -> Self {
        Self {
            next: start,
            done: BTreeSet::new(),
        }
    }

    fn complete(&mut self, offset: u64) {
        if offset < self.next {
            return;
        }
        self.done.insert(offset);
        while self.done.remove(&self.next) {
            self.next += 1;
        }
    }
}

#[derive(Debug)]
enum ItemOutcome {
    NotFound,
    Unresolved(String),
    Submitted { found: bool },
    Planned { record: SubmissionRecord, found: bool },
    Failed { cause: String, found: bool },
    Cancelled,
}

/// Orchestrates one pipeline pass
pub struct Driver {
    extractor: Arc<Extractor>,
    resolver: Arc<dyn Resolver>,
    submitter: Arc<dyn Submitter>,
    options: DriverOptions,
    progress: ProgressBar,
    cancel: CancellationToken,
}

impl Driver {
    pub fn new(
        extractor: Extractor,
        resolver: Arc<dyn Resolver>,
        submitter: Arc<dyn Submitter>,
        options: DriverOptions,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            resolver,
            submitter,
            options,
            progress: ProgressBar::hidden(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the pass over `(offset, source)` items until the source is
    /// exhausted or the cancellation token fires.
    pub async fn run<I>(&self, items: I, start_offset: u64) -> RunReport
    where
        I: IntoIterator<Item = (u64, ExtractionSource)>,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut ticker = self.options.min_interval.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let mut tasks: JoinSet<(u64, CandidateIdentifier, ItemOutcome)> = JoinSet::new();
        let mut tally = RunTally::default();
        let mut planned = Vec::new();
        let mut watermark = Watermark::new(start_offset);
        let mut seen: HashSet<CandidateIdentifier> = HashSet::new();
        let mut state = RunState::Completed;
        let mut items = items.into_iter();

        info!(mode = ?self.options.mode, dry_run = self.options.dry_run, start_offset, "Pipeline started");

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    state = RunState::Interrupted;
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            while let Some(joined) = tasks.try_join_next() {
                self.settle(joined, &mut tally, &mut watermark, &mut planned);
            }

            if let Some(ticker) = ticker.as_mut() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        state = RunState::Interrupted;
                        break;
                    }
                    _ = ticker.tick() => {}
                }
            }

            let Some((offset, source)) = items.next() else {
                break;
            };
            self.progress.set_message(describe_source(offset, &source));
            self.progress.inc(1);

            let Some(record) = self.extractor.extract(&source) else {
                debug!(offset, "Skipped source without identifier");
                tally.processed += 1;
                tally.skipped += 1;
                watermark.complete(offset);
                continue;
            };

            if !seen.insert(record.identifier.clone()) {
                debug!(identifier = %record.identifier, "Skipped duplicate identifier");
                tally.processed += 1;
                tally.skipped += 1;
                watermark.complete(offset);
                continue;
            }

            let resolver = Arc::clone(&self.resolver);
            let submitter = Arc::clone(&self.submitter);
            let options = self.options.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let identifier = record.identifier.clone();
                let outcome = process(record, resolver.as_ref(), submitter.as_ref(), &options, &cancel).await;
                (offset, identifier, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.settle(joined, &mut tally, &mut watermark, &mut planned);
        }

        if self.cancel.is_cancelled() {
            state = RunState::Interrupted;
        }
        self.progress.finish_and_clear();

        info!(
            state = ?state,
            processed = tally.processed,
            found = tally.found,
            skipped = tally.skipped,
            submitted = tally.submitted,
            failed = tally.failed,
            resume_offset = watermark.next,
            "Pipeline finished"
        );

        RunReport {
            state,
            tally,
            resume_offset: watermark.next,
            planned,
        }
    }

    fn settle(
        &self,
        joined: Result<(u64, CandidateIdentifier, ItemOutcome), tokio::task::JoinError>,
        tally: &mut RunTally,
        watermark: &mut Watermark,
        planned: &mut Vec<SubmissionRecord>,
    ) {
        let (offset, identifier, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                // the offset is lost with the task, so the watermark stays put
                error!(error = %e, "Pipeline worker panicked");
                return;
            },
        };

        let found = match &outcome {
            ItemOutcome::Submitted { found }
            | ItemOutcome::Planned { found, .. }
            | ItemOutcome::Failed { found, .. } => *found,
            _ => false,
        };
        if found {
            tally.found += 1;
            tally.found_ids.push(identifier.to_string());
            self.progress.println(format!("Found: {identifier}"));
        }

        match outcome {
            ItemOutcome::Cancelled => return,
            ItemOutcome::NotFound => tally.not_found += 1,
            ItemOutcome::Unresolved(cause) => {
                warn!(%identifier, cause = %cause, "Lookup unresolved after retries");
                tally.unresolved += 1;
                tally.unresolved_ids.push(identifier.to_string());
            },
            ItemOutcome::Submitted { .. } => tally.submitted += 1,
            ItemOutcome::Planned { record, .. } => planned.push(record),
            ItemOutcome::Failed { cause, .. } => {
                error!(%identifier, cause = %cause, "Submission failed");
                tally.failed += 1;
                tally.failed_ids.push(identifier.to_string());
            },
        }

        tally.processed += 1;
        watermark.complete(offset);
    }
}

fn describe_source(offset: u64, source: &ExtractionSource) -> String {
    match source {
        ExtractionSource::Line(line) => line.clone(),
        ExtractionSource::Row(_) => format!("row {}", offset + 1),
    }
}

async fn process(
    record: ExtractedRecord,
    resolver: &dyn Resolver,
    submitter: &dyn Submitter,
    options: &DriverOptions,
    cancel: &CancellationToken,
) -> ItemOutcome {
    let found = match options.mode {
        Mode::Direct => false,
        Mode::Resolve => match resolve_with_retry(resolver, &record.identifier, options, cancel).await {
            None => return ItemOutcome::Cancelled,
            Some(LookupResult::Found(payload)) => {
                debug!(identifier = %record.identifier, payload = %payload, "Resolved");
                true
            },
            Some(LookupResult::NotFound) => return ItemOutcome::NotFound,
            Some(LookupResult::TransientError(cause)) => return ItemOutcome::Unresolved(cause),
        },
    };

    let submission = SubmissionRecord::from_extracted(&record, &options.default_user);
    if options.dry_run {
        return ItemOutcome::Planned {
            record: submission,
            found,
        };
    }

    match submitter.submit(&submission).await {
        SubmitOutcome::Ok => {
            debug!(identifier = %record.identifier, "Submitted");
            ItemOutcome::Submitted { found }
        },
        SubmitOutcome::Failed(cause) => ItemOutcome::Failed { cause, found },
    }
}

/// Resolve, retrying transient errors with exponential backoff.
///
/// Returns `None` when cancelled; the final `TransientError` once retries
/// are exhausted.
pub async fn resolve_with_retry(
    resolver: &dyn Resolver,
    identifier: &CandidateIdentifier,
    options: &DriverOptions,
    cancel: &CancellationToken,
) -> Option<LookupResult> {
    let mut attempt = 0;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = resolver.resolve(identifier) => result,
        };

        let LookupResult::TransientError(ref cause) = result else {
            return Some(result);
        };
        if attempt >= options.max_retries {
            return Some(result);
        }

        attempt += 1;
        let delay = options.retry_delay(attempt);
        debug!(%identifier, attempt, delay_ms = delay.as_millis() as u64, cause = %cause, "Retrying lookup");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
