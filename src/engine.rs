//! Orchestrates worker threads over a frozen lookup table and a streaming
//! subject source. Teacher idiom: explicit owned/shared state handed to a
//! `thread::spawn` loop exactly as `cli/pipeline.rs`'s multi-stage
//! pipeline does, down to the `panic_message` helper for turning a joined
//! thread's panic payload into a readable error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::collector::{BlobOfHsps, HspCollector};
use crate::diagnostics::{Diagnostics, WorkerDiagnostics};
use crate::effective_lengths::EffectiveLengths;
use crate::error::{EngineError, EngineResult};
use crate::extend::WordExtender;
use crate::lookup::LookupTable;
use crate::matrix::ScoreMatrix;
use crate::options::{HitSavingOptions, InitialWordOptions};
use crate::query::QueryInfo;
use crate::subject::SubjectSource;

/// Extract a human-readable message from a joined thread's panic payload.
fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct PreliminaryEngine {
    num_workers: usize,
    source: Arc<dyn SubjectSource>,
    table: Arc<LookupTable>,
    matrix: Arc<dyn ScoreMatrix>,
    effective_lengths: Arc<EffectiveLengths>,
    collector: Arc<HspCollector>,
    queries: Arc<Vec<Vec<u8>>>,
    query_info: Arc<QueryInfo>,
    initial_word: InitialWordOptions,
    hit_saving: HitSavingOptions,
    lambda: f64,
    should_stop: Arc<AtomicBool>,
    error: Arc<Mutex<Option<EngineError>>>,
}

impl PreliminaryEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_workers: usize,
        source: Arc<dyn SubjectSource>,
        table: Arc<LookupTable>,
        matrix: Arc<dyn ScoreMatrix>,
        effective_lengths: Arc<EffectiveLengths>,
        collector: Arc<HspCollector>,
        queries: Arc<Vec<Vec<u8>>>,
        query_info: Arc<QueryInfo>,
        initial_word: InitialWordOptions,
        hit_saving: HitSavingOptions,
        lambda: f64,
    ) -> Self {
        PreliminaryEngine {
            num_workers: num_workers.max(1),
            source,
            table,
            matrix,
            effective_lengths,
            collector,
            queries,
            query_info,
            initial_word,
            hit_saving,
            lambda,
            should_stop: Arc::new(AtomicBool::new(false)),
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// A clone of the cooperative cancellation flag; callers trigger
    /// cancellation by setting it from outside `run`.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.should_stop.clone()
    }

    pub fn find_error(&self) -> Option<EngineError> {
        self.error.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn run(&self) -> EngineResult<(BlobOfHsps, Diagnostics)> {
        tracing::info!(num_workers = self.num_workers, "preliminary search starting");
        let mut handles = Vec::with_capacity(self.num_workers);
        for _ in 0..self.num_workers {
            let source = self.source.clone();
            let table = self.table.clone();
            let matrix = self.matrix.clone();
            let effective_lengths = self.effective_lengths.clone();
            let collector = self.collector.clone();
            let queries = self.queries.clone();
            let query_info = self.query_info.clone();
            let initial_word = self.initial_word;
            let hit_saving = self.hit_saving;
            let lambda = self.lambda;
            let should_stop = self.should_stop.clone();
            let error_slot = self.error.clone();

            let handle = thread::spawn(move || -> WorkerDiagnostics {
                worker_loop(
                    source.as_ref(),
                    table.as_ref(),
                    matrix.as_ref(),
                    effective_lengths.as_ref(),
                    collector.as_ref(),
                    queries.as_ref(),
                    query_info.as_ref(),
                    &initial_word,
                    &hit_saving,
                    lambda,
                    &should_stop,
                    &error_slot,
                )
            });
            handles.push(handle);
        }

        let mut merged = Diagnostics::default();
        for handle in handles {
            let worker_diag = handle
                .join()
                .map_err(|e| EngineError::AllocFailed(format!("worker thread panicked: {}", panic_message(&e))))?;
            merged.merge(&worker_diag.snapshot());
        }

        if let Some(err) = self.find_error() {
            tracing::warn!(error = %err, "preliminary search aborted");
            return Err(err);
        }
        if self.should_stop.load(Ordering::Acquire) {
            tracing::warn!("preliminary search cancelled");
            return Err(EngineError::Cancelled);
        }

        let trimmed = self.collector.trim(self.hit_saving.total_hsp_limit)?;
        merged.hsps_trimmed += trimmed as u64;
        let blob = self.collector.freeze();
        tracing::info!(
            subjects_scanned = merged.subjects_scanned,
            hsps_inserted = merged.hsps_inserted,
            hsps_trimmed = merged.hsps_trimmed,
            "preliminary search finished"
        );
        Ok((blob, merged))
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    source: &dyn SubjectSource,
    table: &LookupTable,
    matrix: &dyn ScoreMatrix,
    effective_lengths: &EffectiveLengths,
    collector: &HspCollector,
    queries: &[Vec<u8>],
    query_info: &QueryInfo,
    initial_word: &InitialWordOptions,
    hit_saving: &HitSavingOptions,
    lambda: f64,
    should_stop: &AtomicBool,
    error_slot: &Mutex<Option<EngineError>>,
) -> WorkerDiagnostics {
    let start = std::time::Instant::now();
    let diagnostics = WorkerDiagnostics::new();
    let mut extender = WordExtender::new(initial_word, lambda);

    loop {
        if should_stop.load(Ordering::Acquire) {
            break;
        }

        let token = match source.next() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(e) => {
                record_error(error_slot, should_stop, e);
                break;
            }
        };

        diagnostics.subjects_scanned.fetch_add(1, Ordering::Relaxed);
        let subject = token.residues();
        let mut insert_err = None;

        table.scan(subject, 0, subject.len(), |global_query_offset, subject_offset| {
            if insert_err.is_some() || should_stop.load(Ordering::Relaxed) {
                return;
            }
            let (query_idx, local_offset) = query_info.local_offset_of(global_query_offset);
            let cutoffs = effective_lengths.for_query(query_idx);
            if let Some(hsp) = extender.extend_seed(
                query_idx,
                &queries[query_idx],
                local_offset,
                global_query_offset,
                subject,
                subject_offset,
                table.word_length(),
                matrix,
                cutoffs.ungapped_cutoff,
                &diagnostics,
            ) {
                diagnostics.hsps_inserted.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = collector.insert(query_idx, token.id(), hsp, hit_saving) {
                    insert_err = Some(e);
                }
            }
        });

        token.release();

        if let Some(e) = insert_err {
            record_error(error_slot, should_stop, e);
            break;
        }
    }

    diagnostics
        .elapsed_nanos
        .store(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
    diagnostics
}

fn record_error(error_slot: &Mutex<Option<EngineError>>, should_stop: &AtomicBool, err: EngineError) {
    let mut guard = error_slot.lock().unwrap_or_else(|p| p.into_inner());
    if guard.is_none() {
        *guard = Some(err);
    }
    should_stop.store(true, Ordering::Release);
}
