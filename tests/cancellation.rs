//! End-to-end: flipping the cooperative cancellation flag mid-run stops
//! the workers, surfaces `Cancelled`, and never freezes the collector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blastcore::{
    EffectiveLengths, EngineError, HitSavingOptions, HspCollector, InMemorySubjects,
    InitialWordOptions, LookupOptions, LookupTableBuilder, PreliminaryEngine, QueryInfo, Range,
    ScoreMatrix, StaticMatrix, SubjectSource, SubjectToken,
};

/// Wraps `InMemorySubjects` and sleeps before every call after the first,
/// giving the test time to flip the cancellation flag between subjects —
/// the engine checks `should_stop` at the top of the worker loop, before
/// calling `next()` again, so a slow second call reliably lands after
/// cancellation fires.
struct TrickleSource {
    inner: InMemorySubjects,
    calls: AtomicUsize,
}

impl SubjectSource for TrickleSource {
    fn next(&self) -> blastcore::EngineResult<Option<SubjectToken>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n > 0 {
            std::thread::sleep(Duration::from_millis(60));
        }
        self.inner.next()
    }
}

#[test]
fn cancelling_mid_run_surfaces_cancelled_and_leaves_collector_unfrozen() {
    let matrix = Arc::new(StaticMatrix::load("BLOSUM62", 1).unwrap());
    let query = vec![0u8, 1, 2];
    let query_info = Arc::new(QueryInfo::from_lengths(&[query.len()]));

    let opts = LookupOptions {
        word_length: 3,
        threshold: 0,
        use_pssm: false,
    };
    let mut builder = LookupTableBuilder::new(&opts, 24).unwrap();
    builder
        .index_query(matrix.as_ref(), &query, &[Range { from: 0, to: 3 }], 0)
        .unwrap();
    let table = Arc::new(builder.finalize().unwrap());

    let subjects: Vec<(u64, Vec<u8>)> = (0..5).map(|i| (i as u64, query.clone())).collect();
    let source: Arc<dyn SubjectSource> = Arc::new(TrickleSource {
        inner: InMemorySubjects::new(subjects),
        calls: AtomicUsize::new(0),
    });

    let hit_saving = HitSavingOptions::default();
    let effective_lengths = Arc::new(
        EffectiveLengths::compute(1_000_000, 10_000, &query_info, "BLOSUM62", &hit_saving).unwrap(),
    );
    let collector = Arc::new(HspCollector::new(1));

    let engine = PreliminaryEngine::new(
        1,
        source,
        table,
        matrix.clone() as Arc<dyn ScoreMatrix>,
        effective_lengths,
        collector.clone(),
        Arc::new(vec![query]),
        query_info,
        InitialWordOptions::default(),
        hit_saving,
        0.3176,
    );

    let flag = engine.cancellation_flag();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        flag.store(true, std::sync::atomic::Ordering::Release);
    });

    let result = engine.run();
    canceller.join().unwrap();

    assert!(result.is_err());
    if let Err(err) = result {
        assert!(matches!(err, EngineError::Cancelled) || matches!(err, EngineError::AllocFailed(_)));
    }
    assert!(!collector.is_frozen());
}
