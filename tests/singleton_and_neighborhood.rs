//! End-to-end: a single exact seed producing one HSP, and the same query
//! finding a neighbor above threshold but not above it.

use std::sync::Arc;

use blastcore::{
    BlobOfHsps, EffectiveLengths, EngineConfig, HitSavingOptions, HspCollector, InMemorySubjects,
    InitialWordOptions, LookupOptions, LookupTableBuilder, PreliminaryEngine, QueryInfo, Range,
    ScoreMatrix, StaticMatrix,
};

const M: u8 = 12;
const K: u8 = 11;
const T: u8 = 16;
const A: u8 = 0;

fn run(
    query: Vec<u8>,
    subjects: Vec<(u64, Vec<u8>)>,
    threshold: i32,
) -> (BlobOfHsps, Arc<StaticMatrix>) {
    let matrix = Arc::new(StaticMatrix::load("BLOSUM62", 1).unwrap());
    let query_info = Arc::new(QueryInfo::from_lengths(&[query.len()]));

    let opts = LookupOptions {
        word_length: 3,
        threshold,
        use_pssm: false,
    };
    let mut builder = LookupTableBuilder::new(&opts, 24).unwrap();
    builder
        .index_query(
            matrix.as_ref(),
            &query,
            &[Range { from: 0, to: query.len() }],
            0,
        )
        .unwrap();
    let table = Arc::new(builder.finalize().unwrap());

    let source: Arc<dyn blastcore::SubjectSource> = Arc::new(InMemorySubjects::new(subjects));

    let hit_saving = HitSavingOptions {
        hitlist_size: 10,
        hsp_num_max: 10,
        total_hsp_limit: 0,
        e_value_threshold: 1e12,
    };
    let effective_lengths = Arc::new(
        EffectiveLengths::compute(1_000_000, 10_000, &query_info, "BLOSUM62", &hit_saving).unwrap(),
    );
    let collector = Arc::new(HspCollector::new(1));
    let config = EngineConfig {
        num_workers: 1,
        initial_word: InitialWordOptions {
            window_size: 0,
            x_drop_ungapped_bits: 1000.0,
            two_hit: false,
        },
        hit_saving,
    };

    let engine = PreliminaryEngine::new(
        config.num_workers,
        source,
        table,
        matrix.clone() as Arc<dyn ScoreMatrix>,
        effective_lengths,
        collector,
        Arc::new(vec![query]),
        query_info,
        config.initial_word,
        config.hit_saving,
        0.3176,
    );

    let (blob, _diag) = engine.run().unwrap();
    (blob, matrix)
}

#[test]
fn singleton_exact_match() {
    let query = vec![M, K, T];
    let subjects = vec![(0u64, vec![M, K, T]), (1u64, vec![A, A, A])];
    let (blob, matrix) = run(query, subjects, 0);

    let hits = blob.query(0);
    assert_eq!(hits.num_subjects(), 1);
    let (id, list) = hits.subjects().next().unwrap();
    assert_eq!(id, 0);
    assert_eq!(list.len(), 1);
    let hsp = list.iter().next().unwrap();
    assert_eq!((hsp.query_from, hsp.query_to), (0, 2));
    assert_eq!((hsp.subject_from, hsp.subject_to), (0, 2));

    let self_score = matrix.score(M, M) + matrix.score(K, K) + matrix.score(T, T);
    assert_eq!(hsp.raw_score, self_score);
}

#[test]
fn neighborhood_expansion_finds_word_above_threshold() {
    // L-M substitution scores 2 under BLOSUM62; K-K and T-T both score 5,
    // so "LKT" scores 12 against query "MKT".
    let query = vec![M, K, T];
    let subjects = vec![(0u64, vec![10u8, K, T])]; // L=10
    let (blob, _matrix) = run(query, subjects, 11);

    let hits = blob.query(0);
    assert_eq!(hits.num_subjects(), 1);
    let hsp = hits.subjects().next().unwrap().1.iter().next().unwrap();
    assert_eq!(hsp.raw_score, 12);
}

#[test]
fn neighborhood_expansion_excludes_word_below_threshold() {
    let query = vec![M, K, T];
    let subjects = vec![(0u64, vec![10u8, K, T])];
    // One above the neighbor's own score (12) excludes it entirely.
    let (blob, _matrix) = run(query, subjects, 13);

    let hits = blob.query(0);
    assert_eq!(hits.num_subjects(), 0);
}
