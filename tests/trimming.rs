//! End-to-end: `total_hsp_limit` redistributes the per-subject share
//! proportionally to each subject's HSP count, never dropping a subject
//! to zero.

use blastcore::{HitSavingOptions, Hsp, HspCollector};

fn hsp(subject_rank: usize, score: i32, offset: usize) -> Hsp {
    Hsp {
        query_idx: 0,
        query_from: offset,
        query_to: offset + 10,
        subject_from: offset,
        subject_to: offset + 10,
        strand_reverse: false,
        raw_score: score,
        diag: subject_rank as i64,
    }
}

#[test]
fn total_hsp_limit_trims_proportionally_and_keeps_a_floor() {
    let collector = HspCollector::new(1);
    let opts = HitSavingOptions {
        hitlist_size: 10,
        hsp_num_max: 100,
        total_hsp_limit: 0,
        e_value_threshold: 1e12,
    };

    // Subject 1 starts with 3 HSPs, subject 2 with 7, subject 3 with 20.
    for i in 0..3 {
        collector
            .insert(0, 1, hsp(1, 100 - i, i as usize), &opts)
            .unwrap();
    }
    for i in 0..7 {
        collector
            .insert(0, 2, hsp(2, 200 - i, i as usize), &opts)
            .unwrap();
    }
    for i in 0..20 {
        collector
            .insert(0, 3, hsp(3, 300 - i, i as usize), &opts)
            .unwrap();
    }

    let trimmed = collector.trim(10).unwrap();
    assert!(trimmed > 0);

    let blob = collector.freeze();
    let hits = blob.query(0);
    assert_eq!(hits.num_subjects(), 3);
    assert!(hits.total_hsps() <= 10);

    let mut counts = std::collections::HashMap::new();
    for (id, list) in hits.subjects() {
        assert!(list.len() >= 1, "subject {id} was trimmed to zero");
        counts.insert(id, list.len());
    }
    // The subject that started with the most HSPs should still end up
    // with at least as many as the one that started with fewest.
    assert!(counts[&3] >= counts[&1]);
}
