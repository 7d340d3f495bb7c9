//! Bounded, thread-safe per-query HSP storage with trimming. One
//! `Mutex<PerQueryHitlist>` per query, built once at construction (teacher
//! pattern: no interior resizing of a shared map under lock, same as the
//! fixed-size shard vectors in the store module).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::options::HitSavingOptions;

pub type SubjectId = u64;

/// One high-scoring segment pair. Ranges are inclusive on both ends and
/// always expressed on the forward strand, with `strand` recording which
/// strand the subject match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsp {
    pub query_idx: usize,
    pub query_from: usize,
    pub query_to: usize,
    pub subject_from: usize,
    pub subject_to: usize,
    pub strand_reverse: bool,
    pub raw_score: i32,
    pub diag: i64,
}

fn hsp_order_key(h: &Hsp) -> (i32, usize, usize) {
    // Sorted descending by score; callers negate when using a plain
    // ascending sort, see `insert_sorted` below.
    (h.raw_score, h.query_from, h.subject_from)
}

/// Score-descending ordered list of HSPs for one (query, subject) pair,
/// capped at `hsp_num_max`.
#[derive(Debug, Clone, Default)]
pub struct HspList {
    hsps: Vec<Hsp>,
}

impl HspList {
    fn insert_sorted(&mut self, hsp: Hsp, cap: usize) {
        let pos = self
            .hsps
            .binary_search_by(|existing| {
                // Descending score, then ascending query_from, then
                // ascending subject_from — `Reverse` would invert all
                // three, so compare the tuple directly and flip the score
                // leg only.
                let a = hsp_order_key(existing);
                let b = hsp_order_key(&hsp);
                (b.0.cmp(&a.0)).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2))
            })
            .unwrap_or_else(|e| e);
        self.hsps.insert(pos, hsp);
        if self.hsps.len() > cap {
            self.hsps.truncate(cap);
        }
    }

    pub fn best_score(&self) -> Option<i32> {
        self.hsps.first().map(|h| h.raw_score)
    }

    pub fn len(&self) -> usize {
        self.hsps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hsps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hsp> {
        self.hsps.iter()
    }

    fn truncate(&mut self, n: usize) {
        self.hsps.truncate(n);
    }
}

/// Ordered map from subject-id to `HspList`, capped at `hitlist_size`.
#[derive(Debug, Clone, Default)]
pub struct PerQueryHitlist {
    // Kept as a Vec, not a HashMap: subject counts per query stay small
    // (bounded by hitlist_size) and linear scan/find keeps the hot
    // insert path allocation-free.
    subjects: Vec<(SubjectId, HspList)>,
}

impl PerQueryHitlist {
    fn insert(&mut self, subject_id: SubjectId, hsp: Hsp, options: &HitSavingOptions) {
        match self.subjects.iter_mut().find(|(id, _)| *id == subject_id) {
            Some((_, list)) => list.insert_sorted(hsp, options.hsp_num_max),
            None => {
                let mut list = HspList::default();
                list.insert_sorted(hsp, options.hsp_num_max);
                self.subjects.push((subject_id, list));
            }
        }

        if self.subjects.len() > options.hitlist_size {
            // Drop the subject with the lowest best-HSP score; ties
            // broken by higher subject-id.
            let worst = self
                .subjects
                .iter()
                .enumerate()
                .min_by(|(_, (id_a, list_a)), (_, (id_b, list_b))| {
                    let score_a = list_a.best_score().unwrap_or(i32::MIN);
                    let score_b = list_b.best_score().unwrap_or(i32::MIN);
                    score_a
                        .cmp(&score_b)
                        .then(id_b.cmp(id_a))
                })
                .map(|(idx, _)| idx);
            if let Some(idx) = worst {
                self.subjects.remove(idx);
            }
        }
    }

    /// Returns the number of HSPs actually discarded by trimming.
    fn trim(&mut self, total_hsp_limit: usize) -> usize {
        if total_hsp_limit == 0 || self.subjects.is_empty() {
            return 0;
        }
        let total: usize = self.subjects.iter().map(|(_, l)| l.len()).sum();
        if total <= total_hsp_limit {
            return 0;
        }

        // Sort by current HSP count ascending; ties broken by subject-id
        // ascending (Open Question decision, see DESIGN.md).
        let mut order: Vec<usize> = (0..self.subjects.len()).collect();
        order.sort_by(|&a, &b| {
            let la = self.subjects[a].1.len();
            let lb = self.subjects[b].1.len();
            la.cmp(&lb).then(self.subjects[a].0.cmp(&self.subjects[b].0))
        });

        let n = order.len();
        let mut hsps_so_far = 0usize;
        let mut discarded = 0usize;
        for (j, &idx) in order.iter().enumerate() {
            let allowed = ((j + 1) * total_hsp_limit) / n;
            // Keep a floor of 1 only while there's still budget left; once
            // the running total reaches the limit, further subjects get 0
            // so the global cap (testable property 4) is never exceeded.
            let allowed_j = if hsps_so_far < total_hsp_limit {
                allowed.saturating_sub(hsps_so_far).max(1)
            } else {
                0
            };
            let list = &mut self.subjects[idx].1;
            if list.len() > allowed_j {
                discarded += list.len() - allowed_j;
                list.truncate(allowed_j);
            }
            hsps_so_far += list.len();
        }
        discarded
    }

    pub fn subjects(&self) -> impl Iterator<Item = (SubjectId, &HspList)> {
        self.subjects.iter().map(|(id, list)| (*id, list))
    }

    pub fn num_subjects(&self) -> usize {
        self.subjects.len()
    }

    pub fn total_hsps(&self) -> usize {
        self.subjects.iter().map(|(_, l)| l.len()).sum()
    }
}

/// Top-level preliminary-search result: one `PerQueryHitlist` per query.
#[derive(Debug, Clone, Default)]
pub struct BlobOfHsps {
    per_query: Vec<PerQueryHitlist>,
}

impl BlobOfHsps {
    pub fn num_queries(&self) -> usize {
        self.per_query.len()
    }

    pub fn query(&self, idx: usize) -> &PerQueryHitlist {
        &self.per_query[idx]
    }
}

/// State machine: `Open -> (trimmed) Open -> Frozen`. Transitions
/// triggered only by the engine, never by individual workers.
pub struct HspCollector {
    per_query: Vec<Mutex<PerQueryHitlist>>,
    frozen: AtomicBool,
}

impl HspCollector {
    pub fn new(num_queries: usize) -> Self {
        let mut per_query = Vec::with_capacity(num_queries);
        per_query.resize_with(num_queries, || Mutex::new(PerQueryHitlist::default()));
        HspCollector {
            per_query,
            frozen: AtomicBool::new(false),
        }
    }

    pub fn insert(
        &self,
        query_idx: usize,
        subject_id: SubjectId,
        hsp: Hsp,
        options: &HitSavingOptions,
    ) -> EngineResult<()> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(EngineError::FinalizedTable);
        }
        let mut list = self.per_query[query_idx]
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        list.insert(subject_id, hsp, options);
        Ok(())
    }

    /// Called once after the preliminary phase completes successfully.
    /// Returns the total number of HSPs discarded across all queries.
    pub fn trim(&self, total_hsp_limit: usize) -> EngineResult<usize> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(EngineError::FinalizedTable);
        }
        let mut discarded = 0usize;
        for mutex in &self.per_query {
            let mut list = mutex.lock().unwrap_or_else(|p| p.into_inner());
            discarded += list.trim(total_hsp_limit);
        }
        Ok(discarded)
    }

    pub fn freeze(&self) -> BlobOfHsps {
        self.frozen.store(true, Ordering::Release);
        let per_query = self
            .per_query
            .iter()
            .map(|m| m.lock().unwrap_or_else(|p| p.into_inner()).clone())
            .collect();
        BlobOfHsps { per_query }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hsp(score: i32, qfrom: usize, sfrom: usize) -> Hsp {
        Hsp {
            query_idx: 0,
            query_from: qfrom,
            query_to: qfrom + 10,
            subject_from: sfrom,
            subject_to: sfrom + 10,
            strand_reverse: false,
            raw_score: score,
            diag: 0,
        }
    }

    #[test]
    fn insert_keeps_score_descending_order() {
        let c = HspCollector::new(1);
        let opts = HitSavingOptions::default();
        c.insert(0, 1, hsp(10, 0, 0), &opts).unwrap();
        c.insert(0, 1, hsp(30, 5, 5), &opts).unwrap();
        c.insert(0, 1, hsp(20, 2, 2), &opts).unwrap();
        let blob = c.freeze();
        let list = blob.query(0).subjects().next().unwrap().1;
        let scores: Vec<i32> = list.iter().map(|h| h.raw_score).collect();
        assert_eq!(scores, vec![30, 20, 10]);
    }

    #[test]
    fn hitlist_cap_drops_lowest_scoring_subject() {
        let c = HspCollector::new(1);
        let opts = HitSavingOptions {
            hitlist_size: 2,
            ..Default::default()
        };
        c.insert(0, 1, hsp(10, 0, 0), &opts).unwrap();
        c.insert(0, 2, hsp(20, 0, 0), &opts).unwrap();
        c.insert(0, 3, hsp(30, 0, 0), &opts).unwrap();
        let blob = c.freeze();
        let ids: Vec<SubjectId> = blob.query(0).subjects().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&1));
    }

    #[test]
    fn trim_respects_total_limit_and_minimum_one() {
        let c = HspCollector::new(1);
        let opts = HitSavingOptions {
            hsp_num_max: 100,
            hitlist_size: 100,
            ..Default::default()
        };
        for i in 0..3 {
            c.insert(0, 1, hsp(100 - i, 0, i as usize), &opts).unwrap();
        }
        for i in 0..7 {
            c.insert(0, 2, hsp(200 - i, 0, i as usize), &opts).unwrap();
        }
        for i in 0..20 {
            c.insert(0, 3, hsp(300 - i, 0, i as usize), &opts).unwrap();
        }
        let trimmed = c.trim(10).unwrap();
        assert!(trimmed > 0);
        let blob = c.freeze();
        let total = blob.query(0).total_hsps();
        assert!(total <= 10);
        for (_, list) in blob.query(0).subjects() {
            assert!(list.len() >= 1);
        }
    }

    #[test]
    fn trim_caps_total_even_with_more_subjects_than_budget() {
        let c = HspCollector::new(1);
        let opts = HitSavingOptions {
            hsp_num_max: 100,
            hitlist_size: 100,
            ..Default::default()
        };
        for i in 0..3 {
            c.insert(0, 1, hsp(100 - i, 0, i as usize), &opts).unwrap();
        }
        for i in 0..3 {
            c.insert(0, 2, hsp(200 - i, 0, i as usize), &opts).unwrap();
        }
        for i in 0..3 {
            c.insert(0, 3, hsp(300 - i, 0, i as usize), &opts).unwrap();
        }
        // Three subjects, limit of two: an unconditional minimum-1 floor
        // per subject would retain three HSPs and blow the budget.
        let trimmed = c.trim(2).unwrap();
        assert!(trimmed > 0);
        let blob = c.freeze();
        assert!(blob.query(0).total_hsps() <= 2);
    }

    #[test]
    fn zero_total_limit_skips_trimming() {
        let c = HspCollector::new(1);
        let opts = HitSavingOptions::default();
        for i in 0..5 {
            c.insert(0, 1, hsp(100 - i, 0, i as usize), &opts).unwrap();
        }
        let trimmed = c.trim(0).unwrap();
        assert_eq!(trimmed, 0);
    }

    #[test]
    fn frozen_collector_rejects_insert_and_trim() {
        let c = HspCollector::new(1);
        let opts = HitSavingOptions::default();
        c.insert(0, 1, hsp(10, 0, 0), &opts).unwrap();
        c.freeze();
        assert!(matches!(
            c.insert(0, 1, hsp(10, 0, 0), &opts),
            Err(EngineError::FinalizedTable)
        ));
        assert!(matches!(c.trim(10), Err(EngineError::FinalizedTable)));
    }
}
