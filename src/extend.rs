//! Per-seed ungapped extension with X-drop. One `WordExtender` per worker
//! thread; its diagonal-hit map is allocated once at construction so the
//! hot extension loop never allocates.

use crate::collector::Hsp;
use crate::diagnostics::WorkerDiagnostics;
use crate::matrix::ScoreMatrix;
use crate::options::InitialWordOptions;
use std::sync::atomic::Ordering;

/// Number of buckets in the diagonal-hit map, a power of two so bucketing
/// is a mask rather than a modulo.
const DIAG_TABLE_BITS: u32 = 16;

fn bits_to_raw_score(bits: f64, lambda: f64) -> i32 {
    ((bits * std::f64::consts::LN_2) / lambda).round() as i32
}

pub struct WordExtender {
    /// Rightmost subject position already covered by an extension on this
    /// diagonal, or `-1` if none yet (diagonal filter).
    extended_through: Vec<i64>,
    /// Pending first-hit subject position for the two-hit heuristic, or
    /// `-1` if no hit is pending on this diagonal.
    last_seed_pos: Vec<i64>,
    mask: usize,
    window_size: usize,
    two_hit: bool,
    x_drop: i32,
}

impl WordExtender {
    pub fn new(options: &InitialWordOptions, lambda: f64) -> Self {
        let size = 1usize << DIAG_TABLE_BITS;
        WordExtender {
            extended_through: vec![-1; size],
            last_seed_pos: vec![-1; size],
            mask: size - 1,
            window_size: options.window_size,
            two_hit: options.two_hit,
            x_drop: bits_to_raw_score(options.x_drop_ungapped_bits, lambda),
        }
    }

    fn bucket(&self, diag: i64) -> usize {
        (diag as u64 as usize) & self.mask
    }

    /// `global_query_offset`/`subject_offset` are the raw seed hit
    /// reported by `LookupTable::scan`; `query` is the local (per-query)
    /// residue slice, `query_local_offset` its offset within that slice.
    #[allow(clippy::too_many_arguments)]
    pub fn extend_seed(
        &mut self,
        query_idx: usize,
        query: &[u8],
        query_local_offset: usize,
        global_query_offset: u32,
        subject: &[u8],
        subject_offset: u32,
        word_length: usize,
        matrix: &dyn ScoreMatrix,
        ungapped_cutoff: i32,
        diagnostics: &WorkerDiagnostics,
    ) -> Option<Hsp> {
        diagnostics.seeds_emitted.fetch_add(1, Ordering::Relaxed);

        let diag = subject_offset as i64 - global_query_offset as i64;
        let bucket = self.bucket(diag);
        let word_right_edge = subject_offset as i64 + word_length as i64 - 1;

        if self.extended_through[bucket] >= word_right_edge {
            diagnostics
                .seeds_skipped_diagonal
                .fetch_add(1, Ordering::Relaxed);
            return None;
        }

        if self.two_hit && self.window_size > 0 {
            let last = self.last_seed_pos[bucket];
            if last < 0 || subject_offset as i64 - last > self.window_size as i64 {
                self.last_seed_pos[bucket] = subject_offset as i64;
                return None;
            }
        }

        diagnostics
            .extensions_attempted
            .fetch_add(1, Ordering::Relaxed);

        let (score, qfrom, qto, sfrom, sto) = Self::walk(
            query,
            query_local_offset,
            subject,
            subject_offset as usize,
            word_length,
            matrix,
            self.x_drop,
        );

        self.extended_through[bucket] = sto as i64;
        self.last_seed_pos[bucket] = -1;

        if score < ungapped_cutoff {
            return None;
        }
        diagnostics
            .extensions_passed_cutoff
            .fetch_add(1, Ordering::Relaxed);

        let bias = global_query_offset as i64 - query_local_offset as i64;
        Some(Hsp {
            query_idx,
            query_from: qfrom,
            query_to: qto,
            subject_from: sfrom,
            subject_to: sto,
            strand_reverse: false,
            raw_score: score,
            diag: sto as i64 - (qto as i64 + bias),
        })
    }

    /// Walks left and right from the seed word, accumulating score and
    /// tracking the position of the best running score on each side.
    /// Stops a side when its running score drops `x_drop` below the best
    /// seen on that side.
    fn walk(
        query: &[u8],
        q_seed: usize,
        subject: &[u8],
        s_seed: usize,
        w: usize,
        matrix: &dyn ScoreMatrix,
        x_drop: i32,
    ) -> (i32, usize, usize, usize, usize) {
        let seed_score: i32 = (0..w)
            .map(|i| matrix.score(query[q_seed + i], subject[s_seed + i]))
            .sum();

        let mut running = 0i32;
        let mut best = 0i32;
        let mut best_ext = 0usize;
        let mut i = 0usize;
        while q_seed + w + i < query.len() && s_seed + w + i < subject.len() {
            running += matrix.score(query[q_seed + w + i], subject[s_seed + w + i]);
            if running > best {
                best = running;
                best_ext = i + 1;
            } else if best - running > x_drop {
                break;
            }
            i += 1;
        }
        let right_ext = best_ext;
        let right_score = best;

        let mut running = 0i32;
        let mut best = 0i32;
        let mut best_ext = 0usize;
        let mut i = 0usize;
        while q_seed >= i + 1 && s_seed >= i + 1 {
            let qi = q_seed - 1 - i;
            let si = s_seed - 1 - i;
            running += matrix.score(query[qi], subject[si]);
            if running > best {
                best = running;
                best_ext = i + 1;
            } else if best - running > x_drop {
                break;
            }
            i += 1;
        }
        let left_ext = best_ext;
        let left_score = best;

        let total = seed_score + left_score + right_score;
        let qfrom = q_seed - left_ext;
        let qto = q_seed + w - 1 + right_ext;
        let sfrom = s_seed - left_ext;
        let sto = s_seed + w - 1 + right_ext;
        (total, qfrom, qto, sfrom, sto)
    }
}
