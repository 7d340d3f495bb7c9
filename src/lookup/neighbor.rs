//! Neighborhood enumeration for one query word: every subject word whose
//! substitution score against the query word clears a threshold, visited
//! exactly once. Private to `lookup`.
//!
//! Grounded on the branch-and-bound enumeration in the original lookup
//! table builder (`core/blast_aalookup.c`'s `s_AddWordHitsCore`), but
//! implemented iteratively with an explicit stack rather than recursively,
//! so the hot path allocates nothing per visited word and the upper-bound
//! pruning is one loop invariant instead of a recursion depth.

use crate::matrix::ScoreMatrix;

#[derive(Debug, Clone, Copy)]
struct StackEntry {
    depth: usize,
    packed: u64,
    score: i32,
    next_letter: u8,
}

/// Owns only its own traversal state: the query word, a precomputed
/// suffix-sum of row-maxima, and a reusable stack. Reused across many
/// `expand` calls within one `finalize()` so the stack's backing storage
/// is allocated once per worker/thread, not once per word.
pub struct NeighborFrame<'a> {
    matrix: &'a dyn ScoreMatrix,
    query_word: &'a [u8],
    suffix_max: Vec<i32>,
    threshold: i32,
    stack: Vec<StackEntry>,
}

impl<'a> NeighborFrame<'a> {
    pub fn new(matrix: &'a dyn ScoreMatrix, query_word: &'a [u8], threshold: i32) -> Self {
        let w = query_word.len();
        let mut suffix_max = vec![0i32; w + 1];
        for i in (0..w).rev() {
            suffix_max[i] = suffix_max[i + 1] + matrix.row_max(query_word[i]);
        }
        NeighborFrame {
            matrix,
            query_word,
            suffix_max,
            threshold,
            stack: Vec::with_capacity(query_word.len() * 4),
        }
    }

    /// Self-score of the query word against itself: `sum_i M[Q_i][Q_i]`.
    pub fn self_score(&self) -> i32 {
        self.self_score_against(self.query_word)
    }

    /// Score of the traversal's query word against an explicit residue
    /// sequence. For a fixed substitution matrix `query_word` and
    /// `residues` are the same slice, so this is `self_score()`'s general
    /// form; for a PSSM, `query_word` holds column indices while
    /// `residues` holds the actual query residues at those columns, since
    /// a PSSM column's index isn't itself a residue to compare against.
    pub fn self_score_against(&self, residues: &[u8]) -> i32 {
        self.query_word
            .iter()
            .zip(residues)
            .map(|(&c, &r)| self.matrix.score(c, r))
            .sum()
    }

    /// Visits every subject word packed as a base-`alphabet_size` integer
    /// (most significant digit first) whose score against the query word
    /// is `>= threshold`. Completeness: every qualifying word is visited
    /// exactly once. Soundness: no other word is visited.
    pub fn expand(&mut self, alphabet_size: usize, mut emit: impl FnMut(u64)) {
        let w = self.query_word.len();
        self.stack.clear();
        self.stack.push(StackEntry {
            depth: 0,
            packed: 0,
            score: 0,
            next_letter: 0,
        });

        while let Some(top) = self.stack.last_mut() {
            if top.next_letter as usize >= alphabet_size {
                self.stack.pop();
                continue;
            }
            let depth = top.depth;
            let packed = top.packed;
            let score = top.score;
            let c = top.next_letter;
            top.next_letter += 1;

            let candidate_score = score + self.matrix.score(self.query_word[depth], c);
            let remaining_upper = self.suffix_max[depth + 1];
            if candidate_score + remaining_upper < self.threshold {
                continue;
            }

            let candidate_packed = packed * alphabet_size as u64 + c as u64;
            if depth + 1 == w {
                if candidate_score >= self.threshold {
                    emit(candidate_packed);
                }
            } else {
                self.stack.push(StackEntry {
                    depth: depth + 1,
                    packed: candidate_packed,
                    score: candidate_score,
                    next_letter: 0,
                });
            }
        }
    }
}
