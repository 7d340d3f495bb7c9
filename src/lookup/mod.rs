//! Protein seed index: thin-backbone construction, neighborhood expansion,
//! and a frozen thick backbone + overflow + presence-vector for zero-
//! allocation scanning.
//!
//! Grounded on `core/blast_aalookup.c`'s `BlastAaLookupFinalize`/
//! `s_AddWordHits`/`s_AddWordHitsCore`: the direct-insert-vs-enumerate
//! split below follows the C source exactly rather than the distilled
//! spec's own (self-contradictory as written) phrasing — see DESIGN.md,
//! Open Question decisions.

pub mod neighbor;

use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::matrix::{PssmMatrix, ScoreMatrix};
use crate::options::LookupOptions;
use crate::query::Range;
use neighbor::NeighborFrame;

/// Inline capacity of a backbone cell before it migrates to `overflow`.
const AA_HITS_PER_CELL: usize = 3;

fn packed(word: &[u8], alphabet_size: usize) -> u64 {
    let mut key = 0u64;
    for &c in word {
        key = key * alphabet_size as u64 + c as u64;
    }
    key
}

#[derive(Debug, Clone, Copy)]
enum BackboneEntry {
    Empty,
    Few([u32; AA_HITS_PER_CELL], u8),
    Many { offset: u32, count: u32 },
}

/// Builds the thin per-key backbone (`Vec<Vec<u32>>`, one arena slot per
/// packed word), indexing one or more queries, then migrates it into a
/// frozen `LookupTable` via `finalize`.
pub struct LookupTableBuilder {
    word_length: usize,
    alphabet_size: usize,
    threshold: i32,
    backbone_size: usize,
    thin: Vec<Vec<u32>>,
    finalized: bool,
}

impl LookupTableBuilder {
    pub fn new(options: &LookupOptions, alphabet_size: usize) -> EngineResult<Self> {
        if options.word_length == 0 || options.threshold < 0 {
            return Err(EngineError::AllocFailed(
                "word length must be positive and threshold non-negative".to_string(),
            ));
        }
        let backbone_size = (alphabet_size as u64)
            .checked_pow(options.word_length as u32)
            .ok_or_else(|| {
                EngineError::AllocFailed(format!(
                    "alphabet_size^word_length overflows a machine word (Sigma={alphabet_size}, w={})",
                    options.word_length
                ))
            })?;
        let backbone_size = usize::try_from(backbone_size).map_err(|_| {
            EngineError::AllocFailed("backbone too large for this platform's usize".to_string())
        })?;

        Ok(LookupTableBuilder {
            word_length: options.word_length,
            alphabet_size,
            threshold: options.threshold,
            backbone_size,
            thin: vec![Vec::new(); backbone_size],
            finalized: false,
        })
    }

    /// Adds every word inside `locations` (half-open intervals over
    /// `query`) to the thin backbone, with `bias` added to each stored
    /// offset. `locations` may overlap; duplicate positions are collapsed
    /// naturally by the grouping step below.
    pub fn index_query(
        &mut self,
        matrix: &dyn ScoreMatrix,
        query: &[u8],
        locations: &[Range],
        bias: u32,
    ) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::FinalizedTable);
        }

        let w = self.word_length;
        let mut max_pos: u32 = 0;
        let mut groups: HashMap<&[u8], Vec<u32>> = HashMap::new();
        for range in locations {
            if range.to < range.from || range.to > query.len() {
                continue;
            }
            if range.to - range.from < w {
                continue;
            }
            for pos in range.from..=(range.to - w) {
                let word = &query[pos..pos + w];
                let biased = bias
                    .checked_add(pos as u32)
                    .ok_or_else(|| EngineError::AllocFailed("offset exceeds u32 range".to_string()))?;
                if biased > u32::MAX / 2 {
                    return Err(EngineError::AllocFailed(
                        "bias + query position exceeds UINT32_MAX/2".to_string(),
                    ));
                }
                max_pos = max_pos.max(biased);
                groups.entry(word).or_default().push(biased);
            }
        }
        let _ = max_pos;

        for (word, offsets) in groups {
            let mut frame = NeighborFrame::new(matrix, word, self.threshold);
            let self_score = frame.self_score();

            // Matches `s_AddWordHits`: the exact word is inserted
            // directly exactly when full enumeration would not otherwise
            // produce it on its own (no neighboring, or self-score short
            // of threshold). When threshold > 0 the enumeration always
            // runs afterward to find the rest of the neighborhood.
            if self.threshold == 0 || self_score < self.threshold {
                let key = packed(word, self.alphabet_size) as usize;
                self.thin[key].extend_from_slice(&offsets);
            }
            if self.threshold > 0 {
                let thin = &mut self.thin;
                frame.expand(self.alphabet_size, |matched_key| {
                    thin[matched_key as usize].extend_from_slice(&offsets);
                });
            }
        }

        Ok(())
    }

    /// PSSM variant of `index_query`: each window of `word_length` PSSM
    /// columns starting at `pos` is indexed in place of the fixed-alphabet
    /// query word. `rowMax` advances with the window automatically since
    /// `PssmMatrix::column_row_max` is already column-indexed; the
    /// enumeration in `NeighborFrame::expand` is unchanged because it
    /// already builds candidate *subject* residues, never column indices,
    /// for the packed key it emits. Only the self-score short-circuit
    /// needs the actual query residues at the window, since a column
    /// index is not itself a residue to score against (see
    /// `NeighborFrame::self_score_against`).
    ///
    /// Column indices are truncated to `u8` by the caller's windowing
    /// logic (see `matrix::PssmMatrix::score`), so this supports PSSMs of
    /// up to 256 columns; longer queries alias columns 256 apart onto the
    /// same `rowMax`/pruning inputs. Documented limitation, not fixed
    /// here: see DESIGN.md.
    pub fn index_query_pssm(
        &mut self,
        pssm: &PssmMatrix,
        query: &[u8],
        locations: &[Range],
        bias: u32,
    ) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::FinalizedTable);
        }

        let w = self.word_length;
        let mut groups: HashMap<Vec<u8>, (Vec<u8>, Vec<u32>)> = HashMap::new();
        for range in locations {
            if range.to < range.from || range.to > query.len() {
                continue;
            }
            if range.to - range.from < w {
                continue;
            }
            for pos in range.from..=(range.to - w) {
                if pos + w > pssm.num_columns() {
                    continue;
                }
                let column_word: Vec<u8> = (pos..pos + w).map(|c| c as u8).collect();
                let residues = query[pos..pos + w].to_vec();
                let biased = bias
                    .checked_add(pos as u32)
                    .ok_or_else(|| EngineError::AllocFailed("offset exceeds u32 range".to_string()))?;
                if biased > u32::MAX / 2 {
                    return Err(EngineError::AllocFailed(
                        "bias + query position exceeds UINT32_MAX/2".to_string(),
                    ));
                }
                groups
                    .entry(column_word)
                    .or_insert_with(|| (residues, Vec::new()))
                    .1
                    .push(biased);
            }
        }

        for (column_word, (residues, offsets)) in groups {
            let mut frame = NeighborFrame::new(pssm, &column_word, self.threshold);
            let self_score = frame.self_score_against(&residues);

            if self.threshold == 0 || self_score < self.threshold {
                let key = packed(&residues, self.alphabet_size) as usize;
                self.thin[key].extend_from_slice(&offsets);
            }
            if self.threshold > 0 {
                let thin = &mut self.thin;
                frame.expand(self.alphabet_size, |matched_key| {
                    thin[matched_key as usize].extend_from_slice(&offsets);
                });
            }
        }

        Ok(())
    }

    /// Migrates the thin backbone into a frozen, read-only table. Chains
    /// longer than `AA_HITS_PER_CELL` move into `overflow`; the
    /// per-key classification runs over `rayon` since keys are
    /// independent, but the overflow arena is appended to serially to
    /// keep offsets within a key contiguous and key order deterministic.
    pub fn finalize(&mut self) -> EngineResult<LookupTable> {
        if self.finalized {
            return Err(EngineError::FinalizedTable);
        }
        self.finalized = true;
        tracing::debug!(backbone_size = self.backbone_size, "finalizing lookup table");

        let thin = std::mem::take(&mut self.thin);
        let classified: Vec<BackboneItem> = thin
            .into_par_iter()
            .map(|offsets| {
                if offsets.is_empty() {
                    BackboneItem::Empty
                } else if offsets.len() <= AA_HITS_PER_CELL {
                    let mut arr = [0u32; AA_HITS_PER_CELL];
                    arr[..offsets.len()].copy_from_slice(&offsets);
                    BackboneItem::Few(arr, offsets.len() as u8)
                } else {
                    BackboneItem::Many(offsets)
                }
            })
            .collect();

        let mut backbone = vec![BackboneEntry::Empty; self.backbone_size];
        let mut overflow = Vec::new();
        let mut presence = vec![0u64; self.backbone_size.div_ceil(64)];

        for (key, item) in classified.into_iter().enumerate() {
            match item {
                BackboneItem::Empty => {}
                BackboneItem::Few(arr, n) => {
                    presence[key / 64] |= 1u64 << (key % 64);
                    backbone[key] = BackboneEntry::Few(arr, n);
                }
                BackboneItem::Many(offsets) => {
                    presence[key / 64] |= 1u64 << (key % 64);
                    let offset = overflow.len() as u32;
                    let count = offsets.len() as u32;
                    overflow.extend_from_slice(&offsets);
                    backbone[key] = BackboneEntry::Many { offset, count };
                }
            }
        }

        Ok(LookupTable {
            word_length: self.word_length,
            alphabet_size: self.alphabet_size,
            backbone,
            overflow,
            presence,
        })
    }
}

enum BackboneItem {
    Empty,
    Few([u32; AA_HITS_PER_CELL], u8),
    Many(Vec<u32>),
}

/// Read-only after `finalize()`: `scan` may be called concurrently from
/// many worker threads on the same table without allocating.
pub struct LookupTable {
    word_length: usize,
    alphabet_size: usize,
    backbone: Vec<BackboneEntry>,
    overflow: Vec<u32>,
    presence: Vec<u64>,
}

impl LookupTable {
    pub fn word_length(&self) -> usize {
        self.word_length
    }

    fn present(&self, key: usize) -> bool {
        (self.presence[key / 64] >> (key % 64)) & 1 == 1
    }

    /// For each window in `subject[start..end)`, if the window's packed
    /// key is present, invokes `emit(query_offset, subject_position)` for
    /// every stored query offset. Allocates nothing.
    pub fn scan(&self, subject: &[u8], start: usize, end: usize, mut emit: impl FnMut(u32, u32)) {
        let w = self.word_length;
        if subject.len() < w {
            return;
        }
        let last_pos = subject.len() - w;
        let end = end.min(last_pos + 1);
        for pos in start..end {
            let key = packed(&subject[pos..pos + w], self.alphabet_size) as usize;
            if !self.present(key) {
                continue;
            }
            match &self.backbone[key] {
                BackboneEntry::Empty => {}
                BackboneEntry::Few(arr, n) => {
                    for &q in &arr[..*n as usize] {
                        emit(q, pos as u32);
                    }
                }
                BackboneEntry::Many { offset, count } => {
                    let slice = &self.overflow[*offset as usize..(*offset + *count) as usize];
                    for &q in slice {
                        emit(q, pos as u32);
                    }
                }
            }
        }
    }
}
