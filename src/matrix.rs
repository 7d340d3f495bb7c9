//! Substitution matrices: dense fixed tables and PSSM columns, both behind
//! one trait so the lookup table and extender don't care which they scan.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};

/// A substitution matrix over an alphabet of size `dim()`. Implementations
/// must be safe to share (read-only) across worker threads.
pub trait ScoreMatrix: Send + Sync {
    /// Score of aligning residue `a` against residue `b`.
    fn score(&self, a: u8, b: u8) -> i32;

    /// `max_b score(a, b)`, precomputed at load time.
    fn row_max(&self, a: u8) -> i32;

    /// Alphabet size Σ.
    fn dim(&self) -> usize;
}

/// Dense Σ×Σ integer matrix, immutable after construction.
#[derive(Debug, Clone)]
pub struct StaticMatrix {
    dim: usize,
    cells: Vec<i32>,
    row_max: Vec<i32>,
}

impl StaticMatrix {
    fn from_rows(rows: &[&[i32]]) -> Self {
        let dim = rows.len();
        let mut cells = Vec::with_capacity(dim * dim);
        let mut row_max = Vec::with_capacity(dim);
        for row in rows {
            assert_eq!(row.len(), dim, "substitution matrix must be square");
            row_max.push(row.iter().copied().max().unwrap_or(0));
            cells.extend_from_slice(row);
        }
        StaticMatrix {
            dim,
            cells,
            row_max,
        }
    }

    /// Multiplies every cell by `scale`. Must happen exactly once, at load
    /// time — downstream code must never rescale an already-scaled matrix.
    fn scaled(mut self, scale: i32) -> Self {
        if scale != 1 {
            for c in &mut self.cells {
                *c *= scale;
            }
            for r in &mut self.row_max {
                *r *= scale;
            }
        }
        self
    }

    /// Load a named, optionally scaled matrix.
    pub fn load(name: &str, scale: i32) -> EngineResult<Self> {
        let base = MATRICES
            .get(name)
            .ok_or_else(|| EngineError::UnknownMatrix(name.to_string()))?;
        Ok(base.clone().scaled(scale))
    }
}

impl ScoreMatrix for StaticMatrix {
    fn score(&self, a: u8, b: u8) -> i32 {
        self.cells[a as usize * self.dim + b as usize]
    }

    fn row_max(&self, a: u8) -> i32 {
        self.row_max[a as usize]
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

/// Position-specific scoring matrix: one row (column, in the original's
/// terminology) of scores per query position instead of a fixed alphabet
/// self-similarity table.
#[derive(Debug, Clone)]
pub struct PssmMatrix {
    alphabet_size: usize,
    /// `columns[pos][residue]`
    columns: Vec<Vec<i32>>,
    row_max: Vec<i32>,
}

impl PssmMatrix {
    pub fn new(alphabet_size: usize, columns: Vec<Vec<i32>>) -> Self {
        let row_max = columns
            .iter()
            .map(|col| col.iter().copied().max().unwrap_or(0))
            .collect();
        PssmMatrix {
            alphabet_size,
            columns,
            row_max,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Score of residue `b` at PSSM column `pos`.
    pub fn column_score(&self, pos: usize, b: u8) -> i32 {
        self.columns[pos][b as usize]
    }

    pub fn column_row_max(&self, pos: usize) -> i32 {
        self.row_max[pos]
    }
}

impl ScoreMatrix for PssmMatrix {
    /// `a` is interpreted as a column index truncated to `u8` range by the
    /// caller's windowing logic; see `lookup::neighbor` for how PSSM
    /// columns are threaded through the same `ScoreMatrix` call sites as
    /// `StaticMatrix` residues.
    fn score(&self, a: u8, b: u8) -> i32 {
        self.column_score(a as usize, b)
    }

    fn row_max(&self, a: u8) -> i32 {
        self.column_row_max(a as usize)
    }

    fn dim(&self) -> usize {
        self.alphabet_size
    }
}

/// Karlin-Altschul λ and K for a named matrix, ungapped protein defaults.
/// The engine consumes an already-prepared matrix (Non-goals: no PSI-BLAST
/// rescaling math), but still needs λ to convert the X-drop bit-score
/// parameter into raw-score units.
#[derive(Debug, Clone, Copy)]
pub struct KarlinAltschulParams {
    pub lambda: f64,
    pub k: f64,
}

pub fn karlin_altschul_params(matrix_name: &str) -> EngineResult<KarlinAltschulParams> {
    KARLIN_ALTSCHUL
        .get(matrix_name)
        .copied()
        .ok_or_else(|| EngineError::UnknownMatrix(matrix_name.to_string()))
}

/// Standard 24-letter protein alphabet order used by the static matrices
/// below: A R N D C Q E G H I L K M F P S T W Y V B Z X *
pub const PROTEIN_ALPHABET_SIZE: usize = 24;

static MATRICES: Lazy<HashMap<&'static str, StaticMatrix>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("BLOSUM62", StaticMatrix::from_rows(&blosum62_rows()));
    m.insert("BLOSUM45", StaticMatrix::from_rows(&blosum45_rows()));
    m.insert("BLOSUM80", StaticMatrix::from_rows(&blosum80_rows()));
    m
});

static KARLIN_ALTSCHUL: Lazy<HashMap<&'static str, KarlinAltschulParams>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "BLOSUM62",
        KarlinAltschulParams {
            lambda: 0.3176,
            k: 0.134,
        },
    );
    m.insert(
        "BLOSUM45",
        KarlinAltschulParams {
            lambda: 0.2291,
            k: 0.0924,
        },
    );
    m.insert(
        "BLOSUM80",
        KarlinAltschulParams {
            lambda: 0.3430,
            k: 0.177,
        },
    );
    m
});

// BLOSUM matrices below, row/col order: A R N D C Q E G H I L K M F P S T W Y V B Z X *
#[rustfmt::skip]
fn blosum62_rows() -> [&'static [i32]; 24] {
    [
        &[ 4,-1,-2,-2, 0,-1,-1, 0,-2,-1,-1,-1,-1,-2,-1, 1, 0,-3,-2, 0,-2,-1, 0,-4],
        &[-1, 5, 0,-2,-3, 1, 0,-2, 0,-3,-2, 2,-1,-3,-2,-1,-1,-3,-2,-3,-1, 0,-1,-4],
        &[-2, 0, 6, 1,-3, 0, 0, 0, 1,-3,-3, 0,-2,-3,-2, 1, 0,-4,-2,-3, 3, 0,-1,-4],
        &[-2,-2, 1, 6,-3, 0, 2,-1,-1,-3,-4,-1,-3,-3,-1, 0,-1,-4,-3,-3, 4, 1,-1,-4],
        &[ 0,-3,-3,-3, 9,-3,-4,-3,-3,-1,-1,-3,-1,-2,-3,-1,-1,-2,-2,-1,-3,-3,-2,-4],
        &[-1, 1, 0, 0,-3, 5, 2,-2, 0,-3,-2, 1, 0,-3,-1, 0,-1,-2,-1,-2, 0, 3,-1,-4],
        &[-1, 0, 0, 2,-4, 2, 5,-2, 0,-3,-3, 1,-2,-3,-1, 0,-1,-3,-2,-2, 1, 4,-1,-4],
        &[ 0,-2, 0,-1,-3,-2,-2, 6,-2,-4,-4,-2,-3,-3,-2, 0,-2,-2,-3,-3,-1,-2,-1,-4],
        &[-2, 0, 1,-1,-3, 0, 0,-2, 8,-3,-3,-1,-2,-1,-2,-1,-2,-2, 2,-3, 0, 0,-1,-4],
        &[-1,-3,-3,-3,-1,-3,-3,-4,-3, 4, 2,-3, 1, 0,-3,-2,-1,-3,-1, 3,-3,-3,-1,-4],
        &[-1,-2,-3,-4,-1,-2,-3,-4,-3, 2, 4,-2, 2, 0,-3,-2,-1,-2,-1, 1,-4,-3,-1,-4],
        &[-1, 2, 0,-1,-3, 1, 1,-2,-1,-3,-2, 5,-1,-3,-1, 0,-1,-3,-2,-2, 0, 1,-1,-4],
        &[-1,-1,-2,-3,-1, 0,-2,-3,-2, 1, 2,-1, 5, 0,-2,-1,-1,-1,-1, 1,-3,-1,-1,-4],
        &[-2,-3,-3,-3,-2,-3,-3,-3,-1, 0, 0,-3, 0, 6,-4,-2,-2, 1, 3,-1,-3,-3,-1,-4],
        &[-1,-2,-2,-1,-3,-1,-1,-2,-2,-3,-3,-1,-2,-4, 7,-1,-1,-4,-3,-2,-2,-1,-2,-4],
        &[ 1,-1, 1, 0,-1, 0, 0, 0,-1,-2,-2, 0,-1,-2,-1, 4, 1,-3,-2,-2, 0, 0, 0,-4],
        &[ 0,-1, 0,-1,-1,-1,-1,-2,-2,-1,-1,-1,-1,-2,-1, 1, 5,-2,-2, 0,-1,-1, 0,-4],
        &[-3,-3,-4,-4,-2,-2,-3,-2,-2,-3,-2,-3,-1, 1,-4,-3,-2,11, 2,-3,-4,-3,-2,-4],
        &[-2,-2,-2,-3,-2,-1,-2,-3, 2,-1,-1,-2,-1, 3,-3,-2,-2, 2, 7,-1,-3,-2,-1,-4],
        &[ 0,-3,-3,-3,-1,-2,-2,-3,-3, 3, 1,-2, 1,-1,-2,-2, 0,-3,-1, 4,-3,-2,-1,-4],
        &[-2,-1, 3, 4,-3, 0, 1,-1, 0,-3,-4, 0,-3,-3,-2, 0,-1,-4,-3,-3, 4, 1,-1,-4],
        &[-1, 0, 0, 1,-3, 3, 4,-2, 0,-3,-3, 1,-1,-3,-1, 0,-1,-3,-2,-2, 1, 4,-1,-4],
        &[ 0,-1,-1,-1,-2,-1,-1,-1,-1,-1,-1,-1,-1,-1,-2, 0, 0,-2,-1,-1,-1,-1,-1,-4],
        &[-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4,-4, 1],
    ]
}

// BLOSUM45: lower-identity matrix, same alphabet order as BLOSUM62.
#[rustfmt::skip]
fn blosum45_rows() -> [&'static [i32]; 24] {
    [
        &[ 5,-2,-1,-2,-1,-1,-1, 0,-2,-1,-1,-1,-1,-2,-1, 1, 0,-2,-2, 0,-1,-1, 0,-5],
        &[-2, 7, 0,-1,-3, 1, 0,-2, 0,-3,-2, 3,-1,-2,-2,-1,-1,-2,-1,-2,-1, 0,-1,-5],
        &[-1, 0, 6, 2,-2, 0, 0, 0, 1,-2,-3, 0,-2,-2,-2, 1, 0,-4,-2,-3, 4, 0,-1,-5],
        &[-2,-1, 2, 7,-3, 0, 2,-1, 0,-4,-3, 0,-3,-4,-1, 0,-1,-4,-2,-3, 5, 1,-1,-5],
        &[-1,-3,-2,-3,12,-3,-3,-3,-3,-3,-2,-3,-2,-2,-4,-1,-1,-5,-3,-1,-2,-3,-2,-5],
        &[-1, 1, 0, 0,-3, 6, 2,-2, 1,-2,-2, 1, 0,-4,-1, 0,-1,-2,-1,-3, 0, 4,-1,-5],
        &[-1, 0, 0, 2,-3, 2, 6,-2, 0,-3,-2, 1,-2,-3, 0, 0,-1,-3,-2,-3, 1, 4,-1,-5],
        &[ 0,-2, 0,-1,-3,-2,-2, 7,-2,-4,-3,-2,-2,-3,-2, 0,-2,-2,-3,-3,-1,-2,-1,-5],
        &[-2, 0, 1, 0,-3, 1, 0,-2,10,-3,-2,-1, 0,-2,-2,-1,-2,-3, 2,-3, 0, 0,-1,-5],
        &[-1,-3,-2,-4,-3,-2,-3,-4,-3, 5, 2,-3, 2, 0,-2,-2,-1,-2, 0, 3,-3,-3,-1,-5],
        &[-1,-2,-3,-3,-2,-2,-2,-3,-2, 2, 5,-3, 2, 1,-3,-3,-1,-2, 0, 1,-3,-2,-1,-5],
        &[-1, 3, 0, 0,-3, 1, 1,-2,-1,-3,-3, 5,-1,-3,-1,-1,-1,-2,-1,-2, 0, 1,-1,-5],
        &[-1,-1,-2,-3,-2, 0,-2,-2, 0, 2, 2,-1, 6, 0,-2,-2,-1,-2, 0, 1,-2,-1,-1,-5],
        &[-2,-2,-2,-4,-2,-4,-3,-3,-2, 0, 1,-3, 0, 8,-3,-2,-1, 1, 3, 0,-3,-3,-1,-5],
        &[-1,-2,-2,-1,-4,-1, 0,-2,-2,-2,-3,-1,-2,-3, 9,-1,-1,-3,-3,-3,-2,-1,-1,-5],
        &[ 1,-1, 1, 0,-1, 0, 0, 0,-1,-2,-3,-1,-2,-2,-1, 4, 2,-4,-2,-1, 0, 0, 0,-5],
        &[ 0,-1, 0,-1,-1,-1,-1,-2,-2,-1,-1,-1,-1,-1,-1, 2, 5,-3,-1, 0, 0,-1, 0,-5],
        &[-2,-2,-4,-4,-5,-2,-3,-2,-3,-2,-2,-2,-2, 1,-3,-4,-3,15, 3,-3,-4,-2,-2,-5],
        &[-2,-1,-2,-2,-3,-1,-2,-3, 2, 0, 0,-1, 0, 3,-3,-2,-1, 3, 8,-1,-2,-2,-1,-5],
        &[ 0,-2,-3,-3,-1,-3,-3,-3,-3, 3, 1,-2, 1, 0,-3,-1, 0,-3,-1, 5,-3,-3,-1,-5],
        &[-1,-1, 4, 5,-2, 0, 1,-1, 0,-3,-3, 0,-2,-3,-2, 0, 0,-4,-2,-3, 4, 2,-1,-5],
        &[-1, 0, 0, 1,-3, 4, 4,-2, 0,-3,-2, 1,-1,-3,-1, 0,-1,-2,-2,-3, 2, 4,-1,-5],
        &[ 0,-1,-1,-1,-2,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1, 0, 0,-2,-1,-1,-1,-1,-1,-5],
        &[-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5,-5, 1],
    ]
}

// BLOSUM80: higher-identity matrix, same alphabet order as BLOSUM62.
#[rustfmt::skip]
fn blosum80_rows() -> [&'static [i32]; 24] {
    [
        &[ 5,-2,-2,-2,-1,-1,-1, 0,-2,-2,-2,-1,-1,-3,-1, 1, 0,-3,-2, 0,-2,-1,-1,-6],
        &[-2, 6,-1,-2,-4, 1,-1,-3, 0,-3,-3, 2,-2,-3,-2,-1,-1,-4,-3,-3,-2, 0,-1,-6],
        &[-2,-1, 6, 1,-3, 0,-1,-1, 0,-4,-4, 0,-3,-4,-3, 0, 0,-4,-3,-4, 4, 0,-1,-6],
        &[-2,-2, 1, 6,-4,-1, 1,-2,-2,-4,-5,-1,-4,-4,-2,-1,-1,-6,-4,-4, 4, 1,-2,-6],
        &[-1,-4,-3,-4, 9,-4,-5,-4,-4,-2,-2,-4,-2,-3,-4,-2,-1,-3,-3,-1,-4,-4,-2,-6],
        &[-1, 1, 0,-1,-4, 6, 2,-2, 1,-3,-3, 1, 0,-4,-2, 0,-1,-3,-2,-3,-1, 4,-1,-6],
        &[-1,-1,-1, 1,-5, 2, 6,-3, 0,-4,-4, 1,-2,-4,-2, 0,-1,-4,-3,-3, 1, 5,-1,-6],
        &[ 0,-3,-1,-2,-4,-2,-3, 6,-3,-5,-4,-2,-4,-4,-3,-1,-2,-4,-4,-4,-1,-3,-2,-6],
        &[-2, 0, 0,-2,-4, 1, 0,-3, 8,-4,-3,-1,-2,-2,-3,-1,-2,-3, 2,-4,-1, 0,-2,-6],
        &[-2,-3,-4,-4,-2,-3,-4,-5,-4, 5, 1,-3, 1,-1,-4,-3,-1,-3,-2, 3,-4,-4,-2,-6],
        &[-2,-3,-4,-5,-2,-3,-4,-4,-3, 1, 4,-3, 2, 0,-3,-3,-2,-2,-2, 1,-4,-3,-2,-6],
        &[-1, 2, 0,-1,-4, 1, 1,-2,-1,-3,-3, 5,-2,-4,-1,-1,-1,-4,-3,-3,-1, 1,-1,-6],
        &[-1,-2,-3,-4,-2, 0,-2,-4,-2, 1, 2,-2, 6, 0,-3,-2,-1,-2,-2, 1,-3,-1,-1,-6],
        &[-3,-3,-4,-4,-3,-4,-4,-4,-2,-1, 0,-4, 0, 6,-4,-3,-2, 0, 3,-1,-4,-4,-2,-6],
        &[-1,-2,-3,-2,-4,-2,-2,-3,-3,-4,-3,-1,-3,-4, 8,-1,-2,-5,-4,-3,-2,-2,-2,-6],
        &[ 1,-1, 0,-1,-2, 0, 0,-1,-1,-3,-3,-1,-2,-3,-1, 5, 1,-4,-2,-2, 0, 0,-1,-6],
        &[ 0,-1, 0,-1,-1,-1,-1,-2,-2,-1,-2,-1,-1,-2,-2, 1, 5,-4,-2, 0,-1,-1,-1,-6],
        &[-3,-4,-4,-6,-3,-3,-4,-4,-3,-3,-2,-4,-2, 0,-5,-4,-4,11, 2,-3,-5,-4,-3,-6],
        &[-2,-3,-3,-4,-3,-2,-3,-4, 2,-2,-2,-3,-2, 3,-4,-2,-2, 2, 7,-2,-3,-3,-2,-6],
        &[ 0,-3,-4,-4,-1,-3,-3,-4,-4, 3, 1,-3, 1,-1,-3,-2, 0,-3,-2, 4,-4,-3,-1,-6],
        &[-2,-2, 4, 4,-4,-1, 1,-1,-1,-4,-4,-1,-3,-4,-2, 0,-1,-5,-3,-4, 4, 0,-2,-6],
        &[-1, 0, 0, 1,-4, 4, 5,-3, 0,-4,-3, 1,-1,-4,-2, 0,-1,-4,-3,-3, 0, 4,-1,-6],
        &[-1,-1,-1,-2,-2,-1,-1,-2,-2,-2,-2,-1,-1,-2,-2,-1,-1,-3,-2,-1,-2,-1,-1,-6],
        &[-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6,-6, 1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blosum62_is_symmetric_and_self_scores_positive() {
        let m = StaticMatrix::load("BLOSUM62", 1).unwrap();
        for a in 0..m.dim() as u8 {
            for b in 0..m.dim() as u8 {
                assert_eq!(m.score(a, b), m.score(b, a), "asymmetric at ({a},{b})");
            }
            assert!(m.score(a, a) > 0, "non-positive self-score at {a}");
        }
    }

    #[test]
    fn row_max_matches_scan() {
        let m = StaticMatrix::load("BLOSUM62", 1).unwrap();
        for a in 0..m.dim() as u8 {
            let expected = (0..m.dim() as u8).map(|b| m.score(a, b)).max().unwrap();
            assert_eq!(m.row_max(a), expected);
        }
    }

    #[test]
    fn scale_applies_once() {
        let unscaled = StaticMatrix::load("BLOSUM62", 1).unwrap();
        let scaled = StaticMatrix::load("BLOSUM62", 3).unwrap();
        assert_eq!(scaled.score(0, 0), unscaled.score(0, 0) * 3);
        assert_eq!(scaled.row_max(0), unscaled.row_max(0) * 3);
    }

    #[test]
    fn unknown_matrix_errors() {
        let err = StaticMatrix::load("NOT_A_MATRIX", 1).unwrap_err();
        assert_eq!(err, EngineError::UnknownMatrix("NOT_A_MATRIX".to_string()));
    }

    #[test]
    fn karlin_altschul_known_and_unknown() {
        assert!(karlin_altschul_params("BLOSUM62").is_ok());
        assert!(karlin_altschul_params("NOPE").is_err());
    }
}
