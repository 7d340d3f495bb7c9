//! # blastcore — protein seed-lookup indexing and preliminary search
//!
//! Implements the local BLAST protein search engine core: a seed-lookup
//! table with a thin/thick backbone, overflow list and presence-vector
//! bit filter; a neighborhood-enumeration algorithm pruned by dynamic
//! upper-score bounds; a multi-threaded streaming pipeline over a
//! `SubjectSource` with bounded hand-off and per-thread diagnostics; and
//! a concurrent, per-query `HspCollector` with hitlist and total-HSP
//! trimming.
//!
//! The library exposes no binary target, no network transport, and no
//! on-disk database format beyond what `subject::FileSystemSubjects`
//! needs to stream FASTA-like files. Traceback/formatter output and
//! PSI-BLAST matrix rescaling are out of scope; callers consume
//! `collector::BlobOfHsps` and build on top of it.
//!
//! ```ignore
//! use blastcore::{collector::HspCollector, effective_lengths::EffectiveLengths,
//!     engine::PreliminaryEngine, lookup::LookupTableBuilder, matrix::StaticMatrix,
//!     options::{EngineConfig, LookupOptions}, query::{QueryInfo, Range},
//!     subject::InMemorySubjects};
//! use std::sync::Arc;
//!
//! let matrix = Arc::new(StaticMatrix::load("BLOSUM62", 1)?);
//! let query = vec![0u8, 1, 2, 3, 4];
//! let mut builder = LookupTableBuilder::new(&LookupOptions::default(), 24)?;
//! builder.index_query(matrix.as_ref(), &query, &[Range { from: 0, to: query.len() }], 0)?;
//! let table = Arc::new(builder.finalize()?);
//! # Ok::<(), blastcore::error::EngineError>(())
//! ```

pub mod collector;
pub mod diagnostics;
pub mod effective_lengths;
pub mod engine;
pub mod error;
pub mod extend;
pub mod lookup;
pub mod matrix;
pub mod options;
pub mod query;
pub mod subject;

pub use collector::{BlobOfHsps, Hsp, HspCollector, HspList, PerQueryHitlist, SubjectId};
pub use diagnostics::{Diagnostics, WorkerDiagnostics};
pub use effective_lengths::{EffectiveLengths, QueryCutoffs};
pub use engine::PreliminaryEngine;
pub use error::{EngineError, EngineResult};
pub use extend::WordExtender;
pub use lookup::{LookupTable, LookupTableBuilder};
pub use matrix::{KarlinAltschulParams, PssmMatrix, ScoreMatrix, StaticMatrix};
pub use options::{EngineConfig, HitSavingOptions, InitialWordOptions, LookupOptions, ScoringOptions};
pub use query::{QueryInfo, Range};
pub use subject::{ConcatenatedSubjects, FileSystemSubjects, InMemorySubjects, SubjectSource, SubjectToken};
