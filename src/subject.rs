//! Streaming supply of subject sequences. Three variants share one
//! atomic-cursor/lock-free `next()` idiom where the whole subject set
//! already lives in memory, and a background-thread producer backed by a
//! bounded `crossbeam_channel` (grounded on `source/filesystem.rs`'s use
//! of `ignore::WalkBuilder` to enumerate a tree) where it doesn't.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ignore::WalkBuilder;

use crate::collector::SubjectId;
use crate::error::{EngineError, EngineResult};

enum TokenData {
    Owned(Vec<u8>),
    Shared(Arc<Vec<u8>>, usize, usize),
}

/// A borrowed view onto one subject's residues, valid until `release`.
pub struct SubjectToken {
    id: SubjectId,
    data: TokenData,
}

impl SubjectToken {
    pub fn id(&self) -> SubjectId {
        self.id
    }

    pub fn length(&self) -> usize {
        self.residues().len()
    }

    pub fn residues(&self) -> &[u8] {
        match &self.data {
            TokenData::Owned(v) => v.as_slice(),
            TokenData::Shared(buf, start, end) => &buf[*start..*end],
        }
    }

    pub fn release(self) {}
}

/// Thread-safe, single-pass-capable stream of subjects. Multiple workers
/// may call `next` concurrently; each subject is returned to exactly one
/// caller.
pub trait SubjectSource: Send + Sync {
    fn next(&self) -> EngineResult<Option<SubjectToken>>;
}

/// Subjects already materialized as separate owned buffers.
pub struct InMemorySubjects {
    subjects: Vec<(SubjectId, Vec<u8>)>,
    cursor: AtomicUsize,
}

impl InMemorySubjects {
    pub fn new(subjects: Vec<(SubjectId, Vec<u8>)>) -> Self {
        InMemorySubjects {
            subjects,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl SubjectSource for InMemorySubjects {
    fn next(&self) -> EngineResult<Option<SubjectToken>> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        if idx >= self.subjects.len() {
            return Ok(None);
        }
        let (id, data) = &self.subjects[idx];
        Ok(Some(SubjectToken {
            id: *id,
            data: TokenData::Owned(data.clone()),
        }))
    }
}

/// Subjects carved out of one concatenated buffer via a sorted offset
/// table, avoiding a per-subject allocation.
pub struct ConcatenatedSubjects {
    buffer: Arc<Vec<u8>>,
    offsets: Vec<(SubjectId, usize, usize)>,
    cursor: AtomicUsize,
}

impl ConcatenatedSubjects {
    pub fn new(buffer: Vec<u8>, offsets: Vec<(SubjectId, usize, usize)>) -> Self {
        ConcatenatedSubjects {
            buffer: Arc::new(buffer),
            offsets,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl SubjectSource for ConcatenatedSubjects {
    fn next(&self) -> EngineResult<Option<SubjectToken>> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        if idx >= self.offsets.len() {
            return Ok(None);
        }
        let (id, start, end) = self.offsets[idx];
        Ok(Some(SubjectToken {
            id,
            data: TokenData::Shared(self.buffer.clone(), start, end),
        }))
    }
}

/// Standard 24-letter protein alphabet order, matching `matrix`'s static
/// tables: `A R N D C Q E G H I L K M F P S T W Y V B Z X *`.
fn encode_residue(c: u8) -> u8 {
    match c.to_ascii_uppercase() {
        b'A' => 0,
        b'R' => 1,
        b'N' => 2,
        b'D' => 3,
        b'C' => 4,
        b'Q' => 5,
        b'E' => 6,
        b'G' => 7,
        b'H' => 8,
        b'I' => 9,
        b'L' => 10,
        b'K' => 11,
        b'M' => 12,
        b'F' => 13,
        b'P' => 14,
        b'S' => 15,
        b'T' => 16,
        b'W' => 17,
        b'Y' => 18,
        b'V' => 19,
        b'B' => 20,
        b'Z' => 21,
        b'*' => 23,
        _ => 22, // X: unknown/ambiguous residue
    }
}

fn parse_fasta(text: &str) -> Vec<Vec<u8>> {
    let mut records = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix('>') {
            let _ = rest;
            if let Some(seq) = current.take() {
                records.push(seq);
            }
            current = Some(Vec::new());
        } else if let Some(seq) = current.as_mut() {
            seq.extend(line.bytes().filter(|b| !b.is_ascii_whitespace()).map(encode_residue));
        }
    }
    if let Some(seq) = current.take() {
        records.push(seq);
    }
    records
}

fn read_records(path: &Path) -> std::io::Result<Vec<Vec<u8>>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_fasta(&text))
}

/// Walks a directory of FASTA-like sequence files with `ignore::WalkBuilder`
/// and parses them on a background thread, handing records off through a
/// bounded channel so `next()` blocks on a bounded buffer rather than
/// synchronous file I/O.
pub struct FileSystemSubjects {
    receiver: Receiver<EngineResult<(SubjectId, Vec<u8>)>>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FileSystemSubjects {
    pub fn new(root: impl Into<PathBuf>, channel_capacity: usize) -> Self {
        let root = root.into();
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx): (Sender<EngineResult<(SubjectId, Vec<u8>)>>, _) = bounded(channel_capacity);
        let cancel_worker = cancel.clone();
        let handle = thread::spawn(move || run_walker(root, tx, cancel_worker));
        FileSystemSubjects {
            receiver: rx,
            cancel,
            handle: Some(handle),
        }
    }

    /// Cooperative cancellation: stops the background walker and causes
    /// in-flight `next()` calls to return `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn run_walker(root: PathBuf, tx: Sender<EngineResult<(SubjectId, Vec<u8>)>>, cancel: Arc<AtomicBool>) {
    let walker = WalkBuilder::new(&root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();

    let mut next_id: u64 = 0;
    for entry in walker.flatten() {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match read_records(path) {
            Ok(records) => {
                for seq in records {
                    let id = next_id;
                    next_id += 1;
                    if tx.send(Ok((id, seq))).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read subject file");
                let _ = tx.send(Err(EngineError::from(e)));
                return;
            }
        }
    }
}

impl SubjectSource for FileSystemSubjects {
    fn next(&self) -> EngineResult<Option<SubjectToken>> {
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(EngineError::Cancelled);
            }
            match self.receiver.recv_timeout(Duration::from_millis(50)) {
                Ok(Ok((id, data))) => {
                    return Ok(Some(SubjectToken {
                        id,
                        data: TokenData::Owned(data),
                    }))
                }
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

impl Drop for FileSystemSubjects {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
