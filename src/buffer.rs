//! Reading Buffer — disk-backed durable FIFO for pending uploads
//!
//! Stores serialized readings one per line in a single canonical file so
//! pending uploads survive a power cycle. Every operation reads the
//! persisted state rather than an in-memory count; the file is the queue.
//!
//! Head removal rewrites all surviving records to a temporary file and then
//! promotes it over the canonical file with a single rename. The rename
//! replaces the old file atomically; at no point is the canonical file
//! missing.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::defaults::{BUFFER_FILE_NAME, BUFFER_TEMP_FILE_NAME};

/// What `push` does when the buffer already holds `limit` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Reject the new record and leave the buffer untouched.
    #[default]
    RejectNew,
    /// Evict the oldest record to admit the new one. Opt-in: newest data is
    /// judged more valuable than the oldest unsent reading.
    EvictOldest,
}

/// Disk-backed FIFO of opaque single-line reading records.
pub struct ReadingBuffer {
    file_path: PathBuf,
    temp_path: PathBuf,
    limit: usize,
    policy: OverflowPolicy,
}

impl ReadingBuffer {
    /// Open (or lazily create) a buffer rooted at the given data directory.
    ///
    /// The buffer file itself is only created on the first `push`; an absent
    /// file is an empty buffer.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        limit: usize,
        policy: OverflowPolicy,
    ) -> Result<Self, BufferError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| BufferError::Io(e.to_string()))?;

        let buffer = Self {
            file_path: data_dir.join(BUFFER_FILE_NAME),
            temp_path: data_dir.join(BUFFER_TEMP_FILE_NAME),
            limit,
            policy,
        };

        let pending = buffer.count()?;
        if pending > 0 {
            info!(pending, "Reading buffer opened with pending records");
        } else {
            debug!("Reading buffer opened (empty)");
        }

        Ok(buffer)
    }

    /// Number of records currently persisted.
    pub fn count(&self) -> Result<usize, BufferError> {
        if !self.file_path.exists() {
            return Ok(0);
        }
        let file =
            File::open(&self.file_path).map_err(|e| BufferError::OpenSource(e.to_string()))?;
        let reader = BufReader::new(file);
        let mut count = 0;
        for line in reader.lines() {
            let line = line.map_err(|e| BufferError::Io(e.to_string()))?;
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// True iff the buffer holds no records.
    pub fn is_empty(&self) -> Result<bool, BufferError> {
        Ok(self.count()? == 0)
    }

    /// Append a record after the current tail.
    ///
    /// Rejects empty records and records containing a line terminator, and
    /// enforces the capacity limit according to the overflow policy. On any
    /// rejection the buffer is left untouched.
    pub fn push(&self, record: &str) -> Result<(), BufferError> {
        if record.trim().is_empty() {
            return Err(BufferError::EmptyRecord);
        }
        if record.contains('\n') || record.contains('\r') {
            return Err(BufferError::EmbeddedNewline);
        }

        let current = self.count()?;
        if current >= self.limit {
            match self.policy {
                OverflowPolicy::RejectNew => {
                    warn!(
                        current,
                        limit = self.limit,
                        "Buffer full — rejecting new reading"
                    );
                    return Err(BufferError::Full { limit: self.limit });
                }
                OverflowPolicy::EvictOldest => {
                    warn!(
                        current,
                        limit = self.limit,
                        "Buffer full — evicting oldest reading"
                    );
                    // Loop: the persisted count can exceed the limit when the
                    // limit was lowered between restarts.
                    while self.count()? >= self.limit {
                        self.pop_head()?;
                    }
                }
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .map_err(|e| BufferError::Append(e.to_string()))?;

        // One writeln per record; a record is only visible once the full
        // line including the terminator has been flushed.
        writeln!(file, "{record}").map_err(|e| BufferError::Append(e.to_string()))?;
        file.flush().map_err(|e| BufferError::Append(e.to_string()))?;

        debug!(bytes = record.len(), "Reading buffered");
        Ok(())
    }

    /// Return the oldest record without removing it.
    ///
    /// Idempotent: repeated calls with no intervening `pop_head` return the
    /// same record. `None` when the buffer is empty.
    pub fn peek_head(&self) -> Result<Option<String>, BufferError> {
        if !self.file_path.exists() {
            return Ok(None);
        }
        let file =
            File::open(&self.file_path).map_err(|e| BufferError::OpenSource(e.to_string()))?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line.map_err(|e| BufferError::Io(e.to_string()))?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }

    /// Remove exactly the oldest record, preserving the order of the rest.
    ///
    /// Compaction strategy: stream every surviving record into the temporary
    /// file, then promote it over the canonical file with one rename. Each
    /// step failure is a distinct error variant so callers can observe where
    /// the removal broke down.
    pub fn pop_head(&self) -> Result<(), BufferError> {
        let source =
            File::open(&self.file_path).map_err(|e| BufferError::OpenSource(e.to_string()))?;
        let reader = BufReader::new(source);

        let temp = File::create(&self.temp_path).map_err(|e| {
            BufferError::CreateTemp(e.to_string())
        })?;
        let mut writer = BufWriter::new(temp);

        let mut head_skipped = false;
        let mut survivors = 0usize;
        for line in reader.lines() {
            let line = line.map_err(|e| BufferError::Io(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            if !head_skipped {
                head_skipped = true;
                continue;
            }
            writeln!(writer, "{}", line.trim_end()).map_err(|e| {
                BufferError::WriteTemp(e.to_string())
            })?;
            survivors += 1;
        }

        if !head_skipped {
            // Nothing to remove; discard the empty temp file.
            let _ = std::fs::remove_file(&self.temp_path);
            return Err(BufferError::Empty);
        }

        writer
            .flush()
            .map_err(|e| BufferError::WriteTemp(e.to_string()))?;
        drop(writer);

        // Rename replaces the canonical file in place; no delete step, so a
        // crash here leaves either the old queue or the compacted one.
        std::fs::rename(&self.temp_path, &self.file_path)
            .map_err(|e| BufferError::Promote(e.to_string()))?;

        debug!(remaining = survivors, "Head record removed from buffer");
        Ok(())
    }

    /// Configured capacity limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Buffer errors — one variant per observable failure mode.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("refusing to buffer an empty record")]
    EmptyRecord,
    #[error("record contains an embedded line terminator")]
    EmbeddedNewline,
    #[error("buffer full ({limit} records)")]
    Full { limit: usize },
    #[error("buffer is empty, nothing to remove")]
    Empty,
    #[error("failed to open buffer file: {0}")]
    OpenSource(String),
    #[error("failed to append to buffer file: {0}")]
    Append(String),
    #[error("failed to create compaction file: {0}")]
    CreateTemp(String),
    #[error("failed to write compaction file: {0}")]
    WriteTemp(String),
    #[error("failed to promote compaction file: {0}")]
    Promote(String),
    #[error("buffer IO error: {0}")]
    Io(String),
}
