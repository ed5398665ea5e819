// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only operation log of [`Record`]s, one JSON object per line.
//! Durability point is an explicit [`Wal::flush`] (buffered writes in
//! between); recovery tolerates a torn final write or stray corruption by
//! rotating the offending file to a numbered `.bak` and continuing from the
//! last valid entry.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const FLUSH_THRESHOLD: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_millis(500);
const MAX_BACKUPS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wal serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub record: Record,
}

pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
    processed_seq: u64,
    read_cursor: u64,
    unflushed: usize,
    last_flush: Instant,
}

impl Wal {
    /// Open (creating if absent) the log at `path`. `processed_seq` is the
    /// sequence number already captured in the last snapshot; replay via
    /// [`Wal::next_unprocessed`] starts just after it.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        let (valid, corrupted) = Self::read_valid_prefix(path)?;
        if corrupted {
            Self::rotate_backups(path)?;
            if path.exists() {
                fs::copy(path, path.with_extension("bak"))?;
            }
            Self::rewrite_clean(path, &valid)?;
        }
        // `max` with `processed_seq`: a snapshot/truncate can leave the file
        // itself empty (or short) while the caller's last-known sequence is
        // higher — `append` must never hand out a seq already retired.
        let write_seq = valid.last().map(|e| e.seq).unwrap_or(0).max(processed_seq);
        let writer = Self::open_writer(path)?;
        Ok(Wal {
            path: path.to_path_buf(),
            writer,
            write_seq,
            processed_seq,
            read_cursor: processed_seq + 1,
            unflushed: 0,
            last_flush: Instant::now(),
        })
    }

    fn open_writer(path: &Path) -> Result<BufWriter<File>, WalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    /// Read lines in order, parsing each as a [`WalEntry`]. Stops at the
    /// first line that fails to parse (or isn't valid UTF-8) and reports
    /// that as corruption — callers treat everything after it as untrusted.
    fn read_valid_prefix(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
        if !path.exists() {
            return Ok((Vec::new(), false));
        }
        let bytes = fs::read(path)?;
        let mut entries = Vec::new();
        for line in bytes.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            match std::str::from_utf8(line).ok().and_then(|s| serde_json::from_str::<WalEntry>(s).ok()) {
                Some(entry) => entries.push(entry),
                None => return Ok((entries, true)),
            }
        }
        Ok((entries, false))
    }

    /// Parse every line independently, skipping (not stopping at) ones that
    /// fail — used by [`Wal::next_unprocessed`], which tails the log and
    /// must keep making progress past a torn or garbage line written by
    /// something outside this process's control.
    fn scan_all_parseable(path: &Path) -> Result<Vec<WalEntry>, WalError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let Ok(line) = line else { continue };
            if line.is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<WalEntry>(&line) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn rewrite_clean(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
        let mut file = File::create(path)?;
        for entry in entries {
            writeln!(file, "{}", serde_json::to_string(entry)?)?;
        }
        file.sync_all()?;
        Ok(())
    }

    fn rotate_backups(path: &Path) -> Result<(), WalError> {
        for n in (1..MAX_BACKUPS).rev() {
            let src = Self::backup_path(path, n);
            let dst = Self::backup_path(path, n + 1);
            if dst.exists() {
                fs::remove_file(&dst)?;
            }
            if src.exists() {
                fs::rename(&src, &dst)?;
            }
        }
        Ok(())
    }

    fn backup_path(path: &Path, n: u32) -> PathBuf {
        if n <= 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    }

    pub fn append(&mut self, record: &Record) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, record: record.clone() };
        writeln!(self.writer, "{}", serde_json::to_string(&entry)?)?;
        self.unflushed += 1;
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.unflushed = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn needs_flush(&self) -> bool {
        self.unflushed >= FLUSH_THRESHOLD || (self.unflushed > 0 && self.last_flush.elapsed() >= FLUSH_INTERVAL)
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = seq;
    }

    /// Returns the next entry past wherever replay last left off, tolerating
    /// (by skipping) any unparseable line in between.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        let entries = Self::scan_all_parseable(&self.path)?;
        match entries.into_iter().find(|e| e.seq == self.read_cursor) {
            Some(entry) => {
                self.read_cursor += 1;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Entries strictly after `seq`, from the trusted (uncorrupted) prefix
    /// of the log only.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let (entries, _) = Self::read_valid_prefix(&self.path)?;
        Ok(entries.into_iter().filter(|e| e.seq > seq).collect())
    }

    /// Drop entries with `seq < keep_from`, rewriting the file in place.
    /// Used after a snapshot to bound log growth.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), WalError> {
        let (entries, _) = Self::read_valid_prefix(&self.path)?;
        let keep: Vec<_> = entries.into_iter().filter(|e| e.seq >= keep_from).collect();
        Self::rewrite_clean(&self.path, &keep)?;
        self.writer = Self::open_writer(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
