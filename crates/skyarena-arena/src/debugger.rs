//! Per-arena diagnostic log.
//!
//! One append-only text file per arena per day,
//! `{data_folder}/logs/{YYYY-MM-DD} {arena}.txt`, with lines of the form
//! `[HH:MM:SS] message`. Every line is mirrored to `tracing` at debug level.
//! The file is never read back.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use tracing::{debug, warn};

use crate::error::ArenaError;

enum Sink {
    File { path: PathBuf, file: File },
    Memory(Vec<String>),
}

pub struct GameDebugger {
    arena: String,
    offset: FixedOffset,
    sink: Sink,
    write_failed: bool,
}

impl GameDebugger {
    /// Open (or append to) today's log file for `arena`.
    ///
    /// # Errors
    /// [`ArenaError::InvalidTimezone`] if the offset is out of range,
    /// [`ArenaError::Debugger`] if the file cannot be opened.
    pub fn open(logs_dir: &Path, arena: &str, utc_offset_minutes: i32) -> Result<Self, ArenaError> {
        let offset = utc_offset(utc_offset_minutes)?;
        let date = Utc::now().with_timezone(&offset).format("%Y-%m-%d");
        let path = logs_dir.join(format!("{date} {arena}.txt"));

        let opened = fs::create_dir_all(logs_dir)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));
        let file = match opened {
            Ok(file) => file,
            Err(source) => return Err(ArenaError::Debugger { path, source }),
        };

        Ok(Self {
            arena: arena.to_string(),
            offset,
            sink: Sink::File { path, file },
            write_failed: false,
        })
    }

    /// A log kept in memory, readable through [`GameDebugger::lines`].
    pub fn in_memory(arena: &str) -> Self {
        Self {
            arena: arena.to_string(),
            offset: Utc.fix(),
            sink: Sink::Memory(Vec::new()),
            write_failed: false,
        }
    }

    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(arena = %self.arena, "{message}");

        let line = format!(
            "[{}] {message}",
            Utc::now().with_timezone(&self.offset).format("%H:%M:%S")
        );
        match &mut self.sink {
            Sink::Memory(lines) => lines.push(line),
            Sink::File { path, file } => {
                if let Err(e) = writeln!(file, "{line}") {
                    if !self.write_failed {
                        warn!(arena = %self.arena, path = %path.display(), error = %e, "arena log write failed");
                        self.write_failed = true;
                    }
                }
            }
        }
    }

    /// Lines logged so far. Always empty for a file-backed log.
    pub fn lines(&self) -> &[String] {
        match &self.sink {
            Sink::Memory(lines) => lines,
            Sink::File { .. } => &[],
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { path, .. } => Some(path),
            Sink::Memory(_) => None,
        }
    }

    /// `true` if any logged line contains `needle`. Memory logs only.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

fn utc_offset(minutes: i32) -> Result<FixedOffset, ArenaError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(ArenaError::InvalidTimezone(minutes))
}
