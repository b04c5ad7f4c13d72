//! Round Logger
//!
//! Append-only JSONL run log. One header line, one line per round (or per
//! failed round), and a closing line with the metrics or the interruption.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use gov_events::RoundRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::MetricsReport;

/// Agent counts written in the run header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCounts {
    pub government: usize,
    pub enterprises: usize,
    pub residents: usize,
}

/// Payload of one log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    RunStarted {
        city: String,
        seed: u64,
        rounds: u32,
        agents: AgentCounts,
        policies: Vec<String>,
    },
    Round(RoundRecord),
    RoundFailed {
        round: u32,
        error: String,
    },
    Interrupted {
        round: u32,
        reason: String,
    },
    Completed {
        rounds_completed: usize,
        metrics: Option<MetricsReport>,
    },
}

/// A log line as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub entry_id: String,
    pub run_id: String,
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Writes run log lines to a JSONL file
pub struct RoundLogger {
    writer: Option<BufWriter<File>>,
    run_id: String,
    entry_count: u64,
    next_entry_id: u64,
}

impl RoundLogger {
    /// Create a new logger writing to the specified path
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            run_id: Uuid::new_v4().to_string(),
            entry_count: 0,
            next_entry_id: 1,
        })
    }

    /// Create a logger that discards entries (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            run_id: Uuid::new_v4().to_string(),
            entry_count: 0,
            next_entry_id: 1,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Generate the next entry ID
    pub fn next_id(&mut self) -> String {
        let id = format!("log_{:08}", self.next_entry_id);
        self.next_entry_id += 1;
        id
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn log(&mut self, entry: LogEntry) -> std::io::Result<()> {
        let line = LogLine {
            entry_id: self.next_id(),
            run_id: self.run_id.clone(),
            entry,
        };
        self.entry_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(&line)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for RoundLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            eprintln!("Warning: Failed to flush round logger: {}", e);
        }
    }
}
