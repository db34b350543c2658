//! Append-only access log.
//!
//! Every record is one CSV row `event,timestamp,outcome`:
//!
//! ```text
//! startup,2025-03-14T09:26:53,
//! code,2025-03-14T09:27:10,false
//! code,2025-03-14T09:27:18,true
//! shutdown,2025-03-14T18:00:00,
//! ```
//!
//! The outcome column is empty for records that carry none.

use crate::error::{LockError, Result};
use chrono::NaiveDateTime;
use codelock_core::constants::{ACCESS_LOG_TIME_FORMAT, EVENT_CODE, EVENT_SHUTDOWN, EVENT_STARTUP};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Kind of access log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessEvent {
    Startup,
    Code,
    Shutdown,
}

impl AccessEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => EVENT_STARTUP,
            Self::Code => EVENT_CODE,
            Self::Shutdown => EVENT_SHUTDOWN,
        }
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessEvent {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            EVENT_STARTUP => Ok(Self::Startup),
            EVENT_CODE => Ok(Self::Code),
            EVENT_SHUTDOWN => Ok(Self::Shutdown),
            other => Err(LockError::MalformedRecord(format!("unknown event {other:?}"))),
        }
    }
}

/// One access log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub event: AccessEvent,
    pub timestamp: NaiveDateTime,
    /// Accepted (`true`) or rejected (`false`) code; `None` for lifecycle events.
    pub outcome: Option<bool>,
}

impl AccessRecord {
    pub fn startup(timestamp: NaiveDateTime) -> Self {
        Self {
            event: AccessEvent::Startup,
            timestamp,
            outcome: None,
        }
    }

    pub fn code(timestamp: NaiveDateTime, accepted: bool) -> Self {
        Self {
            event: AccessEvent::Code,
            timestamp,
            outcome: Some(accepted),
        }
    }

    pub fn shutdown(timestamp: NaiveDateTime) -> Self {
        Self {
            event: AccessEvent::Shutdown,
            timestamp,
            outcome: None,
        }
    }

    fn to_fields(&self) -> [String; 3] {
        [
            self.event.as_str().to_string(),
            self.timestamp.format(ACCESS_LOG_TIME_FORMAT).to_string(),
            self.outcome.map(|o| o.to_string()).unwrap_or_default(),
        ]
    }

    fn from_fields(record: &csv::StringRecord) -> Result<Self> {
        let field = |index: usize| {
            record
                .get(index)
                .ok_or_else(|| LockError::MalformedRecord(format!("missing column {index}")))
        };

        let event = field(0)?.parse()?;
        let timestamp = NaiveDateTime::parse_from_str(field(1)?, ACCESS_LOG_TIME_FORMAT)
            .map_err(|e| LockError::MalformedRecord(format!("timestamp: {e}")))?;
        let outcome = match field(2)? {
            "" => None,
            "true" => Some(true),
            "false" => Some(false),
            other => {
                return Err(LockError::MalformedRecord(format!("outcome {other:?}")));
            }
        };

        Ok(Self {
            event,
            timestamp,
            outcome,
        })
    }
}

/// Destination of access log records.
pub trait AccessLogSink: Send {
    fn append(&mut self, record: &AccessRecord) -> Result<()>;

    /// Flush and release the sink. Appending afterwards fails.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// CSV file sink, appending to an existing log.
#[derive(Debug)]
pub struct CsvAccessLog {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvAccessLog {
    /// Open `path` for appending, creating it if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_writer(file);
        debug!(path = %path.display(), "Access log opened");
        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record of a log file.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AccessRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        reader
            .records()
            .map(|record| AccessRecord::from_fields(&record?))
            .collect()
    }
}

impl AccessLogSink for CsvAccessLog {
    fn append(&mut self, record: &AccessRecord) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(LockError::LogClosed)?;
        writer.write_record(record.to_fields())?;
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(path = %self.path.display(), "Access log closed");
        }
        Ok(())
    }
}

/// In-memory sink; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccessLog {
    records: Arc<Mutex<Vec<AccessRecord>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryAccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AccessRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Outcomes of every `code` record, oldest first.
    pub fn outcomes(&self) -> Vec<bool> {
        self.records()
            .iter()
            .filter_map(|record| record.outcome)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccessLogSink for MemoryAccessLog {
    fn append(&mut self, record: &AccessRecord) -> Result<()> {
        if self.is_closed() {
            return Err(LockError::LogClosed);
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
        Ok(())
    }
}
