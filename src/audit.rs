//! Security audit logging.
//!
//! Records every file operation performed through the `Vault`, successful or
//! not. The log is append-only. Supports pluggable sinks for forwarding
//! records to files, databases, etc.
//!
//! The envelope core itself never writes here; only the vault layer does.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vault::FileId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Registration,
    FileUpload,
    FileDownload,
    FileShared,
    /// The owner withdrew a grant.
    ShareRevoked,
    /// A grantee dropped a file from their own shared list.
    ShareRemoved,
    FileDeleted,
    UnauthorizedDownload,
    FileIntegrityViolation,
    FileDecryptionError,
    GrantRepaired,
    GrantRepairFailed,
}

/// A sink that receives audit records. Implement this to forward records
/// to a file, database, or other persistent store.
pub trait AuditSink: Send {
    /// Append a record. Called for every audited operation.
    fn append(&mut self, record: AuditRecord);
}

/// A permanent record of a security-relevant event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: AuditAction,
    /// The user who performed the action, if known.
    pub actor: Option<String>,
    /// The file involved, if any.
    pub file_id: Option<FileId>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a record stamped with the current time.
    pub fn now(
        action: AuditAction,
        actor: Option<&str>,
        file_id: Option<FileId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action,
            actor: actor.map(str::to_string),
            file_id,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An append-only log of audit records.
/// Can forward records to additional sinks via `add_forward_sink`.
#[derive(Default, Serialize, Deserialize)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    #[serde(skip)]
    forward_sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl Clone for AuditLog {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            forward_sinks: Vec::new(), // Forward sinks are not cloned
        }
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to receive a copy of every record. Useful for persisting
    /// to a file or other store without replacing the in-memory log.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    /// Append a new record to the log and forward to any attached sinks.
    pub fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            sink.append(record.clone());
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }

    /// Records with the given action, oldest first.
    pub fn with_action(&self, action: AuditAction) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter().filter(move |r| r.action == action)
    }

    pub fn last(&self) -> Option<&AuditRecord> {
        self.records.last()
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        // A sink must not fail the operation it records.
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize audit record");
                return;
            }
        };
        if let Err(e) = writeln!(self.file, "{line}").and_then(|_| self.file.flush()) {
            tracing::error!(error = %e, "failed to write audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_filter() {
        let mut log = AuditLog::new();
        log.append(AuditRecord::now(AuditAction::FileUpload, Some("alice"), Some(1), "report.pdf"));
        log.append(AuditRecord::now(AuditAction::FileShared, Some("alice"), Some(1), "with bob"));
        log.append(AuditRecord::now(AuditAction::FileUpload, Some("bob"), Some(2), "notes.txt"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.with_action(AuditAction::FileUpload).count(), 2);
        assert_eq!(log.last().unwrap().actor.as_deref(), Some("bob"));
    }

    #[test]
    fn clone_drops_sinks_keeps_records() {
        struct Nop;
        impl AuditSink for Nop {
            fn append(&mut self, _record: AuditRecord) {}
        }

        let mut log = AuditLog::new();
        log.add_forward_sink(Box::new(Nop));
        log.append(AuditRecord::now(AuditAction::Registration, Some("carol"), None, ""));

        let copy = log.clone();
        assert_eq!(copy.len(), 1);
        assert!(format!("{:?}", copy).contains("forward_sinks: 0"));
    }

    #[test]
    fn action_serializes_screaming_snake() {
        let json = serde_json::to_string(&AuditAction::FileIntegrityViolation).unwrap();
        assert_eq!(json, "\"FILE_INTEGRITY_VIOLATION\"");
    }
}
