//! Append-only JSON-lines implementation of the URL repository.
//!
//! Each mutation appends one JSON object per affected code:
//!
//! ```text
//! {"uuid":"…","short_url":"abcdEFGH","original_url":"https://example.com","user_id":"u1","is_deleted":false}
//! ```
//!
//! Lines are never rewritten. On startup the whole file is replayed in order to
//! rebuild the in-memory table; a later line for a known code can only set its
//! deleted flag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::memory_url_repository::UrlTable;
use crate::domain::entities::{UrlEntry, UserUrl};
use crate::domain::repositories::UrlRepository;
use crate::error::StorageError;

/// One line of the storage file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FileRecord {
    uuid: String,
    short_url: String,
    original_url: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    is_deleted: bool,
}

impl FileRecord {
    fn from_entry(entry: &UrlEntry) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            short_url: entry.code.clone(),
            original_url: entry.original_url.clone(),
            user_id: entry.owner_id.clone(),
            is_deleted: entry.deleted,
        }
    }

    fn into_entry(self) -> UrlEntry {
        UrlEntry {
            code: self.short_url,
            original_url: self.original_url,
            owner_id: self.user_id,
            deleted: self.is_deleted,
        }
    }
}

struct FileState {
    table: UrlTable,
    log: File,
}

impl FileState {
    /// Appends records in a single write, then flushes.
    async fn append(&mut self, records: &[FileRecord]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let start = self.log.metadata().await?.len();
        if let Err(e) = self.write_and_flush(&buf).await {
            self.rollback(start).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_and_flush(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.log.write_all(buf).await?;
        self.log.flush().await
    }

    /// Cuts the file back to `len` bytes, dropping a partially written append.
    async fn rollback(&mut self, len: u64) {
        if let Err(e) = self.log.set_len(len).await {
            tracing::error!(error = %e, len, "Failed to truncate storage file after a failed append");
        }
    }
}

/// How the last line of a replayed file ended.
#[derive(Debug, PartialEq, Eq)]
enum Tail {
    Terminated,
    /// Valid record missing its trailing newline.
    Unterminated,
    /// Unparsable remainder of an interrupted append. The file is intact up
    /// to `len` bytes.
    Torn { len: u64 },
}

/// Repository persisting to an append-only file, serving reads from memory.
///
/// Writes are O(1) amortized; opening replays the file in O(n). The file is
/// appended to first and the in-memory table updated only once the append
/// succeeded, so a failed write leaves both unchanged.
pub struct FileUrlRepository {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileUrlRepository {
    /// Opens (or creates) the storage file and replays it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read or opened, and
    /// [`StorageError::Serialization`] if a newline-terminated line is not a
    /// valid record. An unparsable last line without a newline is left over
    /// from an interrupted append; it is logged and cut off.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let (table, tail) = Self::replay(&path).await?;

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        // New appends must start on a fresh line.
        match tail {
            Tail::Terminated => {}
            Tail::Unterminated => {
                log.write_all(b"\n").await?;
                log.flush().await?;
            }
            Tail::Torn { len } => log.set_len(len).await?,
        }

        tracing::info!(
            path = %path.display(),
            entries = table.len(),
            "File storage loaded"
        );

        Ok(Self {
            path,
            state: Mutex::new(FileState { table, log }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn replay(path: &Path) -> Result<(UrlTable, Tail), StorageError> {
        let mut table = UrlTable::new();

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((table, Tail::Terminated));
            }
            Err(e) => return Err(e.into()),
        };

        let (complete, last) = match contents.rfind('\n') {
            Some(pos) => contents.split_at(pos + 1),
            None => ("", contents.as_str()),
        };

        for line in complete.lines().filter(|l| !l.trim().is_empty()) {
            let record: FileRecord = serde_json::from_str(line)?;
            table.apply(record.into_entry());
        }

        if last.trim().is_empty() {
            return Ok((table, Tail::Terminated));
        }

        // Only the final, unterminated line can be a torn write.
        match serde_json::from_str::<FileRecord>(last) {
            Ok(record) => {
                table.apply(record.into_entry());
                Ok((table, Tail::Unterminated))
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    bytes = last.len(),
                    "Discarding truncated last record"
                );
                Ok((
                    table,
                    Tail::Torn {
                        len: complete.len() as u64,
                    },
                ))
            }
        }
    }
}

#[async_trait]
impl UrlRepository for FileUrlRepository {
    async fn read(&self, code: &str) -> Result<String, StorageError> {
        self.state.lock().await.table.read(code)
    }

    async fn write(&self, code: &str, url: &str, owner_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.table.ensure_vacant(code)?;

        let entry = UrlEntry::new(code.to_string(), url.to_string(), owner_id.to_string());
        state.append(&[FileRecord::from_entry(&entry)]).await?;
        state.table.insert(entry)
    }

    async fn create_or_get(
        &self,
        code: &str,
        url: &str,
        owner_id: &str,
    ) -> Result<(String, bool), StorageError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.table.find_live_code(url, owner_id) {
            return Ok((existing, false));
        }
        state.table.ensure_vacant(code)?;

        let entry = UrlEntry::new(code.to_string(), url.to_string(), owner_id.to_string());
        state.append(&[FileRecord::from_entry(&entry)]).await?;
        state.table.insert(entry)?;

        Ok((code.to_string(), true))
    }

    async fn write_batch(
        &self,
        entries: Vec<(String, String)>,
        owner_id: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.table.ensure_batch_vacant(&entries)?;

        let entries: Vec<UrlEntry> = entries
            .into_iter()
            .map(|(code, url)| UrlEntry::new(code, url, owner_id.to_string()))
            .collect();
        let records: Vec<FileRecord> = entries.iter().map(FileRecord::from_entry).collect();

        state.append(&records).await?;
        for entry in entries {
            state.table.insert(entry)?;
        }

        Ok(())
    }

    async fn is_code_unique(&self, code: &str) -> Result<bool, StorageError> {
        Ok(!self.state.lock().await.table.contains(code))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<UserUrl>, StorageError> {
        Ok(self.state.lock().await.table.by_owner(owner_id))
    }

    async fn delete_batch(&self, codes: Vec<String>, owner_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let deletable = state.table.deletable(&codes, owner_id);

        let records: Vec<FileRecord> = deletable
            .iter()
            .filter_map(|code| state.table.entry(code))
            .map(|entry| FileRecord {
                is_deleted: true,
                ..FileRecord::from_entry(entry)
            })
            .collect();

        state.append(&records).await?;
        state.table.mark_deleted(&deletable);
        Ok(())
    }

    async fn is_owned_by(&self, code: &str, owner_id: &str) -> Result<bool, StorageError> {
        Ok(self.state.lock().await.table.is_owned_by(code, owner_id))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
