use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::gmail_api::MailApi;
use crate::types::MessageRecord;

/// One JSON file per message under a single directory. A file's presence is
/// taken as proof the message was archived; contents are never re-checked.
#[derive(Debug, Clone)]
pub struct MessageStore {
    dir: PathBuf,
}

impl MessageStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ids become file names verbatim, so anything that could escape the
    /// directory is refused.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, Error> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("message id {:?} is not usable as a file name", id),
            )));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Errors other than "not found" (permissions, a file where the
    /// directory should be) are surfaced rather than read as "not archived".
    pub async fn contains(&self, id: &str) -> Result<bool, Error> {
        let path = self.path_for(id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    pub async fn ensure_dir(&self) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub async fn write(&self, record: &MessageRecord) -> Result<PathBuf, Error> {
        let path = self.path_for(&record.id)?;
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }

    pub async fn read(&self, id: &str) -> Result<MessageRecord, Error> {
        let content = tokio::fs::read_to_string(self.path_for(id)?).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub saved: Vec<String>,
    pub skipped: Vec<String>,
    /// Message id and the error that stopped it.
    pub failed: Vec<(String, String)>,
}

impl ArchiveReport {
    pub fn total(&self) -> usize {
        self.saved.len() + self.skipped.len() + self.failed.len()
    }
}

/// Archives each id in order, one at a time. Only a failure to create the
/// data directory is fatal; per-message failures are reported and skipped.
pub async fn archive_messages<A: MailApi + ?Sized>(
    api: &A,
    store: &MessageStore,
    ids: &[String],
) -> Result<ArchiveReport, Error> {
    store.ensure_dir().await?;
    let mut report = ArchiveReport::default();

    for id in ids {
        match store.contains(id).await {
            Ok(true) => {
                println!("Skipping message {} (already saved)", id);
                report.skipped.push(id.clone());
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                eprintln!("Failed to check message {}: {}", id, e);
                report.failed.push((id.clone(), e.to_string()));
                continue;
            }
        }

        let message = match api.get_message_metadata(id).await {
            Ok(message) => message,
            Err(e) => {
                eprintln!("Failed to fetch message {}: {}", id, e);
                report.failed.push((id.clone(), e.to_string()));
                continue;
            }
        };

        let record = MessageRecord::from_message(message, id);

        match store.write(&record).await {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "message written");
                println!("Saved message {}", id);
                report.saved.push(id.clone());
            }
            Err(e) => {
                eprintln!("Failed to save message {}: {}", id, e);
                report.failed.push((id.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}
