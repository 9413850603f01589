//! Directory-backed [`TestStore`].
//!
//! Layout under the root:
//!
//! ```text
//! tests/<test_id>.json
//! submissions/<test_id>/<n>.json
//! ```

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use picmatch_canvas::persist::PersistedTest;
use picmatch_canvas::session::{PersistReceipt, StoreError, SubmissionPayload, SubmitReceipt, TestStore};
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

const TEST_ID_PREFIX: &str = "test-";

pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn tests_dir(&self) -> PathBuf {
        self.root.join("tests")
    }

    fn submissions_dir(&self, test_id: &str) -> PathBuf {
        self.root.join("submissions").join(test_id)
    }
}

fn io_error(path: &Path, e: &std::io::Error) -> StoreError {
    StoreError::Transport(format!("{}: {e}", path.display()))
}

/// One past the highest `<prefix><n>.json` number in `dir`, so ids are never
/// reused after a file is removed. Starts at 1 when `dir` does not exist yet.
async fn next_number(dir: &Path, prefix: &str) -> Result<u64, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(io_error(dir, &e)),
    };
    let mut highest = 0;
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, &e))? {
        let name = entry.file_name();
        let Some(digits) = name.to_str().and_then(|n| n.strip_suffix(".json")).and_then(|n| n.strip_prefix(prefix))
        else {
            continue;
        };
        if let Ok(number) = digits.parse::<u64>() {
            highest = highest.max(number);
        }
    }
    Ok(highest + 1)
}

/// Write `value` to a new file at `path`. Never replaces an existing file.
async fn create_json(path: &Path, value: &impl Serialize) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| io_error(parent, &e))?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(StoreError::Rejected(format!("{} already exists", path.display())));
        }
        Err(e) => return Err(io_error(path, &e)),
    };
    file.write_all(&body).await.map_err(|e| io_error(path, &e))?;
    file.flush().await.map_err(|e| io_error(path, &e))
}

/// Test ids become file names; keep them to a safe alphabet.
fn valid_test_id(test_id: &str) -> bool {
    !test_id.is_empty() && test_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait::async_trait]
impl TestStore for DirStore {
    async fn persist_test(&self, test: &PersistedTest) -> Result<PersistReceipt, StoreError> {
        let dir = self.tests_dir();
        let test_id = format!("{TEST_ID_PREFIX}{}", next_number(&dir, TEST_ID_PREFIX).await?);
        let path = dir.join(format!("{test_id}.json"));
        create_json(&path, test).await?;
        info!(%test_id, path = %path.display(), "test stored");
        Ok(PersistReceipt { test_id })
    }

    async fn submit_result(&self, payload: &SubmissionPayload) -> Result<SubmitReceipt, StoreError> {
        if !valid_test_id(&payload.test_id) {
            return Err(StoreError::Rejected(format!("invalid test id `{}`", payload.test_id)));
        }
        let test_path = self.tests_dir().join(format!("{}.json", payload.test_id));
        if !fs::try_exists(&test_path).await.map_err(|e| io_error(&test_path, &e))? {
            return Err(StoreError::Rejected(format!("unknown test `{}`", payload.test_id)));
        }

        let dir = self.submissions_dir(&payload.test_id);
        let path = dir.join(format!("{}.json", next_number(&dir, "").await?));
        create_json(&path, payload).await?;
        info!(test_id = %payload.test_id, path = %path.display(), "submission stored");
        Ok(SubmitReceipt { success: true, score: payload.score })
    }
}
